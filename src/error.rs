// src/error.rs
use std::io;
use thiserror::Error;

/// Errors produced while parsing a TDMS file or streaming channel data.
#[derive(Error, Debug)]
pub enum TdmsError {
    /// The underlying byte source failed to seek or open.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The expected number of bytes could not be obtained from the byte source.
    #[error("failed to read data: {0}")]
    ReadFailed(#[source] io::Error),

    /// A structural invariant of the file format was violated.
    #[error("invalid file format: {0}")]
    InvalidFileFormat(String),

    /// An object path string does not match the quoted-component grammar.
    #[error("invalid object path: {0}")]
    InvalidPath(String),

    /// The lead-in carries a version other than 4712 or 4713.
    #[error("unsupported version: {0}")]
    UnsupportedVersion(u32),

    /// A wire type code is unknown, or names a type whose values cannot be
    /// decoded (FixedPoint, DAQmx raw data).
    #[error("unsupported data type: 0x{0:X}")]
    UnsupportedType(u32),

    /// A typed accessor or reader was used with a type that does not match
    /// the stored one.
    #[error("incorrect data type: expected {expected}, found {found}")]
    IncorrectType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("channel not found: {0}")]
    ChannelNotFound(String),
}

pub type Result<T> = std::result::Result<T, TdmsError>;
