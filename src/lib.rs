// src/lib.rs
//! # tdms-reader
//!
//! A Rust library for reading TDMS (Technical Data Management Streaming)
//! files, the native file format of National Instruments LabVIEW and other
//! NI software.
//!
//! ## Features
//!
//! - **Incremental metadata**: segments that inherit, override, or replace
//!   the previous object list are folded into one consistent hierarchy
//! - **Streaming reads**: channel data is read lazily in batches, so large
//!   files never need to fit in memory
//! - **Type safe**: channel samples decode into the matching Rust type,
//!   checked against the channel's declared wire type
//! - **Robust**: incomplete files (crashed writers, truncation) stay
//!   readable up to the point of damage
//! - **Full precision**: timestamps keep their 2⁻⁶⁴ s fraction and 128-bit
//!   floats decode exactly
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tdms_reader::*;
//!
//! fn main() -> Result<()> {
//!     let mut file = TdmsFile::open("measurements.tdms")?;
//!
//!     for (group_name, group) in file.groups() {
//!         for (channel_name, channel) in group.channels() {
//!             println!(
//!                 "{}/{}: {} values of {}",
//!                 group_name,
//!                 channel_name,
//!                 channel.num_values(),
//!                 channel.data_type.name(),
//!             );
//!         }
//!     }
//!
//!     let data: Vec<f64> = file.read_channel_data("Group", "Voltage", &[])?;
//!     println!("read {} samples", data.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Streaming
//!
//! ```rust,no_run
//! use tdms_reader::*;
//!
//! fn main() -> Result<()> {
//!     let mut file = TdmsFile::open("large_file.tdms")?;
//!
//!     // Value at a time; batching happens internally.
//!     for value in file.iter_channel_data::<f64>("Group", "Voltage", &[])? {
//!         let value = value?;
//!         let _ = value;
//!     }
//!
//!     // Batch at a time. The slice is only valid until the next call.
//!     let mut stream = file.stream_channel_data::<f64>(
//!         "Group",
//!         "Voltage",
//!         &[ReadOption::BatchSize(4096)],
//!     )?;
//!     while let Some(batch) = stream.next_batch()? {
//!         let _sum: f64 = batch.iter().sum();
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Properties
//!
//! Files, groups, and channels carry typed properties. The `as_*` accessors
//! check the wire type and return [`TdmsError::IncorrectType`] on a
//! mismatch:
//!
//! ```rust,no_run
//! # use tdms_reader::*;
//! # fn main() -> Result<()> {
//! let file = TdmsFile::open("measurements.tdms")?;
//! if let Some(author) = file.property("Author") {
//!     println!("written by {}", author.as_string()?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! The reader is single-threaded and consumer-driven. A read sequence
//! mutably borrows the [`TdmsFile`] because it seeks the shared byte
//! source, so at most one sequence per file can be live at a time — the
//! borrow checker enforces this. For concurrent reads, open the file once
//! per reader.

pub mod error;
pub mod file;
pub mod float128;
pub mod metadata;
pub mod reader;
pub mod segment;
pub mod types;

mod utils;

pub use error::{Result, TdmsError};
pub use file::{Channel, Group, TdmsFile};
pub use float128::{Float128, QuadValue};
pub use metadata::ObjectPath;
pub use reader::{BatchReader, ReadOption, Sample, ValueReader};
pub use segment::LeadIn;
pub use types::{DataType, Endianness, Property, PropertyValue, Timestamp, TocFlags};

// Complex channel samples and property values are `num` complex numbers.
pub use num::Complex;

/// Convenient imports for common use cases.
///
/// ```rust
/// use tdms_reader::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Result, TdmsError};
    pub use crate::file::{Channel, Group, TdmsFile};
    pub use crate::reader::{ReadOption, Sample};
    pub use crate::types::{DataType, PropertyValue, Timestamp};
}
