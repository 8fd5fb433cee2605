// src/reader/sample.rs
use num::Complex;

use crate::float128::Float128;
use crate::types::{DataType, Endianness, Timestamp};

/// A value that can be decoded from raw TDMS sample bytes.
///
/// Decoders are pure functions over a correctly-sized byte slice and a byte
/// order; the streaming reader is monomorphized over them, so there is no
/// per-sample dispatch. `DATA_TYPE` is the wire type the decoder expects —
/// reading a channel checks it against the channel's declared type (the
/// "with unit" float variants count as their underlying scalar).
pub trait Sample: Clone {
    const DATA_TYPE: DataType;

    /// Decodes one value. `bytes` holds exactly one sample; for strings
    /// that is the payload slice delimited by the chunk's offsets table.
    fn from_bytes(bytes: &[u8], endianness: Endianness) -> Self;
}

impl Sample for i8 {
    const DATA_TYPE: DataType = DataType::I8;

    fn from_bytes(bytes: &[u8], _: Endianness) -> Self {
        bytes[0] as i8
    }
}

impl Sample for i16 {
    const DATA_TYPE: DataType = DataType::I16;

    fn from_bytes(bytes: &[u8], endianness: Endianness) -> Self {
        endianness.i16(bytes)
    }
}

impl Sample for i32 {
    const DATA_TYPE: DataType = DataType::I32;

    fn from_bytes(bytes: &[u8], endianness: Endianness) -> Self {
        endianness.i32(bytes)
    }
}

impl Sample for i64 {
    const DATA_TYPE: DataType = DataType::I64;

    fn from_bytes(bytes: &[u8], endianness: Endianness) -> Self {
        endianness.i64(bytes)
    }
}

impl Sample for u8 {
    const DATA_TYPE: DataType = DataType::U8;

    fn from_bytes(bytes: &[u8], _: Endianness) -> Self {
        bytes[0]
    }
}

impl Sample for u16 {
    const DATA_TYPE: DataType = DataType::U16;

    fn from_bytes(bytes: &[u8], endianness: Endianness) -> Self {
        endianness.u16(bytes)
    }
}

impl Sample for u32 {
    const DATA_TYPE: DataType = DataType::U32;

    fn from_bytes(bytes: &[u8], endianness: Endianness) -> Self {
        endianness.u32(bytes)
    }
}

impl Sample for u64 {
    const DATA_TYPE: DataType = DataType::U64;

    fn from_bytes(bytes: &[u8], endianness: Endianness) -> Self {
        endianness.u64(bytes)
    }
}

impl Sample for f32 {
    const DATA_TYPE: DataType = DataType::Float32;

    fn from_bytes(bytes: &[u8], endianness: Endianness) -> Self {
        endianness.f32(bytes)
    }
}

impl Sample for f64 {
    const DATA_TYPE: DataType = DataType::Float64;

    fn from_bytes(bytes: &[u8], endianness: Endianness) -> Self {
        endianness.f64(bytes)
    }
}

impl Sample for Float128 {
    const DATA_TYPE: DataType = DataType::Float128;

    fn from_bytes(bytes: &[u8], endianness: Endianness) -> Self {
        let mut quad = [0u8; 16];
        quad.copy_from_slice(&bytes[..16]);
        Float128::from_bytes(quad, endianness)
    }
}

impl Sample for bool {
    const DATA_TYPE: DataType = DataType::Boolean;

    fn from_bytes(bytes: &[u8], _: Endianness) -> Self {
        bytes[0] != 0
    }
}

impl Sample for String {
    const DATA_TYPE: DataType = DataType::String;

    // Sample decoding never fails; malformed UTF-8 in raw data degrades to
    // replacement characters instead of poisoning the rest of the channel.
    fn from_bytes(bytes: &[u8], _: Endianness) -> Self {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

impl Sample for Timestamp {
    const DATA_TYPE: DataType = DataType::TimeStamp;

    fn from_bytes(bytes: &[u8], endianness: Endianness) -> Self {
        Timestamp::from_bytes(bytes, endianness)
    }
}

impl Sample for Complex<f32> {
    const DATA_TYPE: DataType = DataType::Complex64;

    fn from_bytes(bytes: &[u8], endianness: Endianness) -> Self {
        Complex::new(endianness.f32(&bytes[0..4]), endianness.f32(&bytes[4..8]))
    }
}

impl Sample for Complex<f64> {
    const DATA_TYPE: DataType = DataType::Complex128;

    fn from_bytes(bytes: &[u8], endianness: Endianness) -> Self {
        Complex::new(endianness.f64(&bytes[0..8]), endianness.f64(&bytes[8..16]))
    }
}
