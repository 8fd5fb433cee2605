// src/types.rs
use std::fmt;
use std::io::Read;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use chrono::{DateTime, Utc};
use num::Complex;

use crate::error::{Result, TdmsError};
use crate::float128::Float128;
use crate::utils;

/// Byte order of a segment. The TOC bitmask is always little-endian; every
/// other field in a segment follows the order selected by its lead-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    pub fn u16(self, bytes: &[u8]) -> u16 {
        match self {
            Endianness::Little => LittleEndian::read_u16(bytes),
            Endianness::Big => BigEndian::read_u16(bytes),
        }
    }

    pub fn u32(self, bytes: &[u8]) -> u32 {
        match self {
            Endianness::Little => LittleEndian::read_u32(bytes),
            Endianness::Big => BigEndian::read_u32(bytes),
        }
    }

    pub fn u64(self, bytes: &[u8]) -> u64 {
        match self {
            Endianness::Little => LittleEndian::read_u64(bytes),
            Endianness::Big => BigEndian::read_u64(bytes),
        }
    }

    pub fn i16(self, bytes: &[u8]) -> i16 {
        self.u16(bytes) as i16
    }

    pub fn i32(self, bytes: &[u8]) -> i32 {
        self.u32(bytes) as i32
    }

    pub fn i64(self, bytes: &[u8]) -> i64 {
        self.u64(bytes) as i64
    }

    pub fn f32(self, bytes: &[u8]) -> f32 {
        f32::from_bits(self.u32(bytes))
    }

    pub fn f64(self, bytes: &[u8]) -> f64 {
        f64::from_bits(self.u64(bytes))
    }
}

/// TDMS data type codes as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DataType {
    Void = 0,
    I8 = 1,
    I16 = 2,
    I32 = 3,
    I64 = 4,
    U8 = 5,
    U16 = 6,
    U32 = 7,
    U64 = 8,
    Float32 = 9,
    Float64 = 10,
    Float128 = 11,
    Float32WithUnit = 0x19,
    Float64WithUnit = 0x1A,
    Float128WithUnit = 0x1B,
    String = 0x20,
    Boolean = 0x21,
    TimeStamp = 0x44,
    FixedPoint = 0x4F,
    Complex64 = 0x0008_000C,
    Complex128 = 0x0010_000D,
    DaqmxRawData = 0xFFFF_FFFF,
}

impl DataType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(DataType::Void),
            1 => Some(DataType::I8),
            2 => Some(DataType::I16),
            3 => Some(DataType::I32),
            4 => Some(DataType::I64),
            5 => Some(DataType::U8),
            6 => Some(DataType::U16),
            7 => Some(DataType::U32),
            8 => Some(DataType::U64),
            9 => Some(DataType::Float32),
            10 => Some(DataType::Float64),
            11 => Some(DataType::Float128),
            0x19 => Some(DataType::Float32WithUnit),
            0x1A => Some(DataType::Float64WithUnit),
            0x1B => Some(DataType::Float128WithUnit),
            0x20 => Some(DataType::String),
            0x21 => Some(DataType::Boolean),
            0x44 => Some(DataType::TimeStamp),
            0x4F => Some(DataType::FixedPoint),
            0x0008_000C => Some(DataType::Complex64),
            0x0010_000D => Some(DataType::Complex128),
            0xFFFF_FFFF => Some(DataType::DaqmxRawData),
            _ => None,
        }
    }

    /// Size of one value in bytes. Zero for variable-width types (String),
    /// Void and the types whose storage layout is unknown (FixedPoint,
    /// DAQmx raw data).
    pub fn size(self) -> usize {
        match self {
            DataType::Void | DataType::String => 0,
            DataType::I8 | DataType::U8 | DataType::Boolean => 1,
            DataType::I16 | DataType::U16 => 2,
            DataType::I32 | DataType::U32 | DataType::Float32 | DataType::Float32WithUnit => 4,
            DataType::I64
            | DataType::U64
            | DataType::Float64
            | DataType::Float64WithUnit
            | DataType::Complex64 => 8,
            DataType::Float128
            | DataType::Float128WithUnit
            | DataType::Complex128
            | DataType::TimeStamp => 16,
            DataType::FixedPoint | DataType::DaqmxRawData => 0,
        }
    }

    /// Folds the "with unit" float variants onto their underlying scalar.
    /// The unit itself lives in the `unit_string` property of the bearing
    /// object.
    pub fn base(self) -> DataType {
        match self {
            DataType::Float32WithUnit => DataType::Float32,
            DataType::Float64WithUnit => DataType::Float64,
            DataType::Float128WithUnit => DataType::Float128,
            other => other,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::Void => "Void",
            DataType::I8 => "Int8",
            DataType::I16 => "Int16",
            DataType::I32 => "Int32",
            DataType::I64 => "Int64",
            DataType::U8 => "Uint8",
            DataType::U16 => "Uint16",
            DataType::U32 => "Uint32",
            DataType::U64 => "Uint64",
            DataType::Float32 | DataType::Float32WithUnit => "Float32",
            DataType::Float64 | DataType::Float64WithUnit => "Float64",
            DataType::Float128 | DataType::Float128WithUnit => "Float128",
            DataType::String => "String",
            DataType::Boolean => "Boolean",
            DataType::TimeStamp => "Timestamp",
            DataType::FixedPoint => "FixedPoint",
            DataType::Complex64 => "ComplexFloat32",
            DataType::Complex128 => "ComplexFloat64",
            DataType::DaqmxRawData => "DAQmxRawData",
        }
    }
}

/// Table of Contents flags from the segment lead-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocFlags(u32);

impl TocFlags {
    pub const METADATA: u32 = 1 << 1;
    pub const NEW_OBJ_LIST: u32 = 1 << 2;
    pub const RAW_DATA: u32 = 1 << 3;
    pub const INTERLEAVED: u32 = 1 << 5;
    pub const BIG_ENDIAN: u32 = 1 << 6;
    pub const DAQMX_RAW_DATA: u32 = 1 << 7;

    pub fn new(flags: u32) -> Self {
        TocFlags(flags)
    }

    pub fn has_metadata(self) -> bool {
        self.0 & Self::METADATA != 0
    }

    pub fn has_new_obj_list(self) -> bool {
        self.0 & Self::NEW_OBJ_LIST != 0
    }

    pub fn has_raw_data(self) -> bool {
        self.0 & Self::RAW_DATA != 0
    }

    pub fn is_interleaved(self) -> bool {
        self.0 & Self::INTERLEAVED != 0
    }

    pub fn is_big_endian(self) -> bool {
        self.0 & Self::BIG_ENDIAN != 0
    }

    pub fn has_daqmx_data(self) -> bool {
        self.0 & Self::DAQMX_RAW_DATA != 0
    }

    pub fn raw_value(self) -> u32 {
        self.0
    }
}

/// TDMS timestamp: seconds since 1904-01-01T00:00:00 UTC plus a fractional
/// part in units of 2⁻⁶⁴ s. This keeps the full 16 bytes of precision; use
/// [`Timestamp::to_datetime`] for a lossy wall-clock projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamp {
    /// Whole seconds since the TDMS epoch (1904-01-01).
    pub seconds: i64,
    /// Fraction of a second in units of 2⁻⁶⁴ s.
    pub fractions: u64,
}

impl Timestamp {
    /// Seconds between the TDMS epoch (1904) and the Unix epoch (1970).
    pub const UNIX_EPOCH_OFFSET: i64 = 2_082_844_800;

    pub fn new(seconds: i64, fractions: u64) -> Self {
        Timestamp { seconds, fractions }
    }

    /// Decodes 16 bytes: signed 64-bit seconds followed by the unsigned
    /// 64-bit fraction, both in the segment byte order.
    pub fn from_bytes(bytes: &[u8], endianness: Endianness) -> Self {
        Timestamp {
            seconds: endianness.i64(&bytes[0..8]),
            fractions: endianness.u64(&bytes[8..16]),
        }
    }

    pub fn unix_seconds(&self) -> i64 {
        self.seconds - Self::UNIX_EPOCH_OFFSET
    }

    /// The fractional part rounded down to nanoseconds.
    pub fn subsec_nanos(&self) -> u32 {
        ((self.fractions as u128 * 1_000_000_000) >> 64) as u32
    }

    /// Lossy projection to a wall-clock time. The TDMS fraction resolves
    /// ~0.05 attoseconds; nanoseconds are the best chrono can hold.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.unix_seconds(), self.subsec_nanos())
    }
}

/// The value of a property: one of the scalar types TDMS can attach to a
/// file, group, or channel object.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Void,
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Float(f32),
    Double(f64),
    Quad(Float128),
    String(String),
    Boolean(bool),
    Timestamp(Timestamp),
    Complex64(Complex<f32>),
    Complex128(Complex<f64>),
}

impl PropertyValue {
    /// Reads one value of the given wire type from the byte source.
    pub(crate) fn read<R: Read>(
        source: &mut R,
        data_type: DataType,
        endianness: Endianness,
    ) -> Result<PropertyValue> {
        let mut bytes = [0u8; 16];
        let width = data_type.size();

        match data_type {
            DataType::Void => return Ok(PropertyValue::Void),
            DataType::String => {
                return Ok(PropertyValue::String(utils::read_string(source, endianness)?));
            }
            DataType::FixedPoint | DataType::DaqmxRawData => {
                return Err(TdmsError::UnsupportedType(data_type as u32));
            }
            _ => utils::read_exact(source, &mut bytes[..width])?,
        }

        let bytes = &bytes[..width];
        Ok(match data_type {
            DataType::I8 => PropertyValue::I8(bytes[0] as i8),
            DataType::I16 => PropertyValue::I16(endianness.i16(bytes)),
            DataType::I32 => PropertyValue::I32(endianness.i32(bytes)),
            DataType::I64 => PropertyValue::I64(endianness.i64(bytes)),
            DataType::U8 => PropertyValue::U8(bytes[0]),
            DataType::U16 => PropertyValue::U16(endianness.u16(bytes)),
            DataType::U32 => PropertyValue::U32(endianness.u32(bytes)),
            DataType::U64 => PropertyValue::U64(endianness.u64(bytes)),
            DataType::Float32 | DataType::Float32WithUnit => {
                PropertyValue::Float(endianness.f32(bytes))
            }
            DataType::Float64 | DataType::Float64WithUnit => {
                PropertyValue::Double(endianness.f64(bytes))
            }
            DataType::Float128 | DataType::Float128WithUnit => {
                let mut quad = [0u8; 16];
                quad.copy_from_slice(bytes);
                PropertyValue::Quad(Float128::from_bytes(quad, endianness))
            }
            DataType::Boolean => PropertyValue::Boolean(bytes[0] != 0),
            DataType::TimeStamp => PropertyValue::Timestamp(Timestamp::from_bytes(bytes, endianness)),
            DataType::Complex64 => PropertyValue::Complex64(Complex::new(
                endianness.f32(&bytes[0..4]),
                endianness.f32(&bytes[4..8]),
            )),
            DataType::Complex128 => PropertyValue::Complex128(Complex::new(
                endianness.f64(&bytes[0..8]),
                endianness.f64(&bytes[8..16]),
            )),
            DataType::Void | DataType::String | DataType::FixedPoint | DataType::DaqmxRawData => {
                unreachable!("handled above")
            }
        })
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Void => write!(f, "(void)"),
            PropertyValue::I8(v) => write!(f, "{v}"),
            PropertyValue::I16(v) => write!(f, "{v}"),
            PropertyValue::I32(v) => write!(f, "{v}"),
            PropertyValue::I64(v) => write!(f, "{v}"),
            PropertyValue::U8(v) => write!(f, "{v}"),
            PropertyValue::U16(v) => write!(f, "{v}"),
            PropertyValue::U32(v) => write!(f, "{v}"),
            PropertyValue::U64(v) => write!(f, "{v}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::Double(v) => write!(f, "{v}"),
            PropertyValue::Quad(v) => write!(f, "{v}"),
            PropertyValue::String(v) => write!(f, "{v}"),
            PropertyValue::Boolean(v) => write!(f, "{v}"),
            PropertyValue::Timestamp(v) => write!(f, "{}s + {}/2^64s", v.seconds, v.fractions),
            PropertyValue::Complex64(v) => write!(f, "{v}"),
            PropertyValue::Complex128(v) => write!(f, "{v}"),
        }
    }
}

/// A named, typed property attached to a file, group, or channel.
///
/// The wire type code is kept alongside the value so that the "with unit"
/// float variants stay distinguishable from their plain counterparts.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub data_type: DataType,
    pub value: PropertyValue,
}

macro_rules! property_accessor {
    ($fn_name:ident, $variant:ident, $data_type:ident, $ty:ty) => {
        pub fn $fn_name(&self) -> Result<$ty> {
            match (&self.value, self.data_type) {
                (PropertyValue::$variant(v), DataType::$data_type) => Ok(*v),
                _ => Err(TdmsError::IncorrectType {
                    expected: DataType::$data_type.name(),
                    found: self.data_type.name(),
                }),
            }
        }
    };
}

impl Property {
    property_accessor!(as_i8, I8, I8, i8);
    property_accessor!(as_i16, I16, I16, i16);
    property_accessor!(as_i32, I32, I32, i32);
    property_accessor!(as_i64, I64, I64, i64);
    property_accessor!(as_u8, U8, U8, u8);
    property_accessor!(as_u16, U16, U16, u16);
    property_accessor!(as_u32, U32, U32, u32);
    property_accessor!(as_u64, U64, U64, u64);
    property_accessor!(as_f32, Float, Float32, f32);
    property_accessor!(as_f64, Double, Float64, f64);
    property_accessor!(as_f128, Quad, Float128, Float128);
    property_accessor!(as_bool, Boolean, Boolean, bool);
    property_accessor!(as_timestamp, Timestamp, TimeStamp, Timestamp);
    property_accessor!(as_complex64, Complex64, Complex64, Complex<f32>);
    property_accessor!(as_complex128, Complex128, Complex128, Complex<f64>);

    pub fn as_string(&self) -> Result<&str> {
        match (&self.value, self.data_type) {
            (PropertyValue::String(v), DataType::String) => Ok(v),
            _ => Err(TdmsError::IncorrectType {
                expected: DataType::String.name(),
                found: self.data_type.name(),
            }),
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}
