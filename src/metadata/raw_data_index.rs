// src/metadata/raw_data_index.rs
use crate::types::DataType;

/// Raw-index header sentinel: the object carries no raw data in this segment.
pub(crate) const NO_RAW_DATA: u32 = 0xFFFF_FFFF;

/// Raw-index header sentinel: reuse the index from the previous segment.
pub(crate) const MATCHES_PREVIOUS: u32 = 0x0000_0000;

/// Raw-index header: a DAQmx format-changing scaler block follows.
pub(crate) const FORMAT_CHANGING_SCALER: u32 = 0x0000_1269;

/// Raw-index header: a DAQmx digital-line scaler block follows. NI's
/// documentation lists 0x0000_136A, but real files carry this value; the
/// documented one is believed to be a typo and is not accepted.
pub(crate) const DIGITAL_LINE_SCALER: u32 = 0x0000_126A;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScalerKind {
    None,
    FormatChanging,
    DigitalLine,
}

/// Per-segment description of one object's raw data: what type it is, how
/// many values one chunk holds, and where in the file its first sample
/// starts.
#[derive(Debug, Clone)]
pub(crate) struct RawDataIndex {
    pub scaler_kind: ScalerKind,
    pub data_type: DataType,
    pub num_values: u64,

    /// Total byte size of this object's samples for a single chunk. Read
    /// from the file for variable-width types, computed from the type width
    /// otherwise. For string channels this includes the offsets table.
    pub total_size: u64,

    /// Only populated for DAQmx raw data.
    pub scalers: Vec<DaqmxScaler>,

    /// Raw buffer widths, only populated for DAQmx raw data.
    pub widths: Vec<u32>,

    /// Absolute file offset of this object's first sample in the segment.
    pub offset: u64,

    /// Bytes to skip between consecutive samples of this object when the
    /// segment is interleaved: one sample from every other object lies in
    /// between.
    pub stride: u64,
}

impl RawDataIndex {
    pub fn new(scaler_kind: ScalerKind, data_type: DataType, num_values: u64) -> Self {
        RawDataIndex {
            scaler_kind,
            data_type,
            num_values,
            total_size: 0,
            scalers: Vec::new(),
            widths: Vec::new(),
            offset: 0,
            stride: 0,
        }
    }
}

/// One DAQmx scaler record. The reader retains these but does not apply
/// them; DAQmx channels cannot be streamed.
#[derive(Debug, Clone)]
pub(crate) struct DaqmxScaler {
    pub type_code: u32,
    pub raw_buffer_index: u32,
    pub raw_byte_offset: u32,
    pub sample_format_bitmap: u32,
    pub scale_id: u32,
}
