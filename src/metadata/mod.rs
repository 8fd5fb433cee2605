// src/metadata/mod.rs
mod object_path;
mod raw_data_index;

pub use object_path::ObjectPath;
pub(crate) use raw_data_index::{
    DaqmxScaler, RawDataIndex, ScalerKind, DIGITAL_LINE_SCALER, FORMAT_CHANGING_SCALER,
    MATCHES_PREVIOUS, NO_RAW_DATA,
};
