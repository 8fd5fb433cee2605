// tests/common/mod.rs
//! Helpers for composing synthetic TDMS files in memory.
#![allow(dead_code)]

use std::io::Cursor;

use tdms_reader::{Result, TdmsFile};

pub const TOC_METADATA: u32 = 1 << 1;
pub const TOC_NEW_OBJ_LIST: u32 = 1 << 2;
pub const TOC_RAW_DATA: u32 = 1 << 3;
pub const TOC_INTERLEAVED: u32 = 1 << 5;
pub const TOC_BIG_ENDIAN: u32 = 1 << 6;
pub const TOC_DAQMX_RAW_DATA: u32 = 1 << 7;

pub const NO_RAW_DATA: u32 = 0xFFFF_FFFF;
pub const MATCHES_PREVIOUS: u32 = 0x0000_0000;
pub const FORMAT_CHANGING_SCALER: u32 = 0x0000_1269;

pub const TYPE_I16: u32 = 2;
pub const TYPE_I32: u32 = 3;
pub const TYPE_U32: u32 = 7;
pub const TYPE_F64: u32 = 10;
pub const TYPE_F128: u32 = 11;
pub const TYPE_STRING: u32 = 0x20;
pub const TYPE_BOOL: u32 = 0x21;
pub const TYPE_TIMESTAMP: u32 = 0x44;
pub const TYPE_COMPLEX64: u32 = 0x0008_000C;

pub fn push_string(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

/// An object record with no raw-data index and no properties.
pub fn object_no_raw(path: &str) -> Vec<u8> {
    let mut out = Vec::new();
    push_string(&mut out, path);
    out.extend_from_slice(&NO_RAW_DATA.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out
}

/// An object record with a fixed-width raw-data index and no properties.
pub fn object_fixed(path: &str, type_code: u32, num_values: u64) -> Vec<u8> {
    object_fixed_with_props(path, type_code, num_values, &[])
}

/// A property triple: name, wire type code, encoded value bytes.
pub type PropSpec<'a> = (&'a str, u32, Vec<u8>);

pub fn object_fixed_with_props(
    path: &str,
    type_code: u32,
    num_values: u64,
    props: &[PropSpec],
) -> Vec<u8> {
    let mut out = Vec::new();
    push_string(&mut out, path);
    out.extend_from_slice(&20u32.to_le_bytes()); // historical index length
    out.extend_from_slice(&type_code.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes()); // dimension
    out.extend_from_slice(&num_values.to_le_bytes());
    push_props(&mut out, props);
    out
}

pub fn object_string_channel(path: &str, num_values: u64, total_size: u64) -> Vec<u8> {
    let mut out = Vec::new();
    push_string(&mut out, path);
    out.extend_from_slice(&28u32.to_le_bytes());
    out.extend_from_slice(&TYPE_STRING.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&num_values.to_le_bytes());
    out.extend_from_slice(&total_size.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out
}

pub fn object_matches_previous(path: &str, props: &[PropSpec]) -> Vec<u8> {
    let mut out = Vec::new();
    push_string(&mut out, path);
    out.extend_from_slice(&MATCHES_PREVIOUS.to_le_bytes());
    push_props(&mut out, props);
    out
}

pub fn object_props_only(path: &str, props: &[PropSpec]) -> Vec<u8> {
    let mut out = Vec::new();
    push_string(&mut out, path);
    out.extend_from_slice(&NO_RAW_DATA.to_le_bytes());
    push_props(&mut out, props);
    out
}

fn push_props(out: &mut Vec<u8>, props: &[PropSpec]) {
    out.extend_from_slice(&(props.len() as u32).to_le_bytes());
    for (name, type_code, value) in props {
        push_string(out, name);
        out.extend_from_slice(&type_code.to_le_bytes());
        out.extend_from_slice(value);
    }
}

/// Assembles one little-endian segment: lead-in, metadata block, raw data.
/// `next_segment_offset` and `raw_data_offset` are derived from the content
/// unless overridden.
pub fn segment_with(
    tag: &[u8; 4],
    toc: u32,
    objects: &[Vec<u8>],
    raw: &[u8],
    next_override: Option<u64>,
) -> Vec<u8> {
    let mut meta = Vec::new();
    meta.extend_from_slice(&(objects.len() as u32).to_le_bytes());
    for object in objects {
        meta.extend_from_slice(object);
    }

    let raw_data_offset = meta.len() as u64;
    let next_segment_offset = next_override.unwrap_or(raw_data_offset + raw.len() as u64);

    let mut out = Vec::new();
    out.extend_from_slice(tag);
    out.extend_from_slice(&toc.to_le_bytes());
    out.extend_from_slice(&4713u32.to_le_bytes());
    out.extend_from_slice(&next_segment_offset.to_le_bytes());
    out.extend_from_slice(&raw_data_offset.to_le_bytes());
    out.extend(meta);
    out.extend_from_slice(raw);
    out
}

pub fn segment(toc: u32, objects: &[Vec<u8>], raw: &[u8]) -> Vec<u8> {
    segment_with(b"TDSm", toc, objects, raw, None)
}

pub fn raw_i16(values: &[i16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn raw_i32(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn raw_f64(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn open(bytes: Vec<u8>) -> Result<TdmsFile<Cursor<Vec<u8>>>> {
    let size = bytes.len() as u64;
    TdmsFile::new(Cursor::new(bytes), false, size)
}

pub fn open_index(bytes: Vec<u8>) -> Result<TdmsFile<Cursor<Vec<u8>>>> {
    let size = bytes.len() as u64;
    TdmsFile::new(Cursor::new(bytes), true, size)
}
