// src/segment/metadata.rs
use std::collections::HashMap;
use std::io::Read;

use log::debug;

use crate::error::{Result, TdmsError};
use crate::metadata::{
    DaqmxScaler, RawDataIndex, ScalerKind, DIGITAL_LINE_SCALER, FORMAT_CHANGING_SCALER,
    MATCHES_PREVIOUS, NO_RAW_DATA,
};
use crate::segment::{LeadIn, Segment};
use crate::types::{DataType, Property, PropertyValue};
use crate::utils;

/// The reduced metadata of one segment: an immutable snapshot of every
/// object visible in it, in raw-data layout order, plus the derived chunk
/// geometry.
#[derive(Debug, Clone)]
pub(crate) struct SegmentMeta {
    pub objects: HashMap<String, SegmentObject>,

    /// Paths in the order their raw data is laid out. The data for
    /// consecutive objects with an index is adjacent within a chunk.
    pub object_order: Vec<String>,

    /// Byte size of one chunk: the sum of `total_size` over all objects
    /// with an index.
    pub chunk_size: u64,

    /// How many chunks of identical structure the segment carries.
    pub num_chunks: u64,
}

/// One object as it appears in one segment.
#[derive(Debug, Clone)]
pub(crate) struct SegmentObject {
    pub path: String,

    /// None means the object carries no raw data in this segment.
    pub index: Option<RawDataIndex>,

    /// Properties mentioned by this segment (or inherited into it).
    pub properties: HashMap<String, Property>,
}

/// Parses one segment's metadata block and folds it into both the
/// segment-local view (seeded from `prev` unless the lead-in announces a
/// new object list) and the file-scoped `root` object map.
pub(crate) fn read_segment_metadata<R: Read>(
    source: &mut R,
    segment_offset: u64,
    lead_in: &LeadIn,
    prev: Option<&Segment>,
    file_size: u64,
    root: &mut HashMap<String, SegmentObject>,
) -> Result<SegmentMeta> {
    let endianness = lead_in.endianness();
    let num_objects = utils::read_u32(source, endianness)?;

    let mut meta = SegmentMeta {
        objects: HashMap::with_capacity(num_objects as usize),
        object_order: Vec::with_capacity(num_objects as usize),
        chunk_size: 0,
        num_chunks: 0,
    };

    if !lead_in.toc.has_new_obj_list() {
        let prev = prev.ok_or_else(|| {
            TdmsError::InvalidFileFormat(
                "lead-in does not announce a new object list, but there is no prior segment"
                    .to_string(),
            )
        })?;

        for path in &prev.meta.object_order {
            meta.object_order.push(path.clone());
            meta.objects.insert(path.clone(), prev.meta.objects[path].clone());
        }
    }

    for i in 0..num_objects {
        let record = read_object(source, lead_in, prev)
            .map_err(|e| annotate_object(e, i))?;

        // Keep the file-scoped view current: the index mirrors the latest
        // non-null one (its data type must never change), properties
        // accumulate across segments.
        match root.get_mut(&record.path) {
            Some(existing) => {
                if record.index.is_some() {
                    existing.index = record.index.clone();
                }
                existing
                    .properties
                    .extend(record.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            None => {
                root.insert(record.path.clone(), record.clone());
            }
        }

        // Merge into the segment-local view. A path seen twice in one
        // segment is against the format, but the last record winning is a
        // harmless way to tolerate it.
        match meta.objects.get_mut(&record.path) {
            Some(existing) => {
                if record.index.is_some() {
                    existing.index = record.index;
                }
                existing.properties.extend(record.properties);
            }
            None => {
                meta.object_order.push(record.path.clone());
                meta.objects.insert(record.path.clone(), record);
            }
        }
    }

    meta.chunk_size = meta
        .objects
        .values()
        .filter_map(|obj| obj.index.as_ref())
        .map(|index| index.total_size)
        .sum();

    let total_raw_data_size = if lead_in.is_incomplete() {
        let raw_data_start = segment_offset + LeadIn::SIZE + lead_in.raw_data_offset;
        file_size.saturating_sub(raw_data_start)
    } else {
        lead_in
            .next_segment_offset
            .saturating_sub(lead_in.raw_data_offset)
    };

    if meta.chunk_size > 0 {
        meta.num_chunks = total_raw_data_size / meta.chunk_size;
        let remainder = total_raw_data_size % meta.chunk_size;
        if remainder != 0 {
            if lead_in.is_incomplete() {
                // A crashed writer leaves a partial trailing chunk; count it
                // so the readable prefix stays reachable. The streaming
                // reader stops at the physical end of the file.
                meta.num_chunks += 1;
            } else {
                debug!(
                    "segment at offset {segment_offset} has {remainder} trailing raw bytes"
                );
            }
        }
    }

    // Lay the objects out. In a contiguous segment each object's chunk
    // share follows the previous object's in full. In an interleaved
    // segment a chunk is rows of one sample per object, so first samples
    // sit one sample width apart and the stride between consecutive
    // samples of one object is one sample from every other object.
    let interleaved = lead_in.toc.is_interleaved();
    let row_width: u64 = meta
        .objects
        .values()
        .filter_map(|obj| obj.index.as_ref())
        .filter(|index| index.total_size > 0 && index.num_values > 0)
        .map(|index| index.total_size / index.num_values)
        .sum();

    let mut data_offset = segment_offset + LeadIn::SIZE + lead_in.raw_data_offset;
    for path in &meta.object_order {
        let obj = meta
            .objects
            .get_mut(path)
            .expect("object order entries are always in the map");
        let Some(index) = obj.index.as_mut() else {
            continue;
        };
        if index.total_size == 0 || index.num_values == 0 {
            continue;
        }

        let value_width = index.total_size / index.num_values;
        index.offset = data_offset;
        index.stride = row_width - value_width;
        data_offset += if interleaved {
            value_width
        } else {
            index.total_size
        };
    }

    Ok(meta)
}

fn annotate_object(error: TdmsError, index: u32) -> TdmsError {
    match error {
        TdmsError::InvalidFileFormat(msg) => {
            TdmsError::InvalidFileFormat(format!("object {index}: {msg}"))
        }
        other => other,
    }
}

/// Parses one object record: path, raw-index header (and the index body it
/// announces), then the property list.
fn read_object<R: Read>(
    source: &mut R,
    lead_in: &LeadIn,
    prev: Option<&Segment>,
) -> Result<SegmentObject> {
    let endianness = lead_in.endianness();
    let path = utils::read_string(source, endianness)?;
    let raw_index_header = utils::read_u32(source, endianness)?;

    let mut index = match raw_index_header {
        NO_RAW_DATA => None,
        MATCHES_PREVIOUS => {
            let inherited = prev
                .and_then(|segment| segment.meta.objects.get(&path))
                .ok_or_else(|| {
                    TdmsError::InvalidFileFormat(format!(
                        "raw data index of {path} matches previous value, but no prior object found"
                    ))
                })?;
            inherited.index.clone()
        }
        FORMAT_CHANGING_SCALER => Some(read_index(source, lead_in, ScalerKind::FormatChanging)?),
        DIGITAL_LINE_SCALER => Some(read_index(source, lead_in, ScalerKind::DigitalLine)?),
        // Any other value is the historical byte length of the index that
        // follows; the length itself is redundant.
        _ => Some(read_index(source, lead_in, ScalerKind::None)?),
    };

    if let Some(index) = index.as_mut() {
        if index.data_type == DataType::String && lead_in.toc.is_interleaved() {
            return Err(TdmsError::InvalidFileFormat(
                "interleaved segments are not allowed with variable-width data types".to_string(),
            ));
        }
    }

    let num_properties = utils::read_u32(source, endianness)?;
    let mut properties = HashMap::with_capacity(num_properties as usize);
    for _ in 0..num_properties {
        let property = read_property(source, lead_in)?;
        properties.insert(property.name.clone(), property);
    }

    Ok(SegmentObject {
        path,
        index,
        properties,
    })
}

/// Reads the index body shared by normal and DAQmx indices: data type,
/// dimension (must be 1 in TDMS v2), sample count, then the size or scaler
/// block depending on the kind.
fn read_index<R: Read>(
    source: &mut R,
    lead_in: &LeadIn,
    scaler_kind: ScalerKind,
) -> Result<RawDataIndex> {
    let endianness = lead_in.endianness();

    let mut bytes = [0u8; 16];
    utils::read_exact(source, &mut bytes)?;

    let type_code = endianness.u32(&bytes[0..4]);
    let data_type =
        DataType::from_u32(type_code).ok_or(TdmsError::UnsupportedType(type_code))?;

    let dimension = endianness.u32(&bytes[4..8]);
    if dimension != 1 {
        return Err(TdmsError::InvalidFileFormat(format!(
            "raw data index dimension must be 1 in TDMS v2, found {dimension}"
        )));
    }

    let num_values = endianness.u64(&bytes[8..16]);
    let mut index = RawDataIndex::new(scaler_kind, data_type, num_values);

    if scaler_kind == ScalerKind::None {
        if data_type == DataType::String {
            // Variable-width data carries its chunk byte size explicitly.
            index.total_size = utils::read_u64(source, endianness)?;
        } else {
            index.total_size = num_values * data_type.size() as u64;
        }
        return Ok(index);
    }

    // TODO: confirm the scaler record stride against a reference DAQmx
    // capture. The five 32-bit fields below span 20 bytes, but at least one
    // reader advances only 16 bytes per record.
    let num_scalers = utils::read_u32(source, endianness)?;
    index.scalers = Vec::with_capacity(num_scalers as usize);
    for _ in 0..num_scalers {
        let mut scaler_bytes = [0u8; 20];
        utils::read_exact(source, &mut scaler_bytes)?;
        index.scalers.push(DaqmxScaler {
            type_code: endianness.u32(&scaler_bytes[0..4]),
            raw_buffer_index: endianness.u32(&scaler_bytes[4..8]),
            raw_byte_offset: endianness.u32(&scaler_bytes[8..12]),
            sample_format_bitmap: endianness.u32(&scaler_bytes[12..16]),
            scale_id: endianness.u32(&scaler_bytes[16..20]),
        });
    }

    let num_widths = utils::read_u32(source, endianness)?;
    index.widths = Vec::with_capacity(num_widths as usize);
    for _ in 0..num_widths {
        index.widths.push(utils::read_u32(source, endianness)?);
    }

    index.total_size = num_values * index.widths.iter().map(|&w| u64::from(w)).sum::<u64>();

    Ok(index)
}

fn read_property<R: Read>(source: &mut R, lead_in: &LeadIn) -> Result<Property> {
    let endianness = lead_in.endianness();
    let name = utils::read_string(source, endianness)?;
    let type_code = utils::read_u32(source, endianness)?;
    let data_type =
        DataType::from_u32(type_code).ok_or(TdmsError::UnsupportedType(type_code))?;
    let value = PropertyValue::read(source, data_type, endianness)?;

    Ok(Property {
        name,
        data_type,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TocFlags;
    use std::io::Cursor;

    fn lead_in(toc: u32) -> LeadIn {
        LeadIn {
            toc: TocFlags::new(toc),
            version: 4713,
            next_segment_offset: 0,
            raw_data_offset: 0,
        }
    }

    fn push_string(bytes: &mut Vec<u8>, s: &str) {
        bytes.extend_from_slice(&(s.len() as u32).to_le_bytes());
        bytes.extend_from_slice(s.as_bytes());
    }

    /// A metadata block with a single Int32 channel of `num_values` samples
    /// and no properties.
    fn single_channel_block(path: &str, num_values: u64) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_le_bytes()); // object count
        push_string(&mut bytes, path);
        bytes.extend_from_slice(&20u32.to_le_bytes()); // index length (historical)
        bytes.extend_from_slice(&(DataType::I32 as u32).to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes()); // dimension
        bytes.extend_from_slice(&num_values.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes()); // property count
        bytes
    }

    #[test]
    fn test_single_channel_metadata() {
        let mut lead_in = lead_in(TocFlags::METADATA | TocFlags::NEW_OBJ_LIST | TocFlags::RAW_DATA);
        lead_in.next_segment_offset = 100 + 400;
        lead_in.raw_data_offset = 100;

        let block = single_channel_block("/'G'/'C'", 100);
        let mut root = HashMap::new();
        let meta = read_segment_metadata(
            &mut Cursor::new(block),
            0,
            &lead_in,
            None,
            1000,
            &mut root,
        )
        .unwrap();

        assert_eq!(meta.object_order, vec!["/'G'/'C'".to_string()]);
        assert_eq!(meta.chunk_size, 400);
        assert_eq!(meta.num_chunks, 1);

        let index = meta.objects["/'G'/'C'"].index.as_ref().unwrap();
        assert_eq!(index.data_type, DataType::I32);
        assert_eq!(index.num_values, 100);
        assert_eq!(index.total_size, 400);
        assert_eq!(index.offset, LeadIn::SIZE + 100);
        assert_eq!(index.stride, 0);

        assert!(root.contains_key("/'G'/'C'"));
    }

    #[test]
    fn test_multiple_chunks() {
        let mut lead_in = lead_in(TocFlags::METADATA | TocFlags::NEW_OBJ_LIST | TocFlags::RAW_DATA);
        lead_in.next_segment_offset = 50 + 1200;
        lead_in.raw_data_offset = 50;

        let block = single_channel_block("/'G'/'C'", 100);
        let mut root = HashMap::new();
        let meta = read_segment_metadata(
            &mut Cursor::new(block),
            0,
            &lead_in,
            None,
            5000,
            &mut root,
        )
        .unwrap();

        assert_eq!(meta.chunk_size, 400);
        assert_eq!(meta.num_chunks, 3);
    }

    #[test]
    fn test_no_new_object_list_without_prior_segment() {
        let lead_in = lead_in(TocFlags::METADATA | TocFlags::RAW_DATA);
        let block = single_channel_block("/'G'/'C'", 10);
        let mut root = HashMap::new();
        let err = read_segment_metadata(
            &mut Cursor::new(block),
            0,
            &lead_in,
            None,
            1000,
            &mut root,
        )
        .unwrap_err();
        assert!(matches!(err, TdmsError::InvalidFileFormat(_)));
    }

    #[test]
    fn test_matches_previous_without_prior_object() {
        let lead_in = lead_in(TocFlags::METADATA | TocFlags::NEW_OBJ_LIST | TocFlags::RAW_DATA);

        let mut block = Vec::new();
        block.extend_from_slice(&1u32.to_le_bytes());
        push_string(&mut block, "/'G'/'C'");
        block.extend_from_slice(&MATCHES_PREVIOUS.to_le_bytes());
        block.extend_from_slice(&0u32.to_le_bytes());

        let mut root = HashMap::new();
        let err = read_segment_metadata(
            &mut Cursor::new(block),
            0,
            &lead_in,
            None,
            1000,
            &mut root,
        )
        .unwrap_err();
        assert!(matches!(err, TdmsError::InvalidFileFormat(_)));
    }

    #[test]
    fn test_string_channel_in_interleaved_segment() {
        let lead_in = lead_in(
            TocFlags::METADATA | TocFlags::NEW_OBJ_LIST | TocFlags::RAW_DATA | TocFlags::INTERLEAVED,
        );

        let mut block = Vec::new();
        block.extend_from_slice(&1u32.to_le_bytes());
        push_string(&mut block, "/'G'/'S'");
        block.extend_from_slice(&28u32.to_le_bytes());
        block.extend_from_slice(&(DataType::String as u32).to_le_bytes());
        block.extend_from_slice(&1u32.to_le_bytes());
        block.extend_from_slice(&3u64.to_le_bytes());
        block.extend_from_slice(&18u64.to_le_bytes()); // total size
        block.extend_from_slice(&0u32.to_le_bytes());

        let mut root = HashMap::new();
        let err = read_segment_metadata(
            &mut Cursor::new(block),
            0,
            &lead_in,
            None,
            1000,
            &mut root,
        )
        .unwrap_err();
        assert!(matches!(err, TdmsError::InvalidFileFormat(_)));
    }

    #[test]
    fn test_bad_index_dimension() {
        let lead_in = lead_in(TocFlags::METADATA | TocFlags::NEW_OBJ_LIST | TocFlags::RAW_DATA);

        let mut block = Vec::new();
        block.extend_from_slice(&1u32.to_le_bytes());
        push_string(&mut block, "/'G'/'C'");
        block.extend_from_slice(&20u32.to_le_bytes());
        block.extend_from_slice(&(DataType::I32 as u32).to_le_bytes());
        block.extend_from_slice(&2u32.to_le_bytes()); // dimension 2: invalid
        block.extend_from_slice(&10u64.to_le_bytes());
        block.extend_from_slice(&0u32.to_le_bytes());

        let mut root = HashMap::new();
        let err = read_segment_metadata(
            &mut Cursor::new(block),
            0,
            &lead_in,
            None,
            1000,
            &mut root,
        )
        .unwrap_err();
        assert!(matches!(err, TdmsError::InvalidFileFormat(_)));
    }

    #[test]
    fn test_layout_order_and_strides() {
        // Two contiguous channels: 3 x i16 then 3 x f64. Offsets are
        // adjacent in record order; the stride between samples of one
        // channel, were the rows interleaved, is the other channel's
        // single sample (8 bytes past an i16, 2 bytes past an f64).
        let mut lead_in = lead_in(TocFlags::METADATA | TocFlags::NEW_OBJ_LIST | TocFlags::RAW_DATA);
        lead_in.raw_data_offset = 0;
        lead_in.next_segment_offset = 30;

        let mut block = Vec::new();
        block.extend_from_slice(&2u32.to_le_bytes());
        for (path, dt, n) in [("/'G'/'A'", DataType::I16, 3u64), ("/'G'/'B'", DataType::Float64, 3)] {
            push_string(&mut block, path);
            block.extend_from_slice(&20u32.to_le_bytes());
            block.extend_from_slice(&(dt as u32).to_le_bytes());
            block.extend_from_slice(&1u32.to_le_bytes());
            block.extend_from_slice(&n.to_le_bytes());
            block.extend_from_slice(&0u32.to_le_bytes());
        }

        let mut root = HashMap::new();
        let meta = read_segment_metadata(
            &mut Cursor::new(block),
            1000,
            &lead_in,
            None,
            10_000,
            &mut root,
        )
        .unwrap();

        assert_eq!(meta.chunk_size, 6 + 24);
        let a = meta.objects["/'G'/'A'"].index.as_ref().unwrap();
        let b = meta.objects["/'G'/'B'"].index.as_ref().unwrap();
        assert_eq!(a.offset, 1000 + LeadIn::SIZE);
        assert_eq!(b.offset, a.offset + 6);
        assert_eq!(a.stride, 8);
        assert_eq!(b.stride, 2);
    }

    #[test]
    fn test_interleaved_layout() {
        // Two interleaved i16 channels with three samples each: first
        // samples sit one sample width (2 bytes) apart, and each sample is
        // followed by one 2-byte sample of the other channel.
        let mut lead_in = lead_in(
            TocFlags::METADATA | TocFlags::NEW_OBJ_LIST | TocFlags::RAW_DATA | TocFlags::INTERLEAVED,
        );
        lead_in.raw_data_offset = 0;
        lead_in.next_segment_offset = 12;

        let mut block = Vec::new();
        block.extend_from_slice(&2u32.to_le_bytes());
        for path in ["/'G'/'A'", "/'G'/'B'"] {
            push_string(&mut block, path);
            block.extend_from_slice(&20u32.to_le_bytes());
            block.extend_from_slice(&(DataType::I16 as u32).to_le_bytes());
            block.extend_from_slice(&1u32.to_le_bytes());
            block.extend_from_slice(&3u64.to_le_bytes());
            block.extend_from_slice(&0u32.to_le_bytes());
        }

        let mut root = HashMap::new();
        let meta = read_segment_metadata(
            &mut Cursor::new(block),
            0,
            &lead_in,
            None,
            10_000,
            &mut root,
        )
        .unwrap();

        assert_eq!(meta.chunk_size, 12);
        assert_eq!(meta.num_chunks, 1);
        let a = meta.objects["/'G'/'A'"].index.as_ref().unwrap();
        let b = meta.objects["/'G'/'B'"].index.as_ref().unwrap();
        assert_eq!(a.offset, LeadIn::SIZE);
        assert_eq!(b.offset, LeadIn::SIZE + 2);
        assert_eq!(a.stride, 2);
        assert_eq!(b.stride, 2);
    }

    #[test]
    fn test_daqmx_index() {
        let lead_in = lead_in(
            TocFlags::METADATA | TocFlags::NEW_OBJ_LIST | TocFlags::RAW_DATA | TocFlags::DAQMX_RAW_DATA,
        );

        let mut block = Vec::new();
        block.extend_from_slice(&1u32.to_le_bytes());
        push_string(&mut block, "/'G'/'D'");
        block.extend_from_slice(&FORMAT_CHANGING_SCALER.to_le_bytes());
        block.extend_from_slice(&(DataType::DaqmxRawData as u32).to_le_bytes());
        block.extend_from_slice(&1u32.to_le_bytes()); // dimension
        block.extend_from_slice(&100u64.to_le_bytes()); // values per chunk
        block.extend_from_slice(&1u32.to_le_bytes()); // scaler count
        block.extend_from_slice(&3u32.to_le_bytes()); // scaler data type (i16)
        block.extend_from_slice(&0u32.to_le_bytes()); // raw buffer index
        block.extend_from_slice(&2u32.to_le_bytes()); // byte offset in stride
        block.extend_from_slice(&0u32.to_le_bytes()); // sample format bitmap
        block.extend_from_slice(&1u32.to_le_bytes()); // scale id
        block.extend_from_slice(&1u32.to_le_bytes()); // width count
        block.extend_from_slice(&4u32.to_le_bytes()); // width
        block.extend_from_slice(&0u32.to_le_bytes()); // property count

        let mut root = HashMap::new();
        let meta = read_segment_metadata(
            &mut Cursor::new(block),
            0,
            &lead_in,
            None,
            10_000,
            &mut root,
        )
        .unwrap();

        let index = meta.objects["/'G'/'D'"].index.as_ref().unwrap();
        assert_eq!(index.scaler_kind, ScalerKind::FormatChanging);
        assert_eq!(index.num_values, 100);
        assert_eq!(index.total_size, 400);
        assert_eq!(index.scalers.len(), 1);
        assert_eq!(index.scalers[0].raw_byte_offset, 2);
        assert_eq!(index.scalers[0].scale_id, 1);
        assert_eq!(index.widths, vec![4]);
    }

    #[test]
    fn test_object_properties() {
        let lead_in = lead_in(TocFlags::METADATA | TocFlags::NEW_OBJ_LIST);

        let mut block = Vec::new();
        block.extend_from_slice(&1u32.to_le_bytes());
        push_string(&mut block, "/'G'");
        block.extend_from_slice(&NO_RAW_DATA.to_le_bytes());
        block.extend_from_slice(&2u32.to_le_bytes());
        push_string(&mut block, "rate");
        block.extend_from_slice(&(DataType::Float64 as u32).to_le_bytes());
        block.extend_from_slice(&1000.0f64.to_le_bytes());
        push_string(&mut block, "device");
        block.extend_from_slice(&(DataType::String as u32).to_le_bytes());
        push_string(&mut block, "PXI-4472");

        let mut root = HashMap::new();
        let meta = read_segment_metadata(
            &mut Cursor::new(block),
            0,
            &lead_in,
            None,
            1000,
            &mut root,
        )
        .unwrap();

        let group = &meta.objects["/'G'"];
        assert!(group.index.is_none());
        assert_eq!(group.properties["rate"].as_f64().unwrap(), 1000.0);
        assert_eq!(group.properties["device"].as_string().unwrap(), "PXI-4472");
        assert_eq!(meta.chunk_size, 0);
        assert_eq!(meta.num_chunks, 0);
    }
}
