// src/segment/lead_in.rs
use std::io::Read;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Result, TdmsError};
use crate::types::{Endianness, TocFlags};
use crate::utils;

/// The fixed 28-byte segment header.
#[derive(Debug, Clone, Copy)]
pub struct LeadIn {
    pub toc: TocFlags,
    pub version: u32,

    /// Offset from the end of the lead-in to the next segment, or
    /// [`LeadIn::INCOMPLETE`] when the writer crashed mid-segment.
    pub next_segment_offset: u64,

    /// Offset from the end of the lead-in to the raw data, i.e. the byte
    /// length of the metadata block.
    pub raw_data_offset: u64,
}

impl LeadIn {
    pub const SIZE: u64 = 28;
    pub const DATA_TAG: &'static [u8; 4] = b"TDSm";
    pub const INDEX_TAG: &'static [u8; 4] = b"TDSh";
    pub const INCOMPLETE: u64 = 0xFFFF_FFFF_FFFF_FFFF;

    /// Consumes exactly 28 bytes from the source. `is_index` selects which
    /// magic tag is required.
    pub fn read<R: Read>(source: &mut R, is_index: bool) -> Result<LeadIn> {
        let mut bytes = [0u8; Self::SIZE as usize];
        utils::read_exact(source, &mut bytes)?;

        let expected: &[u8; 4] = if is_index {
            Self::INDEX_TAG
        } else {
            Self::DATA_TAG
        };
        if &bytes[0..4] != expected {
            return Err(TdmsError::InvalidFileFormat(format!(
                "invalid magic bytes {:?}, expected {:?}",
                String::from_utf8_lossy(&bytes[0..4]),
                String::from_utf8_lossy(expected),
            )));
        }

        // The TOC bitmask is always little-endian, even when it flags the
        // rest of the segment as big-endian.
        let toc = TocFlags::new(LittleEndian::read_u32(&bytes[4..8]));
        let endianness = if toc.is_big_endian() {
            Endianness::Big
        } else {
            Endianness::Little
        };

        let version = endianness.u32(&bytes[8..12]);
        if version != 4712 && version != 4713 {
            return Err(TdmsError::UnsupportedVersion(version));
        }

        Ok(LeadIn {
            toc,
            version,
            next_segment_offset: endianness.u64(&bytes[12..20]),
            raw_data_offset: endianness.u64(&bytes[20..28]),
        })
    }

    pub fn endianness(&self) -> Endianness {
        if self.toc.is_big_endian() {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }

    pub fn is_incomplete(&self) -> bool {
        self.next_segment_offset == Self::INCOMPLETE
    }
}
