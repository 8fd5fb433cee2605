// src/utils.rs
use std::io::{self, Read};

use crate::error::{Result, TdmsError};
use crate::types::Endianness;

/// read_exact with short reads reported as [`TdmsError::ReadFailed`].
pub(crate) fn read_exact<R: Read>(source: &mut R, buf: &mut [u8]) -> Result<()> {
    source.read_exact(buf).map_err(TdmsError::ReadFailed)
}

/// Fills as much of `buf` as the source can provide. Returns the number of
/// bytes read; fewer than `buf.len()` means the source hit its end.
pub(crate) fn read_up_to<R: Read>(source: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TdmsError::ReadFailed(e)),
        }
    }
    Ok(filled)
}

pub(crate) fn read_u32<R: Read>(source: &mut R, endianness: Endianness) -> Result<u32> {
    let mut bytes = [0u8; 4];
    read_exact(source, &mut bytes)?;
    Ok(endianness.u32(&bytes))
}

pub(crate) fn read_u64<R: Read>(source: &mut R, endianness: Endianness) -> Result<u64> {
    let mut bytes = [0u8; 8];
    read_exact(source, &mut bytes)?;
    Ok(endianness.u64(&bytes))
}

/// Reads a length-prefixed UTF-8 string: a 32-bit length in the segment
/// byte order followed by that many bytes, no terminator.
pub(crate) fn read_string<R: Read>(source: &mut R, endianness: Endianness) -> Result<String> {
    let length = read_u32(source, endianness)? as usize;
    if length == 0 {
        return Ok(String::new());
    }

    let mut bytes = vec![0u8; length];
    read_exact(source, &mut bytes)?;
    String::from_utf8(bytes)
        .map_err(|_| TdmsError::InvalidFileFormat("invalid UTF-8 in string".to_string()))
}
