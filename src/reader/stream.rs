// src/reader/stream.rs
use std::io::{Read, Seek, SeekFrom};

use crate::error::{Result, TdmsError};
use crate::file::DataChunk;
use crate::reader::Sample;
use crate::types::DataType;
use crate::utils;

/// Options for the channel read operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOption {
    /// Number of samples decoded per internal read. Defaults to 2056 for
    /// fixed-width types and 256 for strings.
    BatchSize(usize),
}

pub(crate) fn resolve_batch_size(
    options: &[ReadOption],
    data_type: DataType,
    total_values: u64,
) -> usize {
    let mut batch_size = 0;
    for option in options {
        match option {
            ReadOption::BatchSize(n) => batch_size = *n,
        }
    }

    if batch_size == 0 {
        // Strings are generally much larger than individual scalars, so the
        // default batch is smaller.
        batch_size = if data_type.base() == DataType::String {
            256
        } else {
            2056
        };
    }

    // No point allocating a batch larger than the channel itself.
    batch_size.min(total_values.max(1) as usize)
}

/// Streams one channel's samples in batches, lazily and in file order:
/// segment order, then chunk order, then sample order within a chunk.
///
/// The batch buffer belongs to the reader and is reused between
/// [`BatchReader::next_batch`] calls; copy out anything that must outlive
/// the next call. While the reader is live it mutably borrows the file, so
/// only one read sequence per file can exist at a time.
///
/// Reaching the physical end of the file inside the last chunk ends the
/// sequence cleanly rather than failing, which keeps incomplete files
/// readable up to their truncation point.
pub struct BatchReader<'f, T: Sample, R: Read + Seek> {
    source: &'f mut R,
    chunks: Vec<DataChunk>,

    /// Wire width of one sample, 0 for strings.
    width: usize,
    is_string: bool,
    batch_size: usize,

    chunk_index: usize,
    chunk_active: bool,
    bytes_read: u64,
    values_processed: u64,

    /// String chunk offsets table with a synthetic leading 0, so value i
    /// spans `offsets[i]..offsets[i+1]` of the payload region.
    string_offsets: Vec<u32>,

    scratch: Vec<u8>,
    batch: Vec<T>,
    done: bool,
}

impl<'f, T: Sample, R: Read + Seek> BatchReader<'f, T, R> {
    pub(crate) fn new(
        source: &'f mut R,
        chunks: Vec<DataChunk>,
        data_type: DataType,
        batch_size: usize,
    ) -> Self {
        BatchReader {
            source,
            chunks,
            width: data_type.size(),
            is_string: data_type.base() == DataType::String,
            batch_size,
            chunk_index: 0,
            chunk_active: false,
            bytes_read: 0,
            values_processed: 0,
            string_offsets: Vec::new(),
            scratch: Vec::new(),
            batch: Vec::new(),
            done: false,
        }
    }

    /// Produces the next non-empty batch, or None once the channel is
    /// exhausted. The returned slice is valid until the next call.
    pub fn next_batch(&mut self) -> Result<Option<&[T]>> {
        let produced = loop {
            if self.done {
                return Ok(None);
            }
            if self.chunk_index >= self.chunks.len() {
                self.done = true;
                return Ok(None);
            }

            let chunk = self.chunks[self.chunk_index];
            if !self.chunk_active {
                if !self.begin_chunk(&chunk)? {
                    self.advance_chunk();
                    continue;
                }
            }

            if self.values_processed >= chunk.num_values || self.bytes_read >= chunk.size {
                self.advance_chunk();
                continue;
            }

            let produced = if self.is_string {
                self.fill_string_batch(&chunk)?
            } else if chunk.is_interleaved {
                self.fill_interleaved_batch(&chunk)?
            } else {
                self.fill_contiguous_batch(&chunk)?
            };

            if produced == 0 {
                self.advance_chunk();
                continue;
            }

            self.values_processed += produced as u64;
            break produced;
        };

        Ok(Some(&self.batch[..produced]))
    }

    fn advance_chunk(&mut self) {
        self.chunk_index += 1;
        self.chunk_active = false;
    }

    /// Positions the source at the chunk start and, for strings, loads the
    /// offsets table. Returns false when the chunk has nothing readable.
    fn begin_chunk(&mut self, chunk: &DataChunk) -> Result<bool> {
        self.source.seek(SeekFrom::Start(chunk.offset))?;
        self.bytes_read = 0;
        self.values_processed = 0;
        self.chunk_active = true;

        if self.is_string {
            let table_len = chunk.num_values as usize * 4;
            self.scratch.resize(table_len, 0);
            let got = utils::read_up_to(self.source, &mut self.scratch)?;
            self.bytes_read += got as u64;
            if got < table_len {
                // Truncated offsets table: no string in this chunk can be
                // delimited.
                return Ok(false);
            }

            self.string_offsets.clear();
            self.string_offsets.push(0);
            for i in 0..chunk.num_values as usize {
                self.string_offsets
                    .push(chunk.endianness.u32(&self.scratch[i * 4..i * 4 + 4]));
            }
        }

        Ok(true)
    }

    fn fill_contiguous_batch(&mut self, chunk: &DataChunk) -> Result<usize> {
        let remaining_values = (chunk.num_values - self.values_processed) as usize;
        let want_values = self.batch_size.min(remaining_values);
        let bytes_left = chunk.size - self.bytes_read;
        let want_bytes = ((want_values * self.width) as u64).min(bytes_left) as usize;
        if want_bytes == 0 {
            return Ok(0);
        }

        self.scratch.resize(want_bytes, 0);
        let got = utils::read_up_to(self.source, &mut self.scratch)?;
        self.bytes_read += got as u64;
        if got < want_bytes {
            // Physical end of file inside the chunk; whole samples below,
            // the partial tail is dropped.
            self.bytes_read = chunk.size;
        }

        let complete = (got / self.width).min(want_values);
        self.batch.clear();
        for i in 0..complete {
            self.batch.push(T::from_bytes(
                &self.scratch[i * self.width..(i + 1) * self.width],
                chunk.endianness,
            ));
        }
        Ok(complete)
    }

    fn fill_interleaved_batch(&mut self, chunk: &DataChunk) -> Result<usize> {
        if self.width == 0 {
            return Err(TdmsError::InvalidFileFormat(
                "interleaved data chunks cannot contain variable-width data types".to_string(),
            ));
        }

        let remaining_values = (chunk.num_values - self.values_processed) as usize;
        let want_values = self.batch_size.min(remaining_values);

        self.batch.clear();
        self.scratch.resize(self.width, 0);
        for i in 0..want_values {
            // The first sample of the chunk sits right at the chunk offset;
            // every later one is a stride away from its predecessor.
            if self.values_processed > 0 || i > 0 {
                self.source.seek(SeekFrom::Current(chunk.stride as i64))?;
            }

            let got = utils::read_up_to(self.source, &mut self.scratch)?;
            if got < self.width {
                self.bytes_read = chunk.size;
                break;
            }

            self.bytes_read += self.width as u64;
            self.batch
                .push(T::from_bytes(&self.scratch, chunk.endianness));
        }

        Ok(self.batch.len())
    }

    fn fill_string_batch(&mut self, chunk: &DataChunk) -> Result<usize> {
        let processed = self.values_processed as usize;
        let remaining_values = chunk.num_values as usize - processed;
        let want_values = self.batch_size.min(remaining_values);

        let start = self.string_offsets[processed];
        let end = self.string_offsets[processed + want_values];
        if end < start {
            return Err(TdmsError::InvalidFileFormat(
                "string offsets are not monotonically increasing".to_string(),
            ));
        }

        // The batch buffer must be re-sized per batch: string payload sizes
        // are only known from the offsets table.
        let payload_len = (end - start) as usize;
        self.scratch.resize(payload_len, 0);
        let got = utils::read_up_to(self.source, &mut self.scratch)?;
        self.bytes_read += got as u64;

        self.batch.clear();
        for i in 0..want_values {
            let value_start = self.string_offsets[processed + i];
            let value_end = self.string_offsets[processed + i + 1];
            if value_end < value_start {
                return Err(TdmsError::InvalidFileFormat(
                    "string offsets are not monotonically increasing".to_string(),
                ));
            }

            let local_start = (value_start - start) as usize;
            let local_end = (value_end - start) as usize;
            if local_end > got {
                // Truncated payload: this string is incomplete.
                break;
            }

            self.batch.push(T::from_bytes(
                &self.scratch[local_start..local_end],
                chunk.endianness,
            ));
        }

        if got < payload_len {
            self.bytes_read = chunk.size;
        }
        Ok(self.batch.len())
    }
}

/// Streams one channel's samples one value at a time. Batching still
/// happens internally; this just unwraps the batches.
pub struct ValueReader<'f, T: Sample, R: Read + Seek> {
    inner: BatchReader<'f, T, R>,
    pending: Vec<T>,
    cursor: usize,
    failed: bool,
}

impl<'f, T: Sample, R: Read + Seek> ValueReader<'f, T, R> {
    pub(crate) fn new(inner: BatchReader<'f, T, R>) -> Self {
        ValueReader {
            inner,
            pending: Vec::new(),
            cursor: 0,
            failed: false,
        }
    }
}

impl<T: Sample, R: Read + Seek> Iterator for ValueReader<'_, T, R> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        if self.cursor < self.pending.len() {
            let value = self.pending[self.cursor].clone();
            self.cursor += 1;
            return Some(Ok(value));
        }

        match self.inner.next_batch() {
            Ok(Some(batch)) => {
                self.pending.clear();
                self.pending.extend_from_slice(batch);
                self.cursor = 1;
                Some(Ok(self.pending[0].clone()))
            }
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
