// src/file.rs
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use log::debug;

use crate::error::{Result, TdmsError};
use crate::metadata::{ObjectPath, ScalerKind};
use crate::reader::{resolve_batch_size, BatchReader, ReadOption, Sample, ValueReader};
use crate::segment::{read_segment_metadata, LeadIn, Segment, SegmentObject};
use crate::types::{DataType, Endianness, Property};

#[cfg(feature = "mmap")]
use memmap2::Mmap;
#[cfg(feature = "mmap")]
use std::io::Cursor;

/// One raw-data chunk of one channel: where it starts and how to decode it.
///
/// An object index describes all chunks of a segment at once; a `DataChunk`
/// is the per-chunk expansion, so a segment with two channels and three
/// chunks yields six of these. Precomputing them once makes reading simple.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DataChunk {
    /// Absolute offset from the start of the file.
    pub offset: u64,
    pub is_interleaved: bool,
    pub endianness: Endianness,

    /// Byte size of this channel's data within the chunk.
    pub size: u64,
    pub num_values: u64,

    /// Bytes to skip between consecutive samples when interleaved.
    pub stride: u64,
}

/// A parsed TDMS file: groups, channels and properties, plus the byte
/// source the channel data is streamed from.
///
/// The hierarchy is immutable after construction. Channel reads go through
/// `&mut self` because they seek the shared byte source — the borrow
/// checker thereby enforces that at most one read sequence per file is live
/// at any time. Open the file again for concurrent reads.
#[derive(Debug)]
pub struct TdmsFile<R: Read + Seek> {
    /// Root-level properties of the file object.
    pub properties: HashMap<String, Property>,

    source: R,
    size: u64,
    is_index: bool,
    incomplete: bool,
    groups: HashMap<String, Group>,
    segments: Vec<Segment>,
    objects: HashMap<String, SegmentObject>,
}

/// A group of channels.
#[derive(Debug)]
pub struct Group {
    pub name: String,
    pub properties: HashMap<String, Property>,

    channels: HashMap<String, Channel>,
}

impl Group {
    pub fn channels(&self) -> &HashMap<String, Channel> {
        &self.channels
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }
}

/// A data channel within a group. Holds metadata and the precomputed chunk
/// catalog; the sample data itself is read through the owning
/// [`TdmsFile`].
#[derive(Debug)]
pub struct Channel {
    pub name: String,
    pub group_name: String,

    /// Sample type from the latest raw-data index; [`DataType::Void`] for
    /// channels that never carried raw data.
    pub data_type: DataType,
    pub properties: HashMap<String, Property>,

    path: String,
    data_chunks: Vec<DataChunk>,
    total_num_values: u64,
    daqmx: bool,
}

impl Channel {
    /// Total number of samples across all chunks of all segments.
    pub fn num_values(&self) -> u64 {
        self.total_num_values
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// The channel's unit, when the writer recorded one.
    pub fn unit(&self) -> Option<&str> {
        self.properties
            .get("unit_string")
            .and_then(|p| p.as_string().ok())
    }
}

impl TdmsFile<BufReader<File>> {
    /// Opens and parses the file at `path`. A filename ending in
    /// `.tdms_index` is treated as an index file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let is_index = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext == "tdms_index");
        let file = File::open(path)?;
        let size = file.metadata()?.len();

        Self::new(BufReader::with_capacity(65536, file), is_index, size)
    }
}

#[cfg(feature = "mmap")]
impl TdmsFile<Cursor<Mmap>> {
    /// Opens the file through a memory mapping instead of buffered reads.
    pub fn open_mmap(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let is_index = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext == "tdms_index");
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        let size = mmap.len() as u64;

        Self::new(Cursor::new(mmap), is_index, size)
    }
}

impl<R: Read + Seek> TdmsFile<R> {
    /// Attaches an arbitrary seekable byte source. `size` must be the total
    /// byte length reachable through it; `is_index` selects the expected
    /// magic bytes.
    pub fn new(source: R, is_index: bool, size: u64) -> Result<Self> {
        let mut file = TdmsFile {
            properties: HashMap::new(),
            source,
            size,
            is_index,
            incomplete: false,
            groups: HashMap::new(),
            segments: Vec::new(),
            objects: HashMap::new(),
        };

        file.read_metadata()?;
        Ok(file)
    }

    /// True when the final segment was never finished by its writer.
    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }

    pub fn is_index(&self) -> bool {
        self.is_index
    }

    pub fn groups(&self) -> &HashMap<String, Group> {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    pub fn channel(&self, group: &str, channel: &str) -> Option<&Channel> {
        self.groups.get(group).and_then(|g| g.channels.get(channel))
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Scans every segment in file order, folding each metadata block into
    /// the per-segment snapshots and the file-scoped object map, then
    /// projects the result into groups and channels.
    fn read_metadata(&mut self) -> Result<()> {
        self.source.seek(SeekFrom::Start(0))?;

        let mut current_offset = 0u64;
        loop {
            let segment_index = self.segments.len();
            let lead_in = LeadIn::read(&mut self.source, self.is_index)
                .map_err(|e| annotate_segment(e, segment_index, current_offset))?;

            if lead_in.toc.has_metadata() {
                let meta = read_segment_metadata(
                    &mut self.source,
                    current_offset,
                    &lead_in,
                    self.segments.last(),
                    self.size,
                    &mut self.objects,
                )
                .map_err(|e| annotate_segment(e, segment_index, current_offset))?;

                debug!(
                    "segment {segment_index} at offset {current_offset}: {} objects, {} chunks of {} bytes",
                    meta.object_order.len(),
                    meta.num_chunks,
                    meta.chunk_size,
                );

                self.segments.push(Segment {
                    offset: current_offset,
                    lead_in,
                    meta,
                });
            }

            if lead_in.is_incomplete() {
                // The writer crashed before finishing this segment; whatever
                // data made it to disk is still served.
                self.incomplete = true;
                break;
            }

            // The next segment offset is relative to the end of the lead-in.
            current_offset += lead_in.next_segment_offset + LeadIn::SIZE;
            if current_offset >= self.size {
                self.incomplete = false;
                break;
            }

            // Index files hold no raw data: the next lead-in follows the
            // metadata directly, so the cursor is already in place.
            if !self.is_index {
                self.source.seek(SeekFrom::Start(current_offset))?;
            }
        }

        self.project_objects()
    }

    /// Turns the reduced object map into the root/group/channel hierarchy
    /// and precomputes every channel's chunk catalog.
    fn project_objects(&mut self) -> Result<()> {
        // Channels are staged and attached at the end so that the outcome
        // does not depend on whether a group object is visited before its
        // channels.
        let mut staged: Vec<Channel> = Vec::new();

        for (path, obj) in &self.objects {
            match ObjectPath::parse(path)? {
                ObjectPath::Root => {
                    self.properties
                        .extend(obj.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
                ObjectPath::Group(name) => {
                    self.groups.insert(
                        name.clone(),
                        Group {
                            name,
                            properties: obj.properties.clone(),
                            channels: HashMap::new(),
                        },
                    );
                }
                ObjectPath::Channel { group, channel } => {
                    let mut chunks = Vec::new();
                    for segment in &self.segments {
                        if !segment.lead_in.toc.has_raw_data() {
                            continue;
                        }
                        let Some(seg_obj) = segment.meta.objects.get(path) else {
                            continue;
                        };
                        let Some(index) = seg_obj.index.as_ref() else {
                            continue;
                        };

                        for chunk_index in 0..segment.meta.num_chunks {
                            chunks.push(DataChunk {
                                offset: index.offset + chunk_index * segment.meta.chunk_size,
                                is_interleaved: segment.lead_in.toc.is_interleaved(),
                                endianness: segment.lead_in.endianness(),
                                size: index.total_size,
                                num_values: index.num_values,
                                stride: index.stride,
                            });
                        }
                    }

                    let total_num_values = chunks.iter().map(|c| c.num_values).sum();
                    let (data_type, daqmx) = match obj.index.as_ref() {
                        Some(index) => (index.data_type, index.scaler_kind != ScalerKind::None),
                        None => (DataType::Void, false),
                    };

                    staged.push(Channel {
                        name: channel,
                        group_name: group,
                        data_type,
                        properties: obj.properties.clone(),
                        path: path.clone(),
                        data_chunks: chunks,
                        total_num_values,
                        daqmx,
                    });
                }
            }
        }

        for channel in staged {
            let group = self.groups.get_mut(&channel.group_name).ok_or_else(|| {
                TdmsError::InvalidFileFormat(format!(
                    "channel {} sits under non-existent group {}",
                    channel.name, channel.group_name
                ))
            })?;
            group.channels.insert(channel.name.clone(), channel);
        }

        Ok(())
    }

    /// Starts a batched read sequence over a channel's samples. See
    /// [`BatchReader`] for the buffer-reuse contract.
    pub fn stream_channel_data<T: Sample>(
        &mut self,
        group: &str,
        channel: &str,
        options: &[ReadOption],
    ) -> Result<BatchReader<'_, T, R>> {
        let (chunks, data_type, batch_size) = {
            let ch = self.channel(group, channel).ok_or_else(|| {
                TdmsError::ChannelNotFound(
                    ObjectPath::Channel {
                        group: group.to_string(),
                        channel: channel.to_string(),
                    }
                    .to_string(),
                )
            })?;

            if ch.daqmx {
                return Err(TdmsError::UnsupportedType(DataType::DaqmxRawData as u32));
            }
            if ch.data_type == DataType::FixedPoint {
                return Err(TdmsError::UnsupportedType(DataType::FixedPoint as u32));
            }
            if ch.data_type.base() != T::DATA_TYPE {
                return Err(TdmsError::IncorrectType {
                    expected: T::DATA_TYPE.name(),
                    found: ch.data_type.name(),
                });
            }

            (
                ch.data_chunks.clone(),
                ch.data_type,
                resolve_batch_size(options, ch.data_type, ch.total_num_values),
            )
        };

        Ok(BatchReader::new(
            &mut self.source,
            chunks,
            data_type,
            batch_size,
        ))
    }

    /// Iterates over a channel's samples one value at a time.
    pub fn iter_channel_data<T: Sample>(
        &mut self,
        group: &str,
        channel: &str,
        options: &[ReadOption],
    ) -> Result<ValueReader<'_, T, R>> {
        Ok(ValueReader::new(
            self.stream_channel_data(group, channel, options)?,
        ))
    }

    /// Reads all of a channel's samples into one vector.
    pub fn read_channel_data<T: Sample>(
        &mut self,
        group: &str,
        channel: &str,
        options: &[ReadOption],
    ) -> Result<Vec<T>> {
        let total = self
            .channel(group, channel)
            .map(|c| c.total_num_values as usize)
            .unwrap_or(0);

        let mut values = Vec::with_capacity(total);
        let mut stream = self.stream_channel_data::<T>(group, channel, options)?;
        while let Some(batch) = stream.next_batch()? {
            values.extend_from_slice(batch);
        }
        Ok(values)
    }
}

fn annotate_segment(error: TdmsError, index: usize, offset: u64) -> TdmsError {
    match error {
        TdmsError::InvalidFileFormat(msg) => {
            TdmsError::InvalidFileFormat(format!("segment {index} at offset {offset}: {msg}"))
        }
        other => other,
    }
}
