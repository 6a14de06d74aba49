//! Positional byte sources backing a map file.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use bytes::Bytes;
use parking_lot::Mutex;

use super::error::{MapFileError, MapFileResult};
use crate::codec::{DecodeError, MAXIMUM_BUFFER_SIZE};

/// Random-access reads over map-file bytes.
///
/// Implementations must be `Send + Sync`; every worker thread reads through
/// the same source.
pub trait BlockSource: Send + Sync {
    /// Reads exactly `len` bytes starting at absolute `position`.
    fn read_at(&self, position: u64, len: usize) -> MapFileResult<Bytes>;

    /// Total length of the source in bytes.
    fn len(&self) -> u64;

    /// Returns true if the source holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Validates a read request before any buffer is allocated.
fn check_read(position: u64, len: usize, source_len: u64) -> MapFileResult<()> {
    if len > MAXIMUM_BUFFER_SIZE {
        return Err(DecodeError::LengthTooLarge {
            len,
            max: MAXIMUM_BUFFER_SIZE,
        }
        .into());
    }
    let end = position.checked_add(len as u64);
    if end.map_or(true, |end| end > source_len) {
        return Err(MapFileError::ReadPastEnd {
            position,
            len,
            source_len,
        });
    }
    Ok(())
}

/// Map-file bytes held in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Bytes,
}

impl MemorySource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

impl BlockSource for MemorySource {
    fn read_at(&self, position: u64, len: usize) -> MapFileResult<Bytes> {
        check_read(position, len, self.data.len() as u64)?;
        let start = position as usize;
        Ok(self.data.slice(start..start + len))
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Map-file bytes read from disk.
///
/// Each read seeks and fills under the file lock.
#[derive(Debug)]
pub struct FileSource {
    file: Mutex<File>,
    len: u64,
}

impl FileSource {
    /// Opens a map file for reading.
    pub fn open(path: impl AsRef<Path>) -> MapFileResult<Self> {
        let file = File::open(path.as_ref())?;
        let len = file.metadata()?.len();
        Ok(Self {
            file: Mutex::new(file),
            len,
        })
    }
}

impl BlockSource for FileSource {
    fn read_at(&self, position: u64, len: usize) -> MapFileResult<Bytes> {
        check_read(position, len, self.len)?;
        let mut buffer = vec![0u8; len];
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(position))?;
            file.read_exact(&mut buffer)?;
        }
        Ok(Bytes::from(buffer))
    }

    fn len(&self) -> u64 {
        self.len
    }
}
