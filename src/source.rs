//!
//! Byte sources feed the decoder and supply the original bytes that the writer copies verbatim.  Data sources back element content that lives somewhere else than the document (attached files).
//!

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use super::errors::source::SourceError;

const MAX_REOPEN_ATTEMPTS: usize = 3;

///
/// A byte range of a source.  `end` is exclusive; a missing bound means "from the beginning" or "to the end".
///
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ByteRange {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        ByteRange { start: Some(start), end: Some(end) }
    }

    pub fn from(start: u64) -> Self {
        ByteRange { start: Some(start), end: None }
    }

    pub fn all() -> Self {
        ByteRange::default()
    }
}

///
/// An open range of a [`ByteSource`].
///
/// `start` is the absolute offset of the first byte the reader yields.  It normally equals the requested start, but a remote source that ignores the requested offset reports where it actually started so callers can detect the mismatch.
///
pub struct SourceStream {
    pub start: u64,
    pub reader: Box<dyn Read + Send>,
}

///
/// A random access provider of bytes.
///
/// Implementations exist for memory buffers ([`MemorySource`]) and local files ([`FileSource`]).  Other backends (HTTP range requests, caller supplied stream factories) only need to implement [`ByteSource::open_range`].
///
pub trait ByteSource: Send + Sync {
    ///
    /// Opens a stream over `range`.
    ///
    /// # Errors
    ///
    /// I/O failures of the backend are reported as [`SourceError::Io`].
    ///
    fn open_range(&self, range: ByteRange) -> Result<SourceStream, SourceError>;

    ///
    /// Releases resources held by the source.  Calling this more than once has no effect.
    ///
    fn close(&self) {}
}

///
/// Opens `[start, end)` and makes sure the stream really starts at `start`, re-issuing the request a few times if the source delivered a different offset.
///
pub(crate) fn open_exact(source: &dyn ByteSource, start: u64, end: Option<u64>) -> Result<Box<dyn Read + Send>, SourceError> {
    let mut actual = start;
    for attempt in 0..MAX_REOPEN_ATTEMPTS {
        let stream = source.open_range(ByteRange { start: Some(start), end })?;
        if stream.start == start {
            return Ok(stream.reader);
        }
        actual = stream.start;
        debug!("Source returned offset {} instead of {} (attempt {}), reopening", actual, start, attempt + 1);
    }
    Err(SourceError::OffsetMismatch { expected: start, actual })
}

///
/// A source over bytes held in memory.
///
#[derive(Clone)]
pub struct MemorySource {
    bytes: Arc<[u8]>,
}

impl MemorySource {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        MemorySource { bytes: bytes.into() }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl ByteSource for MemorySource {
    fn open_range(&self, range: ByteRange) -> Result<SourceStream, SourceError> {
        let len = self.bytes.len() as u64;
        let start = range.start.unwrap_or(0);
        // past the end the stream is empty, like a file read at its end
        let from = start.min(len);
        let end = range.end.unwrap_or(len).clamp(from, len);

        let mut cursor = Cursor::new(self.bytes.clone());
        cursor.set_position(from);
        Ok(SourceStream {
            start,
            reader: Box::new(cursor.take(end - from)),
        })
    }
}

///
/// A source over a local file.  Each range is read through its own file handle.
///
#[derive(Clone, Debug)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        FileSource { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    fn open_range(&self, range: ByteRange) -> Result<SourceStream, SourceError> {
        let mut file = OpenOptions::new().read(true).open(&self.path)?;
        let start = range.start.unwrap_or(0);
        file.seek(SeekFrom::Start(start))?;

        let reader = BufReader::new(file);
        let reader: Box<dyn Read + Send> = match range.end {
            Some(end) => Box::new(reader.take(end.saturating_sub(start))),
            None => Box::new(reader),
        };
        Ok(SourceStream { start, reader })
    }
}

///
/// Content of a leaf element that is not read from the document's own source, typically the file behind an attachment.
///
pub trait DataSource: Send + Sync + fmt::Debug {
    ///
    /// Number of bytes [`DataSource::open`] yields.
    ///
    fn size(&self) -> u64;

    fn open(&self) -> Result<Box<dyn Read + Send>, SourceError>;
}

#[derive(Debug)]
pub struct FileDataSource {
    path: PathBuf,
    size: u64,
}

impl FileDataSource {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let size = std::fs::metadata(&path)?.len();
        Ok(FileDataSource { path, size })
    }
}

impl DataSource for FileDataSource {
    fn size(&self) -> u64 {
        self.size
    }

    fn open(&self) -> Result<Box<dyn Read + Send>, SourceError> {
        let file = File::open(&self.path)?;
        Ok(Box::new(BufReader::new(file).take(self.size)))
    }
}

#[derive(Debug, Clone)]
pub struct BytesDataSource {
    bytes: Arc<[u8]>,
}

impl BytesDataSource {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        BytesDataSource { bytes: bytes.into() }
    }
}

impl DataSource for BytesDataSource {
    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn open(&self) -> Result<Box<dyn Read + Send>, SourceError> {
        Ok(Box::new(Cursor::new(self.bytes.clone())))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn read_all(mut reader: Box<dyn Read + Send>) -> Vec<u8> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).unwrap();
        buf
    }

    #[test]
    fn memory_ranges() {
        let source = MemorySource::new(vec![0u8, 1, 2, 3, 4, 5]);
        let stream = source.open_range(ByteRange::new(2, 4)).unwrap();
        assert_eq!(2, stream.start);
        assert_eq!(vec![2, 3], read_all(stream.reader));

        let stream = source.open_range(ByteRange::from(4)).unwrap();
        assert_eq!(vec![4, 5], read_all(stream.reader));

        // past the end
        let stream = source.open_range(ByteRange::new(10, 12)).unwrap();
        assert_eq!(10, stream.start);
        assert!(read_all(stream.reader).is_empty());
        assert!(read_all(open_exact(&source, 10, None).unwrap()).is_empty());
    }

    #[test]
    fn file_ranges() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abcdefgh").unwrap();
        file.flush().unwrap();

        let source = FileSource::new(file.path());
        let stream = source.open_range(ByteRange::new(3, 6)).unwrap();
        assert_eq!(3, stream.start);
        assert_eq!(b"def".to_vec(), read_all(stream.reader));
        assert_eq!(b"gh".to_vec(), read_all(source.open_range(ByteRange::from(6)).unwrap().reader));

        let data = FileDataSource::new(file.path()).unwrap();
        assert_eq!(8, data.size());
        assert_eq!(b"abcdefgh".to_vec(), read_all(data.open().unwrap()));
    }

    struct Misaligned;

    impl ByteSource for Misaligned {
        fn open_range(&self, _range: ByteRange) -> Result<SourceStream, SourceError> {
            Ok(SourceStream { start: 0, reader: Box::new(Cursor::new(vec![1u8, 2, 3])) })
        }
    }

    #[test]
    fn offset_mismatch_is_detected() {
        assert!(open_exact(&Misaligned, 0, None).is_ok());
        assert!(matches!(open_exact(&Misaligned, 2, None), Err(SourceError::OffsetMismatch { expected: 2, actual: 0 })));
    }
}
