//! Local byte sources a sender reads from.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Random-access payload source.
///
/// A transfer reads it one chunk-sized range at a time, so a large file is
/// never held in memory as a whole.
pub trait FileByteSource {
    /// Total length in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads exactly `len` bytes starting at `offset`.
    fn read_range(&self, offset: u64, len: usize) -> io::Result<Vec<u8>>;
}

impl FileByteSource for [u8] {
    fn len(&self) -> u64 {
        <[u8]>::len(self) as u64
    }

    fn read_range(&self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset out of range"))?;
        self.get(start..start.saturating_add(len))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))
    }
}

impl FileByteSource for Vec<u8> {
    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    fn read_range(&self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        self.as_slice().read_range(offset, len)
    }
}

/// A file on disk. The length is captured when the file is opened.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    len: u64,
}

impl FileSource {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        Self::from_file(file)
    }

    pub fn from_file(file: File) -> io::Result<Self> {
        let metadata = file.metadata()?;
        if !metadata.is_file() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "Not a file"));
        }
        Ok(Self {
            len: metadata.len(),
            file,
        })
    }
}

impl FileByteSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_range(&self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_slice_ranges() {
        let data: &[u8] = b"0123456789";
        assert_eq!(FileByteSource::len(data), 10);
        assert_eq!(data.read_range(2, 3).unwrap(), b"234");
        assert_eq!(data.read_range(10, 0).unwrap(), b"");
        assert!(data.read_range(8, 5).is_err());
    }

    #[test]
    fn test_file_source_reads_ranges() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"hello, peer").unwrap();

        let source = FileSource::from_file(file).unwrap();
        assert_eq!(source.len(), 11);
        assert_eq!(source.read_range(7, 4).unwrap(), b"peer");
        assert_eq!(source.read_range(0, 5).unwrap(), b"hello");
        assert!(source.read_range(9, 5).is_err());
    }

    #[test]
    fn test_file_source_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileSource::open(dir.path()).is_err());
    }
}
