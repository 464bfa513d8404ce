//! Destinations for fully reassembled payloads.

use crate::error::{PeerError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Receives the payload of a completed transfer. Aborted transfers never reach it.
pub trait CompletedTransferSink {
    /// Stores `bytes`; returns where they ended up.
    fn persist(&mut self, bytes: &[u8], suggested_name: &str) -> Result<PathBuf>;
}

/// Writes each payload into a directory.
///
/// The bytes go to a temporary file in the target directory which is then
/// renamed over the destination, so a reader never sees a partial file.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Keeps only the final path component of a peer-suggested name.
    fn target_path(&self, suggested_name: &str) -> Result<PathBuf> {
        let name = Path::new(suggested_name)
            .file_name()
            .ok_or_else(|| PeerError::Config(format!("unusable file name {:?}", suggested_name)))?;
        Ok(self.dir.join(name))
    }
}

impl CompletedTransferSink for DirectorySink {
    fn persist(&mut self, bytes: &[u8], suggested_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let target = self.target_path(suggested_name)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| PeerError::Io(e.error))?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persist_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path().join("received"));

        let path = sink.persist(b"payload", "received-file.bin").unwrap();
        assert_eq!(path, dir.path().join("received").join("received-file.bin"));
        assert_eq!(fs::read(&path).unwrap(), b"payload");
    }

    #[test]
    fn test_persist_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path());

        sink.persist(b"first version", "video.mp4").unwrap();
        let path = sink.persist(b"second", "video.mp4").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");

        let entries = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_suggested_name_cannot_escape_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path().join("inbox"));

        let path = sink.persist(b"x", "../../etc/passwd").unwrap();
        assert_eq!(path, dir.path().join("inbox").join("passwd"));
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path());
        assert!(sink.persist(b"x", "..").is_err());
    }
}
