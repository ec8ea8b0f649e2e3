use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

/// Cache gate in front of every expensive external operation. Identity is
/// the canonical artifact name only; a present file is trusted without any
/// content validation.
pub trait ArtifactStore {
    fn path(&self, id: &str) -> PathBuf;
    fn exists(&self, id: &str) -> bool;
    fn remove(&self, id: &str) -> Result<()>;
}

/// Artifact store backed by a single flat directory, normally the directory
/// containing the source video.
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactStore for DirectoryStore {
    fn path(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    fn exists(&self, id: &str) -> bool {
        self.path(id).is_file()
    }

    fn remove(&self, id: &str) -> Result<()> {
        match fs::remove_file(self.path(id)) {
            Ok(()) => {
                debug!(artifact = id, "removed artifact");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existence_tracks_files_in_root() {
        let directory = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(directory.path());

        assert!(!store.exists("clip_000.yuv"));

        fs::write(directory.path().join("clip_000.yuv"), b"frames").unwrap();
        assert!(store.exists("clip_000.yuv"));
    }

    #[test]
    fn remove_deletes_present_artifacts() {
        let directory = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(directory.path());

        fs::write(directory.path().join("clip_000.yuv"), b"frames").unwrap();
        store.remove("clip_000.yuv").unwrap();
        assert!(!store.exists("clip_000.yuv"));
    }

    #[test]
    fn remove_is_a_no_op_for_absent_artifacts() {
        let directory = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(directory.path());

        store.remove("clip_000.yuv").unwrap();
    }

    #[test]
    fn directories_are_not_artifacts() {
        let directory = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(directory.path());

        fs::create_dir(directory.path().join("clip_000.yuv")).unwrap();
        assert!(!store.exists("clip_000.yuv"));
    }
}
