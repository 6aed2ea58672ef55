use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConnectorError, Result};

/// Filesystem area holding one subdirectory per capture session. Concurrent
/// sessions never collide because their ids map to disjoint subdirectories.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for a session, created if absent.
    pub fn session_dir(&self, session_id: &str) -> Result<PathBuf> {
        let dir = self.root.join(session_id);
        if !dir.is_dir() {
            fs::create_dir_all(&dir)
                .map_err(|e| ConnectorError::data(format!("session {session_id}"), e))?;
        }
        Ok(dir)
    }

    /// Write a downloaded artifact into the session directory.
    pub fn write_artifact(&self, session_id: &str, filename: &str, data: &[u8]) -> Result<PathBuf> {
        let dir = self.session_dir(session_id)?;
        let path = dir.join(filename);
        fs::write(&path, data)
            .map_err(|e| ConnectorError::data(format!("session {session_id}/{filename}"), e))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_dir_is_created_once() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());

        let a = store.session_dir("s1").unwrap();
        assert!(a.is_dir());
        let b = store.session_dir("s1").unwrap();
        assert_eq!(a, b);

        let other = store.session_dir("s2").unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn write_artifact_lands_under_session() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());

        let path = store.write_artifact("s1", "meta.json", b"{}").unwrap();
        assert_eq!(path, tmp.path().join("s1").join("meta.json"));
        assert_eq!(std::fs::read(path).unwrap(), b"{}");
    }
}
