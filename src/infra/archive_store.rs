use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::app::ports::ArchiveSourcePort;

/// Reads archives from a local directory, object key = relative path
pub struct FilesystemArchiveStore {
    root_dir: PathBuf,
}

impl FilesystemArchiveStore {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn resolve(&self, object_key: &str) -> Result<PathBuf> {
        let key = Path::new(object_key);
        if object_key.trim().is_empty()
            || !key
                .components()
                .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
        {
            bail!("invalid object key {:?}", object_key);
        }
        Ok(self.root_dir.join(key))
    }
}

impl ArchiveSourcePort for FilesystemArchiveStore {
    fn fetch(&self, object_key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(object_key)?;
        debug!("reading archive {}", path.display());
        fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_reads_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("2018")).unwrap();
        fs::write(dir.path().join("2018/archive.zip"), b"bytes").unwrap();

        let store = FilesystemArchiveStore::new(dir.path());
        assert_eq!(store.fetch("2018/archive.zip").unwrap(), b"bytes");
        assert!(store.fetch("2018/missing.zip").is_err());
    }

    #[test]
    fn test_keys_cannot_escape_root() {
        let store = FilesystemArchiveStore::new("/data");
        assert!(store.resolve("../etc/passwd").is_err());
        assert!(store.resolve("/etc/passwd").is_err());
        assert!(store.resolve("").is_err());
        assert_eq!(store.resolve("a/b.zip").unwrap(), PathBuf::from("/data/a/b.zip"));
    }
}
