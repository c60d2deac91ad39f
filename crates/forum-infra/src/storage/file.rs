use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use forum_core::ports::{LocalStorage, StorageError};

use super::validate_key;

/// One file per key under a data directory.
#[derive(Debug, Clone)]
pub struct FileLocalStorage {
    dir: PathBuf,
}

impl FileLocalStorage {
    /// The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl LocalStorage for FileLocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;

        // Write-then-rename: readers never observe a partial record.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;

        tracing::debug!(key = %key, path = %path.display(), "Stored item");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TempDir(PathBuf);

    impl TempDir {
        fn new() -> Self {
            let dir = std::env::temp_dir().join(format!("forum-storage-{}", uuid::Uuid::new_v4()));
            Self(dir)
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    #[test]
    fn missing_key_reads_as_none() {
        let tmp = TempDir::new();
        let storage = FileLocalStorage::new(&tmp.0);
        assert_eq!(storage.get_item("uiSettings").unwrap(), None);
    }

    #[test]
    fn set_get_remove() {
        let tmp = TempDir::new();
        let storage = FileLocalStorage::new(&tmp.0);

        storage.set_item("uiSettings", r#"{"theme":"light"}"#).unwrap();
        assert_eq!(
            storage.get_item("uiSettings").unwrap().as_deref(),
            Some(r#"{"theme":"light"}"#)
        );
        assert!(tmp.0.join("uiSettings.json").exists());

        storage.remove_item("uiSettings").unwrap();
        assert_eq!(storage.get_item("uiSettings").unwrap(), None);
        storage.remove_item("uiSettings").unwrap();
    }

    #[test]
    fn rejects_path_like_keys() {
        let tmp = TempDir::new();
        let storage = FileLocalStorage::new(&tmp.0);
        assert!(matches!(
            storage.set_item("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(storage.get_item("").is_err());
    }
}
