//! Typed TOML file with locked, atomic updates.

use super::atomic_file::{FileLock, StorageError, read_if_present, write_atomically};
use serde::{Serialize, de::DeserializeOwned};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// A handle to a TOML file holding one `T`.
///
/// Saves go through a temp file, fsync and rename; [`update`](Self::update)
/// additionally holds an exclusive lock across load-modify-save.
pub struct AtomicTomlFile<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> AtomicTomlFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when the file is missing or blank.
    pub fn load(&self) -> Result<Option<T>, StorageError> {
        match read_if_present(&self.path)? {
            Some(content) => Ok(Some(toml::from_str(&content)?)),
            None => Ok(None),
        }
    }

    pub fn save(&self, data: &T) -> Result<(), StorageError> {
        let toml_string = toml::to_string_pretty(data)?;
        write_atomically(&self.path, toml_string.as_bytes())
    }

    /// Loads (or starts from `default_value`), applies `f`, saves, and
    /// returns the saved value.
    pub fn update<F>(&self, default_value: T, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut T) -> Result<(), StorageError>,
    {
        let _lock = FileLock::acquire(&self.path)?;

        let mut data = self.load()?.unwrap_or(default_value);
        f(&mut data)?;
        self.save(&data)?;

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Settings {
        url: String,
        retries: u32,
    }

    fn defaults() -> Settings {
        Settings {
            url: "http://localhost".to_string(),
            retries: 0,
        }
    }

    #[test]
    fn test_load_missing_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::<Settings>::new(temp_dir.path().join("missing.toml"));
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_update_starts_from_default_then_accumulates() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::<Settings>::new(temp_dir.path().join("cfg").join("s.toml"));

        let saved = file
            .update(defaults(), |s| {
                s.retries += 2;
                Ok(())
            })
            .unwrap();
        assert_eq!(saved.retries, 2);

        file.update(defaults(), |s| {
            s.retries += 3;
            Ok(())
        })
        .unwrap();

        let loaded = file.load().unwrap().unwrap();
        assert_eq!(loaded.retries, 5);
        assert_eq!(loaded.url, "http://localhost");
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        std::fs::write(&path, "url = ").unwrap();

        let file = AtomicTomlFile::<Settings>::new(path);
        assert!(matches!(file.load(), Err(StorageError::TomlError(_))));
    }
}
