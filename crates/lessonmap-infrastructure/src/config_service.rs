//! Configuration service.
//!
//! Loads [`ClientConfig`] from `config.toml` and layers environment and
//! command-line overrides on top.

use crate::paths::LessonMapPaths;
use crate::storage::AtomicTomlFile;
use lessonmap_core::config::{ClientConfig, ConfigOverrides};
use lessonmap_core::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Loads and caches the client configuration file.
#[derive(Clone)]
pub struct ConfigService {
    file: Arc<AtomicTomlFile<ClientConfig>>,
    cached: Arc<RwLock<Option<ClientConfig>>>,
}

impl ConfigService {
    pub fn new(paths: &LessonMapPaths) -> Self {
        Self::with_path(paths.config_file())
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self {
            file: Arc::new(AtomicTomlFile::new(path)),
            cached: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// The file configuration, or defaults when there is no file.
    ///
    /// A file that fails to parse is an error rather than silently replaced.
    pub fn file_config(&self) -> Result<ClientConfig> {
        if let Ok(guard) = self.cached.read() {
            if let Some(cached) = guard.as_ref() {
                return Ok(cached.clone());
            }
        }

        let loaded = self.file.load()?.unwrap_or_default();
        if let Ok(mut guard) = self.cached.write() {
            *guard = Some(loaded.clone());
        }
        Ok(loaded)
    }

    /// File configuration with `overrides` applied on top.
    pub fn resolve(&self, overrides: ConfigOverrides) -> Result<ClientConfig> {
        let config = self.file_config()?;
        Ok(config.with_overrides(overrides))
    }

    /// Sets one key in the file and returns the updated configuration.
    pub fn set(&self, key: &str, value: &str) -> Result<ClientConfig> {
        let mut outcome = Ok(());
        let updated = self.file.update(ClientConfig::default(), |config| {
            outcome = config.set(key, value);
            Ok(())
        })?;
        outcome?;

        tracing::info!("[Config] Set {} in {}", key, self.path().display());
        self.invalidate_cache();
        Ok(updated)
    }

    pub fn invalidate_cache(&self) {
        if let Ok(mut guard) = self.cached.write() {
            *guard = None;
        }
    }
}
