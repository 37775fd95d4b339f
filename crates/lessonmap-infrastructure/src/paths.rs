//! Path management for LessonMap's on-disk state.
//!
//! Everything lives under two per-profile directories resolved with `dirs`:
//!
//! ```text
//! ~/.config/lessonmap/          # Config directory
//! ├── config.toml               # ClientConfig
//! └── session.json              # Session cookie (mode 600)
//!
//! ~/.local/share/lessonmap/     # Data directory
//! └── LessonContents/           # Persistent content store
//!     └── subtopicContent.json
//! ```

use crate::storage::content_store::STORE_NAME;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "lessonmap";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for lessonmap_core::LessonMapError {
    fn from(e: PathError) -> Self {
        lessonmap_core::LessonMapError::config(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonMapPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl LessonMapPaths {
    /// Resolves the platform config and data directories.
    pub fn resolve() -> Result<Self, PathError> {
        let config_dir = dirs::config_dir().ok_or(PathError::HomeDirNotFound)?;
        let data_dir = dirs::data_dir().ok_or(PathError::HomeDirNotFound)?;
        Ok(Self {
            config_dir: config_dir.join(APP_DIR),
            data_dir: data_dir.join(APP_DIR),
        })
    }

    /// Uses explicit directories, e.g. a temp dir in tests.
    pub fn with_dirs(config_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            data_dir: data_dir.into(),
        }
    }

    /// Both directories under one root.
    pub fn rooted_at(root: &Path) -> Self {
        Self::with_dirs(root.join("config"), root.join("data"))
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn session_file(&self) -> PathBuf {
        self.config_dir.join("session.json")
    }

    pub fn content_store_dir(&self) -> PathBuf {
        self.data_dir.join(STORE_NAME)
    }
}
