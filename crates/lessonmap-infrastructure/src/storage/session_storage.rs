//! Session cookie file storage.
//!
//! Keeps the `token` cookie issued at sign-in in `session.json` under the
//! config directory, written with mode 600 on Unix.

use super::atomic_file::{StorageError, read_if_present, write_atomically};
use crate::paths::LessonMapPaths;
use chrono::{DateTime, Utc};
use lessonmap_core::auth::SessionCookie;
use std::fs;
use std::path::{Path, PathBuf};

/// Storage for the session cookie.
///
/// Responsibilities:
/// - Persist the cookie with its issue time and attributes
/// - Treat an expired cookie as absent
///
/// Does NOT:
/// - Validate the token with the server
/// - Encrypt anything (plaintext JSON, user-only permissions)
#[derive(Debug, Clone)]
pub struct SessionStorage {
    path: PathBuf,
}

impl SessionStorage {
    pub fn new(paths: &LessonMapPaths) -> Self {
        Self::with_path(paths.session_file())
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the cookie if present and not expired at `now`.
    ///
    /// An expired cookie is deleted, as a browser would drop it.
    pub fn load(&self, now: DateTime<Utc>) -> Result<Option<SessionCookie>, StorageError> {
        let Some(content) = read_if_present(&self.path)? else {
            return Ok(None);
        };

        let cookie: SessionCookie = serde_json::from_str(&content)?;
        if cookie.is_expired(now) {
            tracing::info!(
                "[Session] Session for {} expired at {}",
                cookie.user_name,
                cookie.expires_at()
            );
            self.clear()?;
            return Ok(None);
        }

        Ok(Some(cookie))
    }

    pub fn save(&self, cookie: &SessionCookie) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(cookie)?;
        write_atomically(&self.path, &json)?;
        tracing::debug!("[Session] Saved session cookie to {}", self.path.display());
        Ok(())
    }

    /// Removes the cookie. Missing file is not an error.
    pub fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
