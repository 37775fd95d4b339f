//! Persistent subtopic content store.
//!
//! One store directory (`LessonContents`) holding one keyed collection
//! (`subtopicContent.json`):
//!
//! ```json
//! { "subtopic-B-Light reactions": { "content": "...", "timestamp": 1718000000000 } }
//! ```
//!
//! Entries are never purged; staleness is judged on read. A missing or
//! corrupt collection reads as empty.

use super::atomic_file::{FileLock, StorageError, read_if_present, write_atomically};
use async_trait::async_trait;
use lessonmap_core::cache::{CacheEntry, CacheKey, Clock, ContentTier, SystemClock};
use lessonmap_core::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const STORE_NAME: &str = "LessonContents";
pub const COLLECTION_NAME: &str = "subtopicContent";

type Collection = BTreeMap<String, CacheEntry>;

#[derive(Clone)]
pub struct ContentStore {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStore").field("dir", &self.dir).finish()
    }
}

impl ContentStore {
    /// Opens the store rooted at `dir` (the `LessonContents` directory).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_clock(dir, Arc::new(SystemClock))
    }

    pub fn with_clock(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            clock,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn collection_path(&self) -> PathBuf {
        self.dir.join(format!("{COLLECTION_NAME}.json"))
    }

    // ------------------------------------------------------------------
    // Blocking operations
    // ------------------------------------------------------------------

    fn read_collection(&self) -> std::result::Result<Collection, StorageError> {
        let path = self.collection_path();
        let Some(content) = read_if_present(&path)? else {
            return Ok(Collection::new());
        };

        match serde_json::from_str(&content) {
            Ok(collection) => Ok(collection),
            Err(e) => {
                tracing::warn!(
                    "[ContentStore] Ignoring unreadable collection {}: {}",
                    path.display(),
                    e
                );
                Ok(Collection::new())
            }
        }
    }

    fn write_collection(&self, collection: &Collection) -> std::result::Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(collection)?;
        write_atomically(&self.collection_path(), &bytes)
    }

    pub fn read_entry(&self, storage_key: &str) -> std::result::Result<Option<CacheEntry>, StorageError> {
        Ok(self.read_collection()?.remove(storage_key))
    }

    pub fn write_entry(&self, storage_key: &str, entry: CacheEntry) -> std::result::Result<(), StorageError> {
        let _lock = FileLock::acquire(&self.collection_path())?;
        let mut collection = self.read_collection()?;
        collection.insert(storage_key.to_string(), entry);
        self.write_collection(&collection)
    }

    pub fn remove_all(&self) -> std::result::Result<(), StorageError> {
        let _lock = FileLock::acquire(&self.collection_path())?;
        self.write_collection(&Collection::new())
    }

    pub fn count(&self) -> std::result::Result<usize, StorageError> {
        Ok(self.read_collection()?.len())
    }

    // ------------------------------------------------------------------
    // Async wrappers
    // ------------------------------------------------------------------

    async fn blocking<T, F>(&self, f: F) -> std::result::Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(ContentStore) -> std::result::Result<T, StorageError> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(store)).await?
    }

    /// Raw lookup by storage key, stale entries included.
    pub async fn get_entry(&self, storage_key: &str) -> Result<Option<CacheEntry>> {
        let key = storage_key.to_string();
        Ok(self.blocking(move |store| store.read_entry(&key)).await?)
    }

    pub async fn put_entry(&self, storage_key: &str, entry: CacheEntry) -> Result<()> {
        let key = storage_key.to_string();
        Ok(self.blocking(move |store| store.write_entry(&key, entry)).await?)
    }

    pub async fn clear_all(&self) -> Result<()> {
        Ok(self.blocking(|store| store.remove_all()).await?)
    }

    pub async fn len(&self) -> Result<usize> {
        Ok(self.blocking(|store| store.count()).await?)
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

#[async_trait]
impl ContentTier for ContentStore {
    fn name(&self) -> &'static str {
        "persistent"
    }

    /// Hit only for a non-empty entry younger than 24 hours.
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let now = self.clock.now_ms();
        let entry = self.get_entry(&key.storage_key()).await?;

        Ok(entry.filter(|entry| {
            let usable = !entry.content.is_empty() && entry.is_fresh(now);
            if !usable {
                tracing::debug!("[ContentStore] Stale or empty entry for {}", key.storage_key());
            }
            usable
        }))
    }

    async fn put(&self, key: &CacheKey, entry: CacheEntry) -> Result<()> {
        self.put_entry(&key.storage_key(), entry).await
    }

    async fn clear(&self) -> Result<()> {
        self.clear_all().await
    }
}
