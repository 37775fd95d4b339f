use async_trait::async_trait;
use lessonmap_core::cache::{CacheEntry, CacheKey, ContentTier};
use lessonmap_core::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-lifetime content cache keyed by node label.
///
/// Entries are served without a freshness check: anything in here was
/// fetched or validated during this run.
#[derive(Clone, Default)]
pub struct MemoryTier {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl MemoryTier {
    /// Creates a new empty MemoryTier.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Whether content is held for `label`.
    pub async fn contains(&self, label: &str) -> bool {
        self.entries.read().await.contains_key(label)
    }
}

#[async_trait]
impl ContentTier for MemoryTier {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key.memory_key()).cloned())
    }

    async fn put(&self, key: &CacheKey, entry: CacheEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.memory_key().to_string(), entry);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.clear();
        Ok(())
    }
}
