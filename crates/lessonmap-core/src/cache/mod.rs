//! Subtopic content cache domain.
//!
//! Content for a clicked node is looked up in two tiers before the network:
//! a process-lifetime memory tier keyed by label, then a persistent tier keyed
//! by `subtopic-{id}-{label}` whose entries expire after [`CACHE_TTL`].
//! This module holds the shared key/entry types and the [`ContentTier`] seam;
//! the tiers themselves live in the application and infrastructure crates.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Freshness window of persisted content.
pub const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Identifies cached content for a diagram node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub node_id: String,
    pub label: String,
}

impl CacheKey {
    pub fn new(node_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            label: label.into(),
        }
    }

    /// Key of the memory tier. Only the label is used, so the same label under
    /// a different node id shares an entry.
    pub fn memory_key(&self) -> &str {
        &self.label
    }

    /// Key of the persistent tier.
    pub fn storage_key(&self) -> String {
        format!("subtopic-{}-{}", self.node_id, self.label)
    }
}

/// Content plus the epoch-millisecond time it was fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub content: String,
    #[serde(rename = "timestamp")]
    pub timestamp_ms: i64,
}

impl CacheEntry {
    pub fn new(content: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            content: content.into(),
            timestamp_ms,
        }
    }

    /// True while `now_ms - timestamp_ms < 24h`.
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        now_ms - self.timestamp_ms < CACHE_TTL.as_millis() as i64
    }
}

/// One tier of the node-content cache.
///
/// Implementations decide their own keying from [`CacheKey`] and whether
/// [`CacheEntry::is_fresh`] applies; callers only see hits and misses.
#[async_trait]
pub trait ContentTier: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// Returns a usable entry, or `None` on a miss.
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    async fn put(&self, key: &CacheKey, entry: CacheEntry) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Source of "now" in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms
            .fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
