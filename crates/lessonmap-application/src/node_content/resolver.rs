use super::memory_tier::MemoryTier;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use lessonmap_core::api::{LessonApi, Notification, Notifier};
use lessonmap_core::cache::{CacheEntry, CacheKey, Clock, ContentTier, SystemClock};
use lessonmap_core::diagram::NodeRef;
use lessonmap_core::lesson::{Grade, Model, SubtopicRequest};
use lessonmap_core::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Returned instead of content when the fetch fails.
pub const CONTENT_PLACEHOLDER: &str = "Failed to load content. Please try again.";
pub const FETCH_SUCCESS_MESSAGE: &str = "Subtopic content fetched successfully!";
pub const FETCH_FAILURE_MESSAGE: &str = "Failed to fetch subtopic content. Please try again.";

type InFlightFetch = Shared<BoxFuture<'static, std::result::Result<String, String>>>;

/// Read-through, write-through content lookup for clicked diagram nodes.
///
/// Lookup order is memory tier, persistent tier, then `POST /subtopic`.
/// A persistent hit is copied into memory. A fetched result is written to
/// both tiers stamped with the clock's current time. A failed fetch writes
/// nothing, so the next click goes back to the network.
///
/// Concurrent resolves of the same label share one outstanding request.
/// Persistent-tier errors are logged and treated as a miss.
pub struct NodeContentCache {
    memory: Arc<dyn ContentTier>,
    persistent: Option<Arc<dyn ContentTier>>,
    api: Arc<dyn LessonApi>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    in_flight: Mutex<HashMap<String, InFlightFetch>>,
}

impl NodeContentCache {
    /// Memory-only cache on the system clock.
    pub fn new(api: Arc<dyn LessonApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            memory: Arc::new(MemoryTier::new()),
            persistent: None,
            api,
            notifier,
            clock: Arc::new(SystemClock),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_persistent(mut self, tier: Arc<dyn ContentTier>) -> Self {
        self.persistent = Some(tier);
        self
    }

    pub fn with_memory(mut self, tier: Arc<dyn ContentTier>) -> Self {
        self.memory = tier;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Content for `node` of `lesson_name`, or [`CONTENT_PLACEHOLDER`].
    ///
    /// `model` falls back to `gpt-4o-mini` and `grade` to `12` when absent
    /// or blank.
    pub async fn resolve(
        &self,
        lesson_name: &str,
        node: &NodeRef,
        model: Option<&str>,
        grade: Option<&str>,
    ) -> String {
        let key = CacheKey::new(&node.id, &node.label);

        if let Some(entry) = self.lookup(self.memory.as_ref(), &key).await {
            tracing::debug!("[NodeContent] Memory hit for '{}'", key.label);
            return entry.content;
        }

        if let Some(persistent) = &self.persistent {
            if let Some(entry) = self.lookup(persistent.as_ref(), &key).await {
                tracing::debug!("[NodeContent] {} hit for '{}'", persistent.name(), key.storage_key());
                self.store(self.memory.as_ref(), &key, entry.clone()).await;
                return entry.content;
            }
        }

        let request = SubtopicRequest {
            lesson_name: lesson_name.to_string(),
            subtopic_name: node.label.clone(),
            model: Model::or_subtopic_fallback(model),
            grade: Grade::or_default(grade),
        };

        match self.fetch(&key, request).await {
            Ok(content) => content,
            Err(_) => CONTENT_PLACEHOLDER.to_string(),
        }
    }

    /// Empties both tiers.
    pub async fn clear(&self) -> Result<()> {
        self.memory.clear().await?;
        if let Some(persistent) = &self.persistent {
            persistent.clear().await?;
        }
        tracing::info!("[NodeContent] Cleared cached content");
        Ok(())
    }

    /// Number of fetches currently outstanding.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().map(|map| map.len()).unwrap_or(0)
    }

    async fn lookup(&self, tier: &dyn ContentTier, key: &CacheKey) -> Option<CacheEntry> {
        match tier.get(key).await {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(
                    "[NodeContent] {} tier unavailable, treating as miss: {}",
                    tier.name(),
                    err
                );
                None
            }
        }
    }

    async fn store(&self, tier: &dyn ContentTier, key: &CacheKey, entry: CacheEntry) {
        if let Err(err) = tier.put(key, entry).await {
            tracing::warn!(
                "[NodeContent] Could not write '{}' to {} tier: {}",
                key.label,
                tier.name(),
                err
            );
        }
    }

    /// Fetches through the in-flight table.
    ///
    /// The waiter that removes the shared fetch from the table once it has
    /// resolved is the one that writes the tiers and notifies. Everyone else
    /// only gets the result.
    async fn fetch(
        &self,
        key: &CacheKey,
        request: SubtopicRequest,
    ) -> std::result::Result<String, String> {
        let label = key.memory_key().to_string();

        let shared = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(existing) = in_flight.get(&label) {
                tracing::debug!("[NodeContent] Joining in-flight fetch for '{}'", label);
                existing.clone()
            } else {
                tracing::info!(
                    "[NodeContent] Fetching '{}' for lesson '{}' ({}, grade {})",
                    request.subtopic_name,
                    request.lesson_name,
                    request.model,
                    request.grade
                );
                let api = self.api.clone();
                let fetch = async move {
                    api.fetch_subtopic(&request)
                        .await
                        .map(|response| response.subtopic_content)
                        .map_err(|err| err.to_string())
                }
                .boxed()
                .shared();
                in_flight.insert(label.clone(), fetch.clone());
                fetch
            }
        };

        let result = shared.clone().await;

        let owner = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            match in_flight.get(&label) {
                Some(current) if current.ptr_eq(&shared) => {
                    in_flight.remove(&label);
                    true
                }
                _ => false,
            }
        };

        if owner {
            match &result {
                Ok(content) => {
                    let entry = CacheEntry::new(content.clone(), self.clock.now_ms());
                    self.store(self.memory.as_ref(), key, entry.clone()).await;
                    if let Some(persistent) = &self.persistent {
                        self.store(persistent.as_ref(), key, entry).await;
                    }
                    self.notifier.notify(Notification::success(FETCH_SUCCESS_MESSAGE));
                }
                Err(err) => {
                    tracing::error!("[NodeContent] Fetch for '{}' failed: {}", label, err);
                    self.notifier.notify(Notification::error(FETCH_FAILURE_MESSAGE));
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingTier, MockLessonApi, RecordingNotifier};
    use lessonmap_core::api::NotificationLevel;
    use lessonmap_core::cache::{CACHE_TTL, ManualClock};
    use lessonmap_infrastructure::ContentStore;
    use std::time::Duration;
    use tempfile::TempDir;

    const T0: i64 = 1_750_000_000_000;

    fn node(id: &str, label: &str) -> NodeRef {
        NodeRef {
            id: id.to_string(),
            label: label.to_string(),
        }
    }

    struct Fixture {
        _temp_dir: TempDir,
        api: Arc<MockLessonApi>,
        notifier: Arc<RecordingNotifier>,
        clock: Arc<ManualClock>,
        store: ContentStore,
    }

    impl Fixture {
        fn new(api: MockLessonApi) -> Self {
            let temp_dir = TempDir::new().unwrap();
            let clock = Arc::new(ManualClock::new(T0));
            let store = ContentStore::with_clock(temp_dir.path().join("LessonContents"), clock.clone());
            Self {
                _temp_dir: temp_dir,
                api: Arc::new(api),
                notifier: Arc::new(RecordingNotifier::default()),
                clock,
                store,
            }
        }

        /// A fresh resolver over the same store, as after a restart.
        fn cache(&self) -> NodeContentCache {
            NodeContentCache::new(self.api.clone(), self.notifier.clone())
                .with_persistent(Arc::new(self.store.clone()))
                .with_clock(self.clock.clone())
        }
    }

    #[tokio::test]
    async fn test_warm_cache_serves_without_second_fetch() {
        let fixture = Fixture::new(MockLessonApi::new().with_subtopic("Light", "Photons"));
        let cache = fixture.cache();
        let light = node("A", "Light");

        let first = cache.resolve("Photosynthesis", &light, None, None).await;
        let second = cache.resolve("Photosynthesis", &light, None, None).await;

        assert_eq!(first, "Photons");
        assert_eq!(second, "Photons");
        assert_eq!(fixture.api.subtopic_calls(), 1);
        assert_eq!(
            fixture.notifier.messages(),
            vec![(NotificationLevel::Success, FETCH_SUCCESS_MESSAGE.to_string())]
        );
    }

    #[tokio::test]
    async fn test_fetch_applies_fallbacks_and_writes_both_tiers() {
        let fixture = Fixture::new(MockLessonApi::new());
        let cache = fixture.cache();

        cache
            .resolve("Photosynthesis", &node("B", "Glucose"), Some(" "), None)
            .await;

        let requests = fixture.api.subtopic_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].lesson_name, "Photosynthesis");
        assert_eq!(requests[0].subtopic_name, "Glucose");
        assert_eq!(requests[0].model, "gpt-4o-mini");
        assert_eq!(requests[0].grade, "12");

        let stored = fixture.store.get_entry("subtopic-B-Glucose").await.unwrap().unwrap();
        assert_eq!(stored.content, "About Glucose");
        assert_eq!(stored.timestamp_ms, T0);
    }

    #[tokio::test]
    async fn test_persistent_entry_survives_restart_until_ttl() {
        let fixture = Fixture::new(MockLessonApi::new());
        let light = node("A", "Light");

        fixture.cache().resolve("Photosynthesis", &light, None, None).await;
        assert_eq!(fixture.api.subtopic_calls(), 1);

        // just inside the window: served from the store
        fixture.clock.set(T0 + CACHE_TTL.as_millis() as i64 - 1);
        let content = fixture.cache().resolve("Photosynthesis", &light, None, None).await;
        assert_eq!(content, "About Light");
        assert_eq!(fixture.api.subtopic_calls(), 1);

        // exactly 24h later: stale, back to the network
        fixture.clock.set(T0);
        fixture.clock.advance(CACHE_TTL);
        fixture.cache().resolve("Photosynthesis", &light, None, None).await;
        assert_eq!(fixture.api.subtopic_calls(), 2);
    }

    #[tokio::test]
    async fn test_persistent_hit_backfills_memory() {
        let fixture = Fixture::new(MockLessonApi::new());
        fixture
            .store
            .put_entry("subtopic-A-Light", CacheEntry::new("Stored photons", T0))
            .await
            .unwrap();

        let memory = Arc::new(MemoryTier::new());
        let cache = fixture.cache().with_memory(memory.clone());
        let light = node("A", "Light");

        assert_eq!(cache.resolve("Photosynthesis", &light, None, None).await, "Stored photons");
        assert!(memory.contains("Light").await);

        // memory entries are not checked for freshness
        fixture.clock.advance(CACHE_TTL * 2);
        assert_eq!(cache.resolve("Photosynthesis", &light, None, None).await, "Stored photons");
        assert_eq!(fixture.api.subtopic_calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_fetch_caches_nothing_and_retries() {
        let fixture = Fixture::new(MockLessonApi::new().with_subtopic_failure());
        let cache = fixture.cache();
        let light = node("A", "Light");

        let content = cache.resolve("Photosynthesis", &light, None, None).await;
        assert_eq!(content, CONTENT_PLACEHOLDER);
        assert!(fixture.store.is_empty().await.unwrap());
        assert_eq!(
            fixture.notifier.messages(),
            vec![(NotificationLevel::Error, FETCH_FAILURE_MESSAGE.to_string())]
        );

        fixture.api.set_subtopic_failure(false);
        let content = cache.resolve("Photosynthesis", &light, None, None).await;
        assert_eq!(content, "About Light");
        assert_eq!(fixture.api.subtopic_calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_resolves_share_one_fetch() {
        let fixture = Fixture::new(
            MockLessonApi::new().with_subtopic_delay(Duration::from_millis(50)),
        );
        let cache = fixture.cache();
        let light = node("A", "Light");

        let (first, second) = tokio::join!(
            cache.resolve("Photosynthesis", &light, None, None),
            cache.resolve("Photosynthesis", &light, None, None),
        );

        assert_eq!(first, "About Light");
        assert_eq!(second, "About Light");
        assert_eq!(fixture.api.subtopic_calls(), 1);
        assert_eq!(cache.in_flight_count(), 0);
        // only the owning waiter notifies
        assert_eq!(fixture.notifier.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_different_labels_fetch_independently() {
        let fixture = Fixture::new(
            MockLessonApi::new().with_subtopic_delay(Duration::from_millis(10)),
        );
        let cache = fixture.cache();
        let light_node = node("A", "Light");
        let water_node = node("B", "Water");

        let (light, water) = tokio::join!(
            cache.resolve("Photosynthesis", &light_node, None, None),
            cache.resolve("Photosynthesis", &water_node, None, None),
        );

        assert_eq!(light, "About Light");
        assert_eq!(water, "About Water");
        assert_eq!(fixture.api.subtopic_calls(), 2);
    }

    #[tokio::test]
    async fn test_broken_storage_falls_back_to_network() {
        let api = Arc::new(MockLessonApi::new());
        let cache = NodeContentCache::new(api.clone(), Arc::new(RecordingNotifier::default()))
            .with_persistent(Arc::new(FailingTier));
        let light = node("A", "Light");

        assert_eq!(cache.resolve("Photosynthesis", &light, None, None).await, "About Light");
        // the memory tier still works
        assert_eq!(cache.resolve("Photosynthesis", &light, None, None).await, "About Light");
        assert_eq!(api.subtopic_calls(), 1);
    }

    #[tokio::test]
    async fn test_clear_empties_both_tiers() {
        let fixture = Fixture::new(MockLessonApi::new());
        let cache = fixture.cache();
        let light = node("A", "Light");

        cache.resolve("Photosynthesis", &light, None, None).await;
        cache.clear().await.unwrap();
        assert!(fixture.store.is_empty().await.unwrap());

        cache.resolve("Photosynthesis", &light, None, None).await;
        assert_eq!(fixture.api.subtopic_calls(), 2);
    }
}
