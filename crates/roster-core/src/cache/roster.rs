//! Infinite-scroll page cache over the users listing.
//!
//! A *walk* starts at page 1 and fetches one page at a time until the
//! server's last page is reached or the cache is invalidated. Only one
//! fetch is ever in flight. Every walk carries a generation number; a fetch
//! that completes after its walk was invalidated is dropped on the floor.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::api::{ApiError, PagedFetcher};
use crate::models::{Page, User};

use super::SnapshotStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No pages fetched
    Empty,
    /// A fetch is in flight
    Loading,
    /// At least one page present, more to come
    Ready,
    /// The last page has been fetched
    Exhausted,
}

/// What a call to `request_next_page` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Page fetched from the network and appended
    Fetched(u32),
    /// Page one served from the persisted snapshot
    Restored,
    /// Nothing to do: a fetch is already in flight, or the walk is done
    Skipped(CacheState),
    /// The walk was invalidated while this fetch was in flight
    Discarded,
}

/// What `invalidate` does with the persisted page one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidationPolicy {
    /// Drop the persisted entry too, so the next walk starts from the network
    #[default]
    ClearPersisted,
    /// Leave it; the next walk may start from a page one older than the
    /// mutation that triggered the invalidation
    KeepPersisted,
}

struct Walk {
    pages: Vec<Page>,
    state: CacheState,
    generation: u64,
}

impl Walk {
    fn next_page_number(&self) -> u32 {
        self.pages.last().map(|p| p.page + 1).unwrap_or(1)
    }

    fn settled_state(&self) -> CacheState {
        match self.pages.last() {
            None => CacheState::Empty,
            Some(last) if last.is_last() => CacheState::Exhausted,
            Some(_) => CacheState::Ready,
        }
    }
}

pub struct RosterCache {
    fetcher: Arc<dyn PagedFetcher>,
    store: Arc<dyn SnapshotStore>,
    policy: InvalidationPolicy,
    walk: Mutex<Walk>,
}

impl RosterCache {
    pub fn new(fetcher: Arc<dyn PagedFetcher>, store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            fetcher,
            store,
            policy: InvalidationPolicy::default(),
            walk: Mutex::new(Walk {
                pages: Vec::new(),
                state: CacheState::Empty,
                generation: 0,
            }),
        }
    }

    pub fn with_policy(mut self, policy: InvalidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> InvalidationPolicy {
        self.policy
    }

    /// Fetch the next page of the current walk.
    ///
    /// No-op while a fetch is in flight or once the last page is in. On
    /// failure the snapshot is untouched and the state goes back to what it
    /// was before the call.
    pub async fn request_next_page(&self) -> Result<FetchOutcome, ApiError> {
        let (next, generation) = {
            let mut walk = self.walk.lock();
            match walk.state {
                CacheState::Loading | CacheState::Exhausted => {
                    debug!(state = ?walk.state, "Skipping page request");
                    return Ok(FetchOutcome::Skipped(walk.state));
                }
                CacheState::Empty | CacheState::Ready => {}
            }
            walk.state = CacheState::Loading;
            (walk.next_page_number(), walk.generation)
        };

        if next == 1 {
            if let Some(outcome) = self.restore_first_page(generation) {
                return Ok(outcome);
            }
        }

        debug!(page = next, generation, "Fetching roster page");
        let result = self.fetcher.fetch_page(next).await;

        let mut walk = self.walk.lock();
        if walk.generation != generation {
            debug!(page = next, generation, "Discarding page from invalidated walk");
            return Ok(FetchOutcome::Discarded);
        }

        let page = match result {
            Ok(page) if page.page == next => page,
            Ok(page) => {
                walk.state = walk.settled_state();
                return Err(ApiError::InvalidResponse(format!(
                    "requested page {} but received page {}",
                    next, page.page
                )));
            }
            Err(e) => {
                warn!(page = next, error = %e, "Roster page fetch failed");
                walk.state = walk.settled_state();
                return Err(e);
            }
        };

        if let Some(first) = walk.pages.first() {
            if first.total_pages != page.total_pages {
                warn!(
                    expected = first.total_pages,
                    got = page.total_pages,
                    "total_pages changed mid-walk"
                );
            }
        }

        if next == 1 {
            if let Err(e) = self.store.save(&page) {
                warn!(error = %e, "Failed to persist first roster page");
            }
        }

        walk.pages.push(page);
        walk.state = walk.settled_state();
        debug!(page = next, state = ?walk.state, "Roster page appended");
        Ok(FetchOutcome::Fetched(next))
    }

    /// Serve page one from the persisted snapshot, if there is a usable one.
    fn restore_first_page(&self, generation: u64) -> Option<FetchOutcome> {
        let page = self.store.load()?;
        if page.page != 1 {
            debug!(page = page.page, "Persisted snapshot is not page 1, ignoring");
            return None;
        }

        let mut walk = self.walk.lock();
        if walk.generation != generation {
            return Some(FetchOutcome::Discarded);
        }
        debug!(users = page.data.len(), "Restored first roster page from snapshot");
        walk.pages.push(page);
        walk.state = walk.settled_state();
        Some(FetchOutcome::Restored)
    }

    /// Discard the whole snapshot and start a new walk.
    pub fn invalidate(&self) {
        let mut walk = self.walk.lock();
        walk.pages.clear();
        walk.state = CacheState::Empty;
        walk.generation += 1;

        if self.policy == InvalidationPolicy::ClearPersisted {
            if let Err(e) = self.store.clear() {
                warn!(error = %e, "Failed to clear persisted roster snapshot");
            }
        }
        info!(generation = walk.generation, "Roster cache invalidated");
    }

    /// All users fetched so far, in fetch order.
    pub fn flattened_records(&self) -> Vec<User> {
        let walk = self.walk.lock();
        walk.pages.iter().flat_map(|p| p.data.iter().cloned()).collect()
    }

    pub fn state(&self) -> CacheState {
        self.walk.lock().state
    }

    pub fn has_next_page(&self) -> bool {
        matches!(self.state(), CacheState::Empty | CacheState::Ready)
    }

    pub fn page_count(&self) -> usize {
        self.walk.lock().pages.len()
    }

    /// Total pages reported by the server for the current walk.
    pub fn total_pages(&self) -> Option<u32> {
        self.walk.lock().pages.first().map(|p| p.total_pages)
    }

    pub fn generation(&self) -> u64 {
        self.walk.lock().generation
    }

    /// Look a user up among the pages fetched so far.
    pub fn find(&self, id: i64) -> Option<User> {
        let walk = self.walk.lock();
        walk.pages
            .iter()
            .flat_map(|p| p.data.iter())
            .find(|u| u.id == id)
            .cloned()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemorySnapshotStore, PersistenceError};
    use crate::testing::{user, FakeFetcher};
    use std::sync::{OnceLock, Weak};
    use tokio::sync::Notify;

    fn ids(users: &[User]) -> Vec<i64> {
        users.iter().map(|u| u.id).collect()
    }

    fn cache_with(fetcher: &Arc<FakeFetcher>, store: &Arc<MemorySnapshotStore>) -> RosterCache {
        RosterCache::new(fetcher.clone(), store.clone())
    }

    struct BrokenStore;

    impl SnapshotStore for BrokenStore {
        fn read(&self) -> Result<Option<crate::cache::CachedData<Page>>, PersistenceError> {
            Err(PersistenceError::Io {
                path: "users_data.json".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        }

        fn save(&self, _page: &Page) -> Result<(), PersistenceError> {
            Err(PersistenceError::Io {
                path: "users_data.json".into(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "quota exceeded"),
            })
        }

        fn clear(&self) -> Result<(), PersistenceError> {
            self.save(&Page::new(vec![], 1, 1))
        }
    }

    /// Store whose reads race with an invalidation of the cache it backs.
    struct InvalidatingStore {
        inner: MemorySnapshotStore,
        cache: OnceLock<Weak<RosterCache>>,
    }

    impl SnapshotStore for InvalidatingStore {
        fn read(&self) -> Result<Option<crate::cache::CachedData<Page>>, PersistenceError> {
            let entry = self.inner.read();
            if let Some(cache) = self.cache.get().and_then(Weak::upgrade) {
                cache.invalidate();
            }
            entry
        }

        fn save(&self, page: &Page) -> Result<(), PersistenceError> {
            self.inner.save(page)
        }

        fn clear(&self) -> Result<(), PersistenceError> {
            self.inner.clear()
        }
    }

    #[tokio::test]
    async fn test_walk_until_exhausted() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.push_page(Page::new(vec![user(1, "George")], 1, 2));
        fetcher.push_page(Page::new(vec![user(2, "Janet")], 2, 2));
        let store = Arc::new(MemorySnapshotStore::new());
        let cache = cache_with(&fetcher, &store);

        assert_eq!(cache.state(), CacheState::Empty);

        let outcome = cache.request_next_page().await.unwrap();
        assert_eq!(outcome, FetchOutcome::Fetched(1));
        assert_eq!(cache.state(), CacheState::Ready);
        assert_eq!(ids(&cache.flattened_records()), vec![1]);
        assert_eq!(store.load().map(|p| p.page), Some(1));

        let outcome = cache.request_next_page().await.unwrap();
        assert_eq!(outcome, FetchOutcome::Fetched(2));
        assert_eq!(cache.state(), CacheState::Exhausted);
        assert_eq!(ids(&cache.flattened_records()), vec![1, 2]);
        assert_eq!(cache.total_pages(), Some(2));
        assert_eq!(fetcher.calls(), vec![1, 2]);

        // Only page 1 is ever persisted
        assert_eq!(store.load().map(|p| ids(&p.data)), Some(vec![1]));
    }

    #[tokio::test]
    async fn test_at_most_one_fetch_in_flight() {
        let gate = Arc::new(Notify::new());
        let fetcher = Arc::new(FakeFetcher::new().with_gate(gate.clone()));
        fetcher.push_page(Page::new(vec![user(1, "George")], 1, 3));
        let store = Arc::new(MemorySnapshotStore::new());
        let cache = cache_with(&fetcher, &store);

        let (first, second) = tokio::join!(cache.request_next_page(), async {
            let outcome = cache.request_next_page().await;
            gate.notify_one();
            outcome
        });

        assert_eq!(first.unwrap(), FetchOutcome::Fetched(1));
        assert_eq!(second.unwrap(), FetchOutcome::Skipped(CacheState::Loading));
        assert_eq!(fetcher.calls(), vec![1]);
        assert_eq!(cache.state(), CacheState::Ready);
    }

    #[tokio::test]
    async fn test_exhausted_is_terminal() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.push_page(Page::new(vec![user(1, "George")], 1, 1));
        let store = Arc::new(MemorySnapshotStore::new());
        let cache = cache_with(&fetcher, &store);

        cache.request_next_page().await.unwrap();
        assert_eq!(cache.state(), CacheState::Exhausted);
        assert!(!cache.has_next_page());

        for _ in 0..3 {
            let outcome = cache.request_next_page().await.unwrap();
            assert_eq!(outcome, FetchOutcome::Skipped(CacheState::Exhausted));
        }
        assert_eq!(fetcher.calls(), vec![1]);
        assert_eq!(ids(&cache.flattened_records()), vec![1]);
    }

    #[tokio::test]
    async fn test_empty_roster_exhausts_on_first_page() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.push_page(Page::new(vec![], 1, 0));
        let store = Arc::new(MemorySnapshotStore::new());
        let cache = cache_with(&fetcher, &store);

        cache.request_next_page().await.unwrap();
        assert_eq!(cache.state(), CacheState::Exhausted);
        assert!(cache.flattened_records().is_empty());
    }

    #[tokio::test]
    async fn test_invalidate_restarts_from_page_one() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.push_page(Page::new(vec![user(1, "George")], 1, 2));
        fetcher.push_page(Page::new(vec![user(2, "Janet")], 2, 2));
        fetcher.push_page(Page::new(vec![user(1, "Georgina")], 1, 2));
        let store = Arc::new(MemorySnapshotStore::new());
        let cache = cache_with(&fetcher, &store);

        cache.request_next_page().await.unwrap();
        cache.request_next_page().await.unwrap();
        assert_eq!(cache.state(), CacheState::Exhausted);

        cache.invalidate();
        assert_eq!(cache.state(), CacheState::Empty);
        assert!(cache.flattened_records().is_empty());
        assert_eq!(cache.generation(), 1);
        assert!(store.is_empty());

        let outcome = cache.request_next_page().await.unwrap();
        assert_eq!(outcome, FetchOutcome::Fetched(1));
        assert_eq!(fetcher.calls(), vec![1, 2, 1]);
        assert_eq!(cache.flattened_records()[0].first_name, "Georgina");
    }

    #[tokio::test]
    async fn test_keep_persisted_policy_restores_stale_page() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.push_page(Page::new(vec![user(1, "George")], 1, 2));
        let store = Arc::new(MemorySnapshotStore::new());
        let cache = cache_with(&fetcher, &store).with_policy(InvalidationPolicy::KeepPersisted);

        cache.request_next_page().await.unwrap();
        cache.invalidate();
        assert!(!store.is_empty());

        let outcome = cache.request_next_page().await.unwrap();
        assert_eq!(outcome, FetchOutcome::Restored);
        assert_eq!(fetcher.calls(), vec![1]);
        assert_eq!(cache.flattened_records()[0].first_name, "George");
    }

    #[tokio::test]
    async fn test_persisted_first_page_skips_fetch() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.push_page(Page::new(vec![user(3, "Emma")], 2, 3));
        let store = Arc::new(MemorySnapshotStore::new());
        store
            .save(&Page::new(vec![user(1, "George"), user(2, "Janet")], 1, 3))
            .unwrap();
        let cache = cache_with(&fetcher, &store);

        let outcome = cache.request_next_page().await.unwrap();
        assert_eq!(outcome, FetchOutcome::Restored);
        assert_eq!(ids(&cache.flattened_records()), vec![1, 2]);
        assert!(fetcher.calls().is_empty());
        assert_eq!(cache.state(), CacheState::Ready);

        // The walk continues from the network at page 2
        cache.request_next_page().await.unwrap();
        assert_eq!(fetcher.calls(), vec![2]);
        assert_eq!(ids(&cache.flattened_records()), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_persisted_single_page_roster_is_exhausted() {
        let fetcher = Arc::new(FakeFetcher::new());
        let store = Arc::new(MemorySnapshotStore::new());
        store.save(&Page::new(vec![user(1, "George")], 1, 1)).unwrap();
        let cache = cache_with(&fetcher, &store);

        assert_eq!(cache.request_next_page().await.unwrap(), FetchOutcome::Restored);
        assert_eq!(cache.state(), CacheState::Exhausted);
        assert!(!cache.has_next_page());
        assert_eq!(
            cache.request_next_page().await.unwrap(),
            FetchOutcome::Skipped(CacheState::Exhausted)
        );
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalidate_during_restore_discards_snapshot() {
        let fetcher = Arc::new(FakeFetcher::new());
        let store = Arc::new(InvalidatingStore {
            inner: MemorySnapshotStore::new(),
            cache: OnceLock::new(),
        });
        store.inner.save(&Page::new(vec![user(1, "George")], 1, 2)).unwrap();
        let cache = Arc::new(RosterCache::new(fetcher.clone(), store.clone()));
        store.cache.set(Arc::downgrade(&cache)).unwrap();

        let outcome = cache.request_next_page().await.unwrap();

        assert_eq!(outcome, FetchOutcome::Discarded);
        assert_eq!(cache.generation(), 1);
        assert_eq!(cache.state(), CacheState::Empty);
        assert!(cache.flattened_records().is_empty());
        assert!(fetcher.calls().is_empty());
        assert!(store.inner.is_empty());
    }

    #[tokio::test]
    async fn test_unusable_snapshot_falls_back_to_fetch() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.push_page(Page::new(vec![user(1, "George")], 1, 1));
        let store = Arc::new(MemorySnapshotStore::new());
        store.put_raw("definitely not a page");
        let cache = cache_with(&fetcher, &store);

        assert_eq!(cache.request_next_page().await.unwrap(), FetchOutcome::Fetched(1));
        assert_eq!(fetcher.calls(), vec![1]);
        // The broken entry was replaced by the fresh page
        assert_eq!(store.load().map(|p| p.page), Some(1));
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_snapshot_unchanged() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.push_page(Page::new(vec![user(1, "George")], 1, 3));
        fetcher.push_error(ApiError::Status {
            status: 500,
            message: "boom".to_string(),
        });
        fetcher.push_page(Page::new(vec![user(2, "Janet")], 2, 3));
        let store = Arc::new(MemorySnapshotStore::new());
        let cache = cache_with(&fetcher, &store);

        cache.request_next_page().await.unwrap();
        let err = cache.request_next_page().await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(cache.state(), CacheState::Ready);
        assert_eq!(ids(&cache.flattened_records()), vec![1]);

        // Manual retry asks for page 2 again
        assert_eq!(cache.request_next_page().await.unwrap(), FetchOutcome::Fetched(2));
        assert_eq!(fetcher.calls(), vec![1, 2, 2]);
    }

    #[tokio::test]
    async fn test_failed_first_fetch_returns_to_empty() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.push_error(ApiError::Unauthorized);
        let store = Arc::new(MemorySnapshotStore::new());
        let cache = cache_with(&fetcher, &store);

        assert!(cache.request_next_page().await.is_err());
        assert_eq!(cache.state(), CacheState::Empty);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_page_number_rejected() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.push_page(Page::new(vec![user(1, "George")], 1, 3));
        fetcher.push_page(Page::new(vec![user(9, "Tobias")], 3, 3));
        let store = Arc::new(MemorySnapshotStore::new());
        let cache = cache_with(&fetcher, &store);

        cache.request_next_page().await.unwrap();
        let err = cache.request_next_page().await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
        assert_eq!(cache.state(), CacheState::Ready);
        assert_eq!(cache.page_count(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_during_fetch_discards_result() {
        let gate = Arc::new(Notify::new());
        let fetcher = Arc::new(FakeFetcher::new().with_gate(gate.clone()));
        fetcher.push_page(Page::new(vec![user(1, "George")], 1, 2));
        let store = Arc::new(MemorySnapshotStore::new());
        let cache = cache_with(&fetcher, &store);

        let (outcome, _) = tokio::join!(cache.request_next_page(), async {
            cache.invalidate();
            gate.notify_one();
        });

        assert_eq!(outcome.unwrap(), FetchOutcome::Discarded);
        assert_eq!(cache.state(), CacheState::Empty);
        assert!(cache.flattened_records().is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_is_not_surfaced() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.push_page(Page::new(vec![user(1, "George")], 1, 2));
        let cache = RosterCache::new(fetcher.clone(), Arc::new(BrokenStore));

        assert_eq!(cache.request_next_page().await.unwrap(), FetchOutcome::Fetched(1));
        cache.invalidate();
        assert_eq!(cache.state(), CacheState::Empty);
    }

    #[tokio::test]
    async fn test_find_user() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.push_page(Page::new(vec![user(1, "George"), user(2, "Janet")], 1, 1));
        let cache = RosterCache::new(fetcher, Arc::new(MemorySnapshotStore::new()));

        cache.request_next_page().await.unwrap();
        assert_eq!(cache.find(2).map(|u| u.first_name), Some("Janet".to_string()));
        assert!(cache.find(3).is_none());
    }
}
