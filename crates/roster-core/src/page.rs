//! Page controller for the roster screen.
//!
//! `RosterPage` owns everything that used to be ambient state: the roster
//! cache, the mutation coordinator and the selection channel with its two
//! subscriptions. Dropping the page tears all of it down.

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::api::{ApiClient, ApiError, PagedFetcher, UserMutations};
use crate::cache::{
    FetchOutcome, FileSnapshotStore, InvalidationPolicy, RosterCache, SnapshotStore,
};
use crate::config::Config;
use crate::models::{User, UserChanges};
use crate::mutation::{MutationCoordinator, MutationError};
use crate::selection::{EventKind, SelectionChannel, SelectionEvent, Subscription};

/// Collaborators a page is built from.
pub struct RosterContext {
    pub fetcher: Arc<dyn PagedFetcher>,
    pub mutations: Arc<dyn UserMutations>,
    pub store: Arc<dyn SnapshotStore>,
    pub policy: InvalidationPolicy,
}

impl RosterContext {
    /// Wire a context to the real API and the on-disk snapshot.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut api = ApiClient::new(config.api_base_url.clone())?;
        if let Some(ref key) = config.api_key {
            api.set_api_key(key.clone());
        }
        if let Some(ref token) = config.auth_token {
            api.set_token(token.clone());
        }
        let api = Arc::new(api);

        let mut store = FileSnapshotStore::new(&config.cache_dir()?);
        if let Some(max_age) = config.snapshot_max_age() {
            store = store.with_max_age(max_age);
        }

        Ok(Self {
            fetcher: api.clone(),
            mutations: api,
            store: Arc::new(store),
            policy: config.invalidation_policy(),
        })
    }

    pub fn with_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = store;
        self
    }
}

pub struct RosterPage {
    channel: SelectionChannel,
    cache: Arc<RosterCache>,
    coordinator: Arc<MutationCoordinator>,
    _subscriptions: Vec<Subscription>,
}

impl RosterPage {
    pub fn new(ctx: RosterContext) -> Self {
        let cache = Arc::new(RosterCache::new(ctx.fetcher, ctx.store).with_policy(ctx.policy));
        let coordinator = Arc::new(MutationCoordinator::new(ctx.mutations, cache.clone()));
        let channel = SelectionChannel::new();

        let on_edit = {
            let coordinator = coordinator.clone();
            channel.subscribe(EventKind::Edit, move |user: &User| {
                coordinator.select_for_edit(user.clone())
            })
        };
        let on_delete = {
            let coordinator = coordinator.clone();
            channel.subscribe(EventKind::Delete, move |user: &User| {
                coordinator.select_for_delete(user.clone())
            })
        };

        Self {
            channel,
            cache,
            coordinator,
            _subscriptions: vec![on_edit, on_delete],
        }
    }

    /// Handle for widgets that need to publish edit/delete requests.
    pub fn channel(&self) -> &SelectionChannel {
        &self.channel
    }

    pub fn cache(&self) -> &RosterCache {
        &self.cache
    }

    pub fn coordinator(&self) -> &MutationCoordinator {
        &self.coordinator
    }

    pub fn users(&self) -> Vec<User> {
        self.cache.flattened_records()
    }

    /// Infinite-scroll trigger.
    pub async fn load_more(&self) -> Result<FetchOutcome, ApiError> {
        self.cache.request_next_page().await
    }

    /// Keep requesting pages until `max_pages` are loaded or the walk ends.
    pub async fn load_pages(&self, max_pages: usize) -> Result<usize, ApiError> {
        while self.cache.page_count() < max_pages && self.cache.has_next_page() {
            if let FetchOutcome::Skipped(_) | FetchOutcome::Discarded = self.load_more().await? {
                break;
            }
        }
        debug!(pages = self.cache.page_count(), "Roster pages loaded");
        Ok(self.cache.page_count())
    }

    /// What a table row's "edit" button does.
    pub fn request_edit(&self, user: User) -> usize {
        self.channel.publish(SelectionEvent::Edit(user))
    }

    /// What a table row's "delete" button does.
    pub fn request_delete(&self, user: User) -> usize {
        self.channel.publish(SelectionEvent::Delete(user))
    }

    /// Edit modal "save": update whoever is being edited.
    pub async fn submit_edit(&self, changes: UserChanges) -> Result<User, MutationError> {
        let id = self
            .coordinator
            .editing_target()
            .map(|u| u.id)
            .ok_or(MutationError::NoSelection { action: "editing" })?;
        self.coordinator.update(id, changes).await
    }

    /// Delete modal "confirm".
    pub async fn confirm_delete(&self) -> Result<(), MutationError> {
        let id = self
            .coordinator
            .deleting_target()
            .map(|u| u.id)
            .ok_or(MutationError::NoSelection { action: "deletion" })?;
        self.coordinator.delete(id).await
    }
}
