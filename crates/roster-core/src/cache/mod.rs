//! Roster caching module.
//!
//! This module provides:
//! - `SnapshotStore`: best-effort persistence of page one of the roster,
//!   used to skip the initial network fetch
//! - `RosterCache`: the infinite-scroll page cache that walks the users
//!   listing one page at a time
//!
//! The persisted entry is a JSON file holding the first page and the time
//! it was written. It is allowed to go stale relative to the server.

pub mod roster;
pub mod snapshot;

pub use roster::{CacheState, FetchOutcome, InvalidationPolicy, RosterCache};
pub use snapshot::{
    CachedData, FileSnapshotStore, MemorySnapshotStore, PersistenceError, SnapshotStore,
};
