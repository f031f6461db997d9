//! roster-core - data layer for the roster admin tool.
//!
//! Lists users from a REST users API one page at a time, keeps page one in
//! a persisted snapshot, routes "edit"/"delete" requests from table rows to
//! the page controller, and runs mutations that invalidate the cached
//! roster when they succeed.

pub mod api;
pub mod cache;
pub mod config;
pub mod models;
pub mod mutation;
pub mod page;
pub mod picker;
pub mod selection;
pub mod utils;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiClient, ApiError, PagedFetcher, UserMutations};
pub use cache::{CacheState, FetchOutcome, InvalidationPolicy, RosterCache, SnapshotStore};
pub use config::Config;
pub use models::{Education, NewUser, Page, User, UserChanges, Work};
pub use mutation::{MutationCoordinator, MutationError};
pub use page::{RosterContext, RosterPage};
pub use picker::UserPicker;
pub use selection::{EventKind, SelectionChannel, SelectionEvent, Subscription};
pub use validation::ValidationError;
