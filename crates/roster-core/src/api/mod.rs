//! REST API client module for the users service.
//!
//! This module provides the `ApiClient` for talking to a reqres-style users
//! API, plus the two capabilities the rest of the crate depends on:
//!
//! - `PagedFetcher`: "give me page N of users"
//! - `UserMutations`: create, partially update and delete a user
//!
//! The cache and the mutation coordinator only ever see these traits, so
//! tests can swap the network out for in-memory fakes.

pub mod client;
pub mod error;

use futures::future::BoxFuture;

use crate::models::{NewUser, Page, User, UserChanges};

pub use client::ApiClient;
pub use error::ApiError;

/// Remote "get page N of users". One call per invocation, no retries.
pub trait PagedFetcher: Send + Sync {
    fn fetch_page(&self, page: u32) -> BoxFuture<'_, Result<Page, ApiError>>;
}

/// Remote user mutations. One call per invocation, no retries.
pub trait UserMutations: Send + Sync {
    fn create_user<'a>(&'a self, user: &'a NewUser) -> BoxFuture<'a, Result<User, ApiError>>;

    fn update_user<'a>(
        &'a self,
        id: i64,
        changes: &'a UserChanges,
    ) -> BoxFuture<'a, Result<User, ApiError>>;

    fn delete_user(&self, id: i64) -> BoxFuture<'_, Result<(), ApiError>>;
}
