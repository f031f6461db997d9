//! Data models for roster entities.
//!
//! This module contains the data structures exchanged with the users API:
//!
//! - `User`, `Education`, `Work`: the managed record
//! - `NewUser`, `UserChanges`: create and partial-update payloads
//! - `Page`: one page of users plus pagination metadata

pub mod page;
pub mod user;

pub use page::Page;
pub use user::{parse_date, Education, NewUser, User, UserChanges, Work};
pub(crate) use user::UserPatch;
