//! Create, update and delete users, keeping the roster cache honest.
//!
//! Every successful mutation invalidates the `RosterCache` so the next read
//! walks the listing again from page one. Failed calls leave the cache and
//! the selection target alone; retrying is up to the user.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiError, UserMutations};
use crate::cache::RosterCache;
use crate::models::{NewUser, User, UserChanges};
use crate::validation::{validate_changes, validate_new_user, ValidationError};

#[derive(Error, Debug)]
pub enum MutationError {
    #[error("Invalid input - {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] ApiError),

    #[error("User {id} is not selected for {action}")]
    NoTarget { action: &'static str, id: i64 },

    #[error("No user is selected for {action}")]
    NoSelection { action: &'static str },

    #[error("A delete is already in progress")]
    Busy,
}

/// Editing and deleting targets; at most one of each.
#[derive(Debug, Default)]
struct Selection {
    editing: Option<User>,
    deleting: Option<User>,
    is_deleting: bool,
}

/// Clears `is_deleting` however the delete call ends, including when the
/// future is dropped mid-flight.
struct DeletingFlag<'a>(&'a Mutex<Selection>);

impl Drop for DeletingFlag<'_> {
    fn drop(&mut self) {
        self.0.lock().is_deleting = false;
    }
}

pub struct MutationCoordinator {
    api: Arc<dyn UserMutations>,
    cache: Arc<RosterCache>,
    selection: Mutex<Selection>,
}

impl MutationCoordinator {
    pub fn new(api: Arc<dyn UserMutations>, cache: Arc<RosterCache>) -> Self {
        Self {
            api,
            cache,
            selection: Mutex::new(Selection::default()),
        }
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn select_for_edit(&self, user: User) {
        self.selection.lock().editing = Some(user);
    }

    pub fn select_for_delete(&self, user: User) {
        self.selection.lock().deleting = Some(user);
    }

    /// Edit modal closed without saving
    pub fn cancel_edit(&self) {
        self.selection.lock().editing = None;
    }

    /// Delete confirmation dismissed
    pub fn cancel_delete(&self) {
        self.selection.lock().deleting = None;
    }

    pub fn editing_target(&self) -> Option<User> {
        self.selection.lock().editing.clone()
    }

    pub fn deleting_target(&self) -> Option<User> {
        self.selection.lock().deleting.clone()
    }

    pub fn is_deleting(&self) -> bool {
        self.selection.lock().is_deleting
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub async fn create(&self, user: NewUser) -> Result<User, MutationError> {
        validate_new_user(&user)?;

        match self.api.create_user(&user).await {
            Ok(created) => {
                info!(id = created.id, "User created");
                self.cache.invalidate();
                Ok(created)
            }
            Err(e) => {
                warn!(error = %e, "Failed to create user");
                Err(e.into())
            }
        }
    }

    /// Update the user currently selected for editing.
    pub async fn update(&self, id: i64, changes: UserChanges) -> Result<User, MutationError> {
        let target = match self.selection.lock().editing.clone() {
            Some(user) if user.id == id => user,
            _ => return Err(MutationError::NoTarget { action: "editing", id }),
        };
        validate_changes(&changes)?;

        match self.api.update_user(id, &changes).await {
            Ok(echo) => {
                info!(id, "User updated");
                // The server echoes only what was sent
                let mut updated = target;
                updated.apply(&changes);
                updated.overlay(&echo);
                self.cache.invalidate();
                let mut selection = self.selection.lock();
                if selection.editing.as_ref().map(|u| u.id) == Some(id) {
                    selection.editing = None;
                }
                Ok(updated)
            }
            Err(e) => {
                warn!(id, error = %e, "Failed to update user");
                Err(e.into())
            }
        }
    }

    /// Delete the user currently selected for deletion.
    pub async fn delete(&self, id: i64) -> Result<(), MutationError> {
        {
            let mut selection = self.selection.lock();
            if selection.deleting.as_ref().map(|u| u.id) != Some(id) {
                return Err(MutationError::NoTarget { action: "deletion", id });
            }
            if selection.is_deleting {
                return Err(MutationError::Busy);
            }
            selection.is_deleting = true;
        }
        let _flag = DeletingFlag(&self.selection);

        match self.api.delete_user(id).await {
            Ok(()) => {
                info!(id, "User deleted");
                self.cache.invalidate();
                let mut selection = self.selection.lock();
                if selection.deleting.as_ref().map(|u| u.id) == Some(id) {
                    selection.deleting = None;
                }
                Ok(())
            }
            Err(e) => {
                warn!(id, error = %e, "Failed to delete user");
                Err(e.into())
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
