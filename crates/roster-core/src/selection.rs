//! Typed publish/subscribe channel for "edit this user" and "delete this
//! user" requests.
//!
//! A table row can ask for an edit or a delete without holding a reference
//! to whoever owns the modal state; the page controller subscribes and
//! records the selection target. Handlers for a kind run synchronously, in
//! subscription order, on the publisher's task.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use crate::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Edit,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEvent {
    Edit(User),
    Delete(User),
}

impl SelectionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SelectionEvent::Edit(_) => EventKind::Edit,
            SelectionEvent::Delete(_) => EventKind::Delete,
        }
    }

    pub fn user(&self) -> &User {
        match self {
            SelectionEvent::Edit(user) | SelectionEvent::Delete(user) => user,
        }
    }
}

type Handler = Arc<dyn Fn(&User) + Send + Sync>;

struct Entry {
    id: u64,
    kind: EventKind,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Entry>,
}

#[derive(Clone, Default)]
pub struct SelectionChannel {
    registry: Arc<Mutex<Registry>>,
}

impl SelectionChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one kind of event. The handler stays
    /// registered until the returned `Subscription` is dropped.
    #[must_use = "dropping the subscription unsubscribes the handler"]
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&User) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push(Entry {
            id,
            kind,
            handler: Arc::new(handler),
        });
        debug!(?kind, id, "Selection handler subscribed");

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver an event to every handler of its kind. Returns how many
    /// handlers ran.
    pub fn publish(&self, event: SelectionEvent) -> usize {
        let kind = event.kind();
        // Handlers run without the lock held so they can publish or
        // (un)subscribe themselves.
        let handlers: Vec<Handler> = self
            .registry
            .lock()
            .entries
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.handler.clone())
            .collect();

        debug!(?kind, user = event.user().id, handlers = handlers.len(), "Publishing selection event");
        for handler in &handlers {
            handler(event.user());
        }
        handlers.len()
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.registry
            .lock()
            .entries
            .iter()
            .filter(|e| e.kind == kind)
            .count()
    }
}

/// De-registration handle returned by `SelectionChannel::subscribe`.
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().entries.retain(|e| e.id != self.id);
        }
    }
}
