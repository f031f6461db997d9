//! In-memory stand-ins for the users API, shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::api::{ApiError, PagedFetcher, UserMutations};
use crate::models::{NewUser, Page, User, UserChanges};

pub fn user(id: i64, first_name: &str) -> User {
    User {
        id,
        first_name: first_name.to_string(),
        last_name: format!("Last{}", id),
        email: format!("{}@reqres.in", first_name.to_lowercase()),
        avatar: None,
        birth_date: None,
        education: None,
        work: None,
    }
}

/// Scripted `PagedFetcher`. Responses are handed out in push order; every
/// requested page number is recorded. With a gate, each call waits for one
/// `notify_one` before answering.
#[derive(Default)]
pub struct FakeFetcher {
    responses: Mutex<VecDeque<Result<Page, ApiError>>>,
    calls: Mutex<Vec<u32>>,
    gate: Option<Arc<Notify>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn push_page(&self, page: Page) {
        self.responses.lock().push_back(Ok(page));
    }

    pub fn push_error(&self, error: ApiError) {
        self.responses.lock().push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().clone()
    }
}

impl PagedFetcher for FakeFetcher {
    fn fetch_page(&self, page: u32) -> BoxFuture<'_, Result<Page, ApiError>> {
        async move {
            self.calls.lock().push(page);
            if let Some(ref gate) = self.gate {
                gate.notified().await;
            }
            let next = self.responses.lock().pop_front();
            next.unwrap_or_else(|| Err(ApiError::InvalidResponse(format!("no response scripted for page {}", page))))
        }
        .boxed()
    }
}

/// `UserMutations` that succeeds unless a failure was queued with
/// `fail_next`. Calls are recorded as `"create:<email>"`, `"update:<id>"`,
/// `"delete:<id>"`.
pub struct FakeMutations {
    failures: Mutex<VecDeque<ApiError>>,
    calls: Mutex<Vec<String>>,
    next_id: AtomicI64,
    gate: Option<Arc<Notify>>,
}

impl FakeMutations {
    pub fn new() -> Self {
        Self {
            failures: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(100),
            gate: None,
        }
    }

    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn fail_next(&self, error: ApiError) {
        self.failures.lock().push_back(error);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    async fn settle(&self, call: String) -> Result<(), ApiError> {
        self.calls.lock().push(call);
        if let Some(ref gate) = self.gate {
            gate.notified().await;
        }
        let failure = self.failures.lock().pop_front();
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl UserMutations for FakeMutations {
    fn create_user<'a>(&'a self, new: &'a NewUser) -> BoxFuture<'a, Result<User, ApiError>> {
        async move {
            self.settle(format!("create:{}", new.email)).await?;
            Ok(User {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                first_name: new.first_name.clone(),
                last_name: new.last_name.clone(),
                email: new.email.clone(),
                avatar: new.avatar.clone(),
                birth_date: new.birth_date,
                education: new.education.clone(),
                work: new.work.clone(),
            })
        }
        .boxed()
    }

    fn update_user<'a>(
        &'a self,
        id: i64,
        changes: &'a UserChanges,
    ) -> BoxFuture<'a, Result<User, ApiError>> {
        async move {
            self.settle(format!("update:{}", id)).await?;
            // Echo only what was sent, like the real API
            let mut echo = User {
                id,
                first_name: String::new(),
                last_name: String::new(),
                email: String::new(),
                avatar: None,
                birth_date: None,
                education: None,
                work: None,
            };
            echo.apply(changes);
            Ok(echo)
        }
        .boxed()
    }

    fn delete_user(&self, id: i64) -> BoxFuture<'_, Result<(), ApiError>> {
        async move { self.settle(format!("delete:{}", id)).await }.boxed()
    }
}
