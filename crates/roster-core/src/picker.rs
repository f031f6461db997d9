//! Searchable user picker over the roster loaded so far.

use std::collections::HashSet;

use crate::models::User;
use crate::utils::{contains_ignore_case, eq_ignore_case};

/// How close (in pixels) to the bottom of the list a scroll must get
/// before the next page is requested.
pub const LOAD_MORE_THRESHOLD_PX: f64 = 10.0;

#[derive(Debug, Default, Clone)]
pub struct UserPicker {
    query: String,
    disabled_ids: HashSet<i64>,
    selected: Option<i64>,
    open: bool,
}

impl UserPicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Users that show up in the list but cannot be picked (already added
    /// elsewhere on the form).
    pub fn with_disabled(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.disabled_ids = ids.into_iter().collect();
        self
    }

    pub fn with_selected(mut self, id: Option<i64>) -> Self {
        self.selected = id;
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selected(&self) -> Option<i64> {
        self.selected
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Typing into the box; clearing it also clears the selection.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        if self.query.is_empty() {
            self.selected = None;
        }
    }

    pub fn is_disabled(&self, id: i64) -> bool {
        self.disabled_ids.contains(&id)
    }

    /// Users whose first or last name contains the query, case-insensitively.
    pub fn filter<'a>(&self, users: &'a [User]) -> Vec<&'a User> {
        users
            .iter()
            .filter(|u| {
                self.query.is_empty()
                    || contains_ignore_case(&u.first_name, &self.query)
                    || contains_ignore_case(&u.last_name, &self.query)
            })
            .collect()
    }

    /// True when some user's first or last name equals the query exactly.
    pub fn has_exact_match(&self, users: &[User]) -> bool {
        !self.query.is_empty()
            && users.iter().any(|u| {
                eq_ignore_case(&u.first_name, &self.query) || eq_ignore_case(&u.last_name, &self.query)
            })
    }

    /// Offer "add a new user" when the search names nobody on the roster.
    pub fn offers_add(&self, users: &[User]) -> bool {
        !self.query.is_empty() && !self.has_exact_match(users)
    }

    /// Pick a user. Disabled users are refused. Picking closes the list and
    /// resets the search.
    pub fn select(&mut self, user: &User) -> bool {
        if self.is_disabled(user.id) {
            return false;
        }
        self.selected = Some(user.id);
        self.query.clear();
        self.open = false;
        true
    }

    pub fn selected_user<'a>(&self, users: &'a [User]) -> Option<&'a User> {
        let id = self.selected?;
        users.iter().find(|u| u.id == id)
    }

    /// Text shown in the input: the search while open or with nothing
    /// picked, otherwise "Last First" of the picked user.
    pub fn label(&self, users: &[User]) -> String {
        if self.open || self.selected.is_none() {
            return self.query.clone();
        }
        self.selected_user(users)
            .map(User::display_name)
            .unwrap_or_default()
    }
}

/// Whether a list scrolled to `scroll_top` is close enough to the bottom to
/// ask for the next page.
pub fn near_bottom(scroll_top: f64, client_height: f64, scroll_height: f64) -> bool {
    scroll_top + client_height >= scroll_height - LOAD_MORE_THRESHOLD_PX
}
