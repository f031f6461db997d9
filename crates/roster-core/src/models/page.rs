use serde::{Deserialize, Serialize};

use super::User;

/// One page of the users listing.
///
/// `page` is 1-based. The listing endpoint also reports `per_page` and
/// `total`; they are kept for display but the cache only looks at
/// `page` and `total_pages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Page {
    #[serde(default)]
    pub data: Vec<User>,
    pub page: u32,
    pub total_pages: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
}

impl Page {
    pub fn new(data: Vec<User>, page: u32, total_pages: u32) -> Self {
        Self {
            data,
            page,
            total_pages,
            per_page: None,
            total: None,
        }
    }

    /// True once this is the last page of the walk. An empty roster reports
    /// `total_pages = 0`, so its first page is also the last.
    pub fn is_last(&self) -> bool {
        self.page >= self.total_pages
    }
}
