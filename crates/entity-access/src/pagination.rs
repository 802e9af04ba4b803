//! Offset/limit window for listing queries.

use serde::{Deserialize, Serialize};

/// Default number of rows returned by `find_all`
pub const DEFAULT_LIMIT: u64 = 100;

/// Maximum allowed rows per query to prevent excessive reads
pub const MAX_LIMIT: u64 = 1000;

/// Listing window (reusable as axum query parameters)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Page {
    #[serde(default)]
    pub offset: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

impl Page {
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// Get limit capped at maximum
    pub fn capped_limit(&self) -> u64 {
        self.limit.min(MAX_LIMIT)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}
