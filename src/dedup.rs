//! Run-scoped URL claim set.
//!
//! Every generator asks the cache before emitting a URL; the first claim wins
//! and every later claim for the same URL is refused. The set lives for one
//! orchestration run and is cleared explicitly when the run ends.

use crate::url_utils;
use dashmap::DashSet;

/// Lock-free claim set shared by all generators of a run.
///
/// Claims are atomic per URL: two tasks racing on the same URL see exactly
/// one `true`.
#[derive(Debug, Default)]
pub struct DedupCache {
    claimed: DashSet<String>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self {
            claimed: DashSet::new(),
        }
    }

    /// Returns true the first time `url` is claimed during the run.
    pub fn claim(&self, url: &str) -> bool {
        self.claimed.insert(url_utils::dedup_key(url))
    }

    pub fn is_claimed(&self, url: &str) -> bool {
        self.claimed.contains(&url_utils::dedup_key(url))
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }

    /// Drop every claim and release the backing memory.
    pub fn reset(&self) {
        self.claimed.clear();
        self.claimed.shrink_to_fit();
    }
}
