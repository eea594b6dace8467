//! In-process [`RowStore`] with the same paging semantics as the on-disk
//! store. Used by tests, benchmarks and dry runs.

use crate::error::SourceError;
use crate::models::PageCandidate;
use crate::scoring;
use crate::source::{RecordFilter, RowStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const DEFAULT_CEILING: usize = 1_000;

pub struct MemoryStore {
    rows: Vec<PageCandidate>,
    ceiling: usize,
    requests: AtomicUsize,
    fail_on: Mutex<Option<usize>>,
    /// Filter, and how many more requests with it succeed before failing
    failing_filters: Mutex<Vec<(RecordFilter, usize)>>,
}

impl MemoryStore {
    /// Rows are sorted by path; later duplicates of a path are dropped.
    pub fn new(mut rows: Vec<PageCandidate>) -> Self {
        rows.sort_by(|a, b| a.path.cmp(&b.path));
        rows.dedup_by(|a, b| a.path == b.path);
        Self {
            rows,
            ceiling: DEFAULT_CEILING,
            requests: AtomicUsize::new(0),
            fail_on: Mutex::new(None),
            failing_filters: Mutex::new(Vec::new()),
        }
    }

    pub fn with_ceiling(mut self, ceiling: usize) -> Self {
        self.ceiling = ceiling.max(1);
        self
    }

    /// Make the `n`-th request (1-based, counted from now on) fail.
    pub fn fail_on_request(&self, n: usize) {
        let base = self.requests.load(Ordering::SeqCst);
        *self.fail_on.lock() = Some(base + n);
    }

    /// Make every request with exactly this filter fail.
    pub fn fail_for_filter(&self, filter: RecordFilter) {
        self.fail_for_filter_after(filter, 0);
    }

    /// Let `ok_requests` requests with this filter through, then fail the rest.
    pub fn fail_for_filter_after(&self, filter: RecordFilter, ok_requests: usize) {
        self.failing_filters.lock().push((filter, ok_requests));
    }

    pub fn clear_failures(&self) {
        *self.fail_on.lock() = None;
        self.failing_filters.lock().clear();
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn matches(filter: &RecordFilter, row: &PageCandidate) -> bool {
        if !filter.matches_columns(row) {
            return false;
        }
        match filter.bucket {
            Some(bucket) => scoring::score_candidate(row).bucket == bucket,
            None => true,
        }
    }
}

#[async_trait]
impl RowStore for MemoryStore {
    fn max_rows_per_request(&self) -> usize {
        self.ceiling
    }

    async fn fetch_rows(
        &self,
        filter: &RecordFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<PageCandidate>, SourceError> {
        let request_no = self.requests.fetch_add(1, Ordering::SeqCst) + 1;

        if *self.fail_on.lock() == Some(request_no) {
            return Err(SourceError::unavailable(offset, "injected store failure"));
        }
        for (failing, remaining) in self.failing_filters.lock().iter_mut() {
            if failing != filter {
                continue;
            }
            if *remaining == 0 {
                return Err(SourceError::unavailable(offset, "injected store failure for filter"));
            }
            *remaining -= 1;
        }

        let limit = limit.min(self.ceiling);
        Ok(self
            .rows
            .iter()
            .filter(|row| Self::matches(filter, row))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bucket, PageType, SignalBundle};

    #[tokio::test]
    async fn test_ceiling_caps_limit() {
        let rows = (0..50)
            .map(|i| PageCandidate::new(format!("/p{:02}", i), PageType::Piece))
            .collect();
        let store = MemoryStore::new(rows).with_ceiling(10);
        let got = store.fetch_rows(&RecordFilter::default(), 0, 100).await.unwrap();
        assert_eq!(got.len(), 10);
        assert_eq!(got[0].path, "/p00");
    }

    #[tokio::test]
    async fn test_bucket_filter_scores_rows() {
        let hot = SignalBundle {
            business_value: 100.0,
            demand: 100.0,
            graph_strength: 100.0,
            cluster_depth: 10,
            content_strength: 100.0,
            ..Default::default()
        };
        let rows = vec![
            PageCandidate::new("/a", PageType::Piece).with_signals(hot),
            PageCandidate::new("/b", PageType::Piece),
        ];
        let store = MemoryStore::new(rows);
        let got = store
            .fetch_rows(&RecordFilter::default().bucket(Bucket::Hot), 0, 10)
            .await
            .unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].path, "/a");
    }

    #[tokio::test]
    async fn test_filter_failure_injection() {
        let store = MemoryStore::new(vec![PageCandidate::new("/a", PageType::Blog)]);
        store.fail_for_filter(RecordFilter::page_type(PageType::Blog));
        assert!(store
            .fetch_rows(&RecordFilter::page_type(PageType::Blog), 0, 10)
            .await
            .is_err());
        assert!(store
            .fetch_rows(&RecordFilter::page_type(PageType::Home), 0, 10)
            .await
            .is_ok());
        store.clear_failures();
        assert_eq!(
            store
                .fetch_rows(&RecordFilter::page_type(PageType::Blog), 0, 10)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_filter_fails_after_allowed_requests() {
        let rows = (0..6)
            .map(|i| PageCandidate::new(format!("/p{}", i), PageType::Piece))
            .collect();
        let store = MemoryStore::new(rows).with_ceiling(2);
        let filter = RecordFilter::page_type(PageType::Piece);
        store.fail_for_filter_after(filter.clone(), 2);

        assert_eq!(store.fetch_rows(&filter, 0, 2).await.unwrap().len(), 2);
        assert_eq!(store.fetch_rows(&filter, 2, 2).await.unwrap().len(), 2);
        assert!(store.fetch_rows(&filter, 4, 2).await.is_err());
        assert!(store.fetch_rows(&filter, 4, 2).await.is_err());
    }
}
