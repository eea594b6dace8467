//! Paginated reads over the catalog store.
//!
//! [`RowStore`] is the raw store seam: one request, capped at the store's
//! per-request row ceiling. [`RecordSource`] hides that ceiling by issuing as
//! many requests as needed to fill a page, and [`RecordCursor`] walks a whole
//! filter in bounded batches.

use crate::error::SourceError;
use crate::metrics::SharedMetrics;
use crate::models::{Bucket, PageCandidate, PageType};
use async_trait::async_trait;
use std::sync::Arc;

/// Column filters understood by every store. Rows are always ordered by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub page_type: Option<PageType>,
    /// Cached bucket assignment
    pub bucket: Option<Bucket>,
    /// Membership in `group_keys`
    pub group_key: Option<String>,
    /// `inventory >= min_inventory`
    pub min_inventory: Option<u32>,
}

impl RecordFilter {
    pub fn page_type(page_type: PageType) -> Self {
        Self {
            page_type: Some(page_type),
            ..Default::default()
        }
    }

    pub fn bucket(mut self, bucket: Bucket) -> Self {
        self.bucket = Some(bucket);
        self
    }

    pub fn group_key(mut self, key: impl Into<String>) -> Self {
        self.group_key = Some(key.into());
        self
    }

    pub fn min_inventory(mut self, min: u32) -> Self {
        self.min_inventory = Some(min);
        self
    }

    /// True when some condition other than `bucket` is set.
    pub fn has_column_filters(&self) -> bool {
        self.page_type.is_some() || self.group_key.is_some() || self.min_inventory.is_some()
    }

    /// Row-level predicate for everything except `bucket`, which stores
    /// resolve from their cached score.
    pub fn matches_columns(&self, row: &PageCandidate) -> bool {
        if let Some(t) = self.page_type {
            if row.page_type != t {
                return false;
            }
        }
        if let Some(key) = &self.group_key {
            if !row.group_keys.iter().any(|k| k == key) {
                return false;
            }
        }
        if let Some(min) = self.min_inventory {
            if row.inventory < min {
                return false;
            }
        }
        true
    }
}

/// Raw paginated access to the backing store.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Largest number of rows one request may return.
    fn max_rows_per_request(&self) -> usize;

    /// Fetch up to `min(limit, max_rows_per_request())` rows matching
    /// `filter`, skipping the first `offset` matches.
    async fn fetch_rows(
        &self,
        filter: &RecordFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<PageCandidate>, SourceError>;

    /// Like [`fetch_rows`](Self::fetch_rows), resuming at `position`. Stores
    /// that can seek by path override this to start right after
    /// `position.after`; the default falls back to the offset.
    async fn fetch_rows_from(
        &self,
        filter: &RecordFilter,
        position: &ReadPosition,
        limit: usize,
    ) -> Result<Vec<PageCandidate>, SourceError> {
        self.fetch_rows(filter, position.offset, limit).await
    }
}

/// Where a read resumes: how many matches were already consumed, and the
/// path of the last one when known. Rows are path-ordered, so `after` alone
/// is enough for a store that can seek.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadPosition {
    pub offset: usize,
    pub after: Option<String>,
}

impl ReadPosition {
    pub fn at_offset(offset: usize) -> Self {
        Self { offset, after: None }
    }

    fn advance(&mut self, rows: &[PageCandidate]) {
        self.offset += rows.len();
        if let Some(last) = rows.last() {
            self.after = Some(last.path.clone());
        }
    }
}

/// One page of records. `has_more` is false once the store returned a short page.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<PageCandidate>,
    pub has_more: bool,
}

/// Adapter that pages past the store's per-request ceiling.
#[derive(Clone)]
pub struct RecordSource {
    store: Arc<dyn RowStore>,
    metrics: Option<SharedMetrics>,
}

impl RecordSource {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self {
            store,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Fetch `page_size` records starting at `offset`, transparently issuing
    /// several store requests when `page_size` exceeds the store ceiling.
    pub async fn fetch_page(
        &self,
        filter: &RecordFilter,
        offset: usize,
        page_size: usize,
    ) -> Result<Page, SourceError> {
        let mut position = ReadPosition::at_offset(offset);
        self.fetch_page_from(filter, &mut position, page_size).await
    }

    /// Same as [`fetch_page`](Self::fetch_page), continuing from `position`
    /// and advancing it past the returned records.
    pub async fn fetch_page_from(
        &self,
        filter: &RecordFilter,
        position: &mut ReadPosition,
        page_size: usize,
    ) -> Result<Page, SourceError> {
        let ceiling = self.store.max_rows_per_request().max(1);
        let mut records = Vec::with_capacity(page_size.min(ceiling * 4));
        let start = position.offset;
        let mut exhausted = false;

        while records.len() < page_size {
            let want = (page_size - records.len()).min(ceiling);
            let rows = self.store.fetch_rows_from(filter, position, want).await?;
            if let Some(metrics) = &self.metrics {
                metrics.source_requests.inc();
            }

            let got = rows.len();
            position.advance(&rows);
            records.extend(rows);

            if got < want {
                exhausted = true;
                break;
            }
        }

        tracing::trace!(offset = start, page_size, returned = records.len(), exhausted, "fetched page");

        Ok(Page {
            has_more: !exhausted && records.len() == page_size && page_size > 0,
            records,
        })
    }

    /// Start walking every record matching `filter` in batches of `page_size`.
    pub fn cursor(&self, filter: RecordFilter, page_size: usize) -> RecordCursor {
        RecordCursor {
            source: self.clone(),
            filter,
            page_size: page_size.max(1),
            position: ReadPosition::default(),
            done: false,
        }
    }
}

/// Sequential walk over one filter. Holds at most one batch.
pub struct RecordCursor {
    source: RecordSource,
    filter: RecordFilter,
    page_size: usize,
    position: ReadPosition,
    done: bool,
}

impl RecordCursor {
    /// Next batch, `Ok(None)` once the filter is exhausted.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<PageCandidate>>, SourceError> {
        if self.done {
            return Ok(None);
        }

        let page = self
            .source
            .fetch_page_from(&self.filter, &mut self.position, self.page_size)
            .await?;
        self.done = !page.has_more;

        if page.records.is_empty() {
            self.done = true;
            return Ok(None);
        }
        Ok(Some(page.records))
    }

    pub fn offset(&self) -> usize {
        self.position.offset
    }
}
