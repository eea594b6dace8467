//! On-disk catalog store backed by redb.
//!
//! Rows live in `pages` keyed by canonical path, serialized as JSON together
//! with their cached bucket. `bucket_index` maps `<bucket>\u{1f}<path>` to the
//! path so a bucket read walks only that bucket, still in path order.

use crate::error::SourceError;
use crate::models::{Bucket, PageCandidate};
use crate::scoring::{self, SignalEstimator};
use crate::source::{ReadPosition, RecordFilter, RowStore};
use async_trait::async_trait;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

pub const DB_FILE: &str = "catalog.redb";
const IMPORT_BATCH: usize = 1_000;
const INDEX_SEP: char = '\u{1f}';

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database creation error: {0}")]
    RedbCreate(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Background task failed: {0}")]
    Join(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredRow {
    bucket: Bucket,
    row: PageCandidate,
}

/// Outcome of a JSONL import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    /// Lines that were not valid rows, with their 1-based line number
    pub rejected: Vec<(usize, String)>,
    pub by_bucket: BTreeMap<Bucket, usize>,
}

#[derive(Clone)]
pub struct CatalogStore {
    db: Arc<Database>,
    ceiling: usize,
    examined: Arc<AtomicU64>,
}

impl CatalogStore {
    const PAGES: TableDefinition<'_, &str, &[u8]> = TableDefinition::new("pages");
    const BUCKET_INDEX: TableDefinition<'_, &str, &str> = TableDefinition::new("bucket_index");

    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, StoreError> {
        let data_path = data_dir.as_ref();
        std::fs::create_dir_all(data_path)?;
        let db = Database::create(data_path.join(DB_FILE))?;

        let write_txn = db.begin_write()?;
        {
            let _pages = write_txn.open_table(Self::PAGES)?;
            let _index = write_txn.open_table(Self::BUCKET_INDEX)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            ceiling: crate::config::Config::STORE_MAX_ROWS_PER_REQUEST,
            examined: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn with_ceiling(mut self, ceiling: usize) -> Self {
        self.ceiling = ceiling.max(1);
        self
    }

    /// Score and upsert rows in one transaction. Returns the bucket of each row.
    pub fn insert_rows(&self, rows: &[PageCandidate]) -> Result<Vec<Bucket>, StoreError> {
        let mut buckets = Vec::with_capacity(rows.len());
        let write_txn = self.db.begin_write()?;
        {
            let mut pages = write_txn.open_table(Self::PAGES)?;
            let mut index = write_txn.open_table(Self::BUCKET_INDEX)?;

            for row in rows {
                let bucket = scoring::score_candidate(row).bucket;

                let previous = match pages.get(row.path.as_str())? {
                    Some(old) => Some(serde_json::from_slice::<StoredRow>(old.value())?.bucket),
                    None => None,
                };
                if let Some(old_bucket) = previous {
                    index.remove(index_key(old_bucket, &row.path).as_str())?;
                }

                let stored = serde_json::to_vec(&StoredRow {
                    bucket,
                    row: row.clone(),
                })?;
                pages.insert(row.path.as_str(), stored.as_slice())?;
                index.insert(index_key(bucket, &row.path).as_str(), row.path.as_str())?;
                buckets.push(bucket);
            }
        }
        write_txn.commit()?;
        Ok(buckets)
    }

    /// Import newline-delimited JSON rows. Missing placeholder signals are
    /// filled by `estimator` before scoring; invalid lines are reported, not fatal.
    #[tracing::instrument(skip(self, input, estimator), fields(input = %input.display()))]
    pub fn import_jsonl(&self, input: &Path, estimator: &dyn SignalEstimator) -> Result<ImportSummary, StoreError> {
        let reader = BufReader::new(std::fs::File::open(input)?);
        let mut summary = ImportSummary::default();
        let mut batch = Vec::with_capacity(IMPORT_BATCH);

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match parse_row(&line, estimator) {
                Ok(row) => batch.push(row),
                Err(e) => {
                    tracing::warn!(line = i + 1, error = %e, "skipping invalid row");
                    summary.rejected.push((i + 1, e.to_string()));
                }
            }
            if batch.len() >= IMPORT_BATCH {
                self.flush_batch(&mut batch, &mut summary)?;
            }
        }
        self.flush_batch(&mut batch, &mut summary)?;

        tracing::info!(
            imported = summary.imported,
            rejected = summary.rejected.len(),
            "import finished"
        );
        Ok(summary)
    }

    fn flush_batch(&self, batch: &mut Vec<PageCandidate>, summary: &mut ImportSummary) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        for bucket in self.insert_rows(batch)? {
            *summary.by_bucket.entry(bucket).or_default() += 1;
        }
        summary.imported += batch.len();
        batch.clear();
        Ok(())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(Self::PAGES)?;
        Ok(table.len()? as usize)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Synchronous read behind [`RowStore::fetch_rows`]: skips the first
    /// `offset` matches.
    pub fn read_rows(&self, filter: &RecordFilter, offset: usize, limit: usize) -> Result<Vec<PageCandidate>, StoreError> {
        self.scan(filter, None, offset, limit)
    }

    /// Keyset read behind [`RowStore::fetch_rows_from`]: starts right after
    /// the row whose path is `after`, so no earlier row is touched.
    pub fn read_rows_after(&self, filter: &RecordFilter, after: &str, limit: usize) -> Result<Vec<PageCandidate>, StoreError> {
        self.scan(filter, Some(after), 0, limit)
    }

    /// Rows deserialized since the store was opened.
    pub fn rows_examined(&self) -> u64 {
        self.examined.load(Ordering::Relaxed)
    }

    fn scan(
        &self,
        filter: &RecordFilter,
        after: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<PageCandidate>, StoreError> {
        let limit = limit.min(self.ceiling);
        let mut out = Vec::with_capacity(limit.min(1_024));
        if limit == 0 {
            return Ok(out);
        }
        let mut skipped = 0;
        let mut examined = 0u64;

        let read_txn = self.db.begin_read()?;
        let pages = read_txn.open_table(Self::PAGES)?;

        match filter.bucket {
            Some(bucket) => {
                let index = read_txn.open_table(Self::BUCKET_INDEX)?;
                let prefix = format!("{}{}", bucket.as_str(), INDEX_SEP);
                let start = match after {
                    Some(path) => index_key(bucket, path),
                    None => prefix.clone(),
                };
                // With no column filter every index entry is a match, so the
                // offset is skipped on keys alone.
                let keys_only = !filter.has_column_filters();

                for entry in index.range(start.as_str()..)? {
                    let (key, path) = entry?;
                    let key = key.value();
                    if !key.starts_with(&prefix) {
                        break;
                    }
                    if key == start && after.is_some() {
                        continue;
                    }
                    if keys_only && skipped < offset {
                        skipped += 1;
                        continue;
                    }
                    let Some(raw) = pages.get(path.value())? else {
                        continue;
                    };
                    examined += 1;
                    let stored: StoredRow = serde_json::from_slice(raw.value())?;
                    if !filter.matches_columns(&stored.row) {
                        continue;
                    }
                    if skipped < offset {
                        skipped += 1;
                        continue;
                    }
                    out.push(stored.row);
                    if out.len() >= limit {
                        break;
                    }
                }
            }
            None => {
                for entry in pages.range(after.unwrap_or("")..)? {
                    let (key, raw) = entry?;
                    if Some(key.value()) == after {
                        continue;
                    }
                    examined += 1;
                    let stored: StoredRow = serde_json::from_slice(raw.value())?;
                    if !filter.matches_columns(&stored.row) {
                        continue;
                    }
                    if skipped < offset {
                        skipped += 1;
                        continue;
                    }
                    out.push(stored.row);
                    if out.len() >= limit {
                        break;
                    }
                }
            }
        }

        self.examined.fetch_add(examined, Ordering::Relaxed);
        Ok(out)
    }
}

#[async_trait]
impl RowStore for CatalogStore {
    fn max_rows_per_request(&self) -> usize {
        self.ceiling
    }

    async fn fetch_rows(
        &self,
        filter: &RecordFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<PageCandidate>, SourceError> {
        let store = self.clone();
        let filter = filter.clone();
        tokio::task::spawn_blocking(move || store.read_rows(&filter, offset, limit))
            .await
            .map_err(|e| StoreError::Join(e.to_string()))
            .and_then(|r| r)
            .map_err(|e| SourceError::unavailable(offset, e.to_string()))
    }

    async fn fetch_rows_from(
        &self,
        filter: &RecordFilter,
        position: &ReadPosition,
        limit: usize,
    ) -> Result<Vec<PageCandidate>, SourceError> {
        let Some(after) = position.after.clone() else {
            return self.fetch_rows(filter, position.offset, limit).await;
        };
        let store = self.clone();
        let filter = filter.clone();
        let offset = position.offset;
        tokio::task::spawn_blocking(move || store.read_rows_after(&filter, &after, limit))
            .await
            .map_err(|e| StoreError::Join(e.to_string()))
            .and_then(|r| r)
            .map_err(|e| SourceError::unavailable(offset, e.to_string()))
    }
}

fn index_key(bucket: Bucket, path: &str) -> String {
    format!("{}{}{}", bucket.as_str(), INDEX_SEP, path)
}

fn parse_row(line: &str, estimator: &dyn SignalEstimator) -> Result<PageCandidate, serde_json::Error> {
    let mut value: serde_json::Value = serde_json::from_str(line)?;
    let page_type = value
        .get("page_type")
        .cloned()
        .map(serde_json::from_value::<crate::models::PageType>)
        .transpose()?;

    if let (Some(page_type), Some(obj)) = (page_type, value.as_object_mut()) {
        let signals = obj
            .entry("signals")
            .or_insert_with(|| serde_json::Value::Object(Default::default()));
        if let Some(signals) = signals.as_object_mut() {
            let defaults = [
                ("businessValue", estimator.business_value(page_type)),
                ("demand", estimator.demand(page_type)),
                ("contentStrength", estimator.content_strength(page_type)),
            ];
            for (key, fallback) in defaults {
                signals.entry(key).or_insert_with(|| serde_json::json!(fallback));
            }
        }
    }

    serde_json::from_value(value)
}
