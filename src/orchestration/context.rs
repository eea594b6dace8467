//! State shared by the generators of one run.

use crate::config::{EntryDefaults, ResolvedConfig};
use crate::dedup::DedupCache;
use crate::error::PipelineResult;
use crate::metrics::SharedMetrics;
use crate::models::PageCandidate;
use crate::shard_writer::{ShardNaming, ShardWriter, SitemapShardFormat};
use crate::sitemap_writer::SitemapUrl;
use crate::source::{RecordFilter, RecordSource};
use crate::url_utils;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

pub struct RunContext {
    pub run_id: Uuid,
    pub generation_date: chrono::NaiveDate,
    pub config: Arc<ResolvedConfig>,
    pub source: RecordSource,
    pub dedup: Arc<DedupCache>,
    pub metrics: SharedMetrics,
}

/// What a generator produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepProduct {
    pub urls: usize,
    pub files: Vec<PathBuf>,
}

/// Per-record decision of a sitemap stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admit,
    Blocked,
    BucketMismatch,
}

impl RunContext {
    pub fn lastmod(&self, row: &PageCandidate) -> String {
        row.last_modified
            .map(|ts| ts.date_naive())
            .unwrap_or(self.generation_date)
            .format("%Y-%m-%d")
            .to_string()
    }

    /// Sitemap entry for `row`; record overrides win over `defaults`.
    pub fn sitemap_entry(&self, row: &PageCandidate, defaults: Option<EntryDefaults>) -> Option<SitemapUrl> {
        let loc = match url_utils::absolute_url(&self.config.base_url, &row.path) {
            Ok(loc) => loc,
            Err(e) => {
                tracing::warn!(path = %row.path, error = %e, "skipping unjoinable path");
                return None;
            }
        };
        Some(SitemapUrl {
            loc,
            lastmod: Some(self.lastmod(row)),
            changefreq: row.changefreq.or(defaults.map(|d| d.changefreq)),
            priority: row.priority.or(defaults.map(|d| d.priority)),
        })
    }

    /// Stream every row matching `filter` into `<stem>[-N].xml` shards.
    /// `admit` runs before the dedup claim, so refused rows claim nothing.
    pub async fn write_sitemap_stream<A>(
        &self,
        filter: RecordFilter,
        stem: &str,
        defaults: Option<EntryDefaults>,
        admit: A,
    ) -> PipelineResult<StepProduct>
    where
        A: Fn(&PageCandidate) -> Admission,
    {
        let limits = &self.config.limits;
        let mut writer = ShardWriter::new(
            &self.config.output_dir,
            ShardNaming::sitemap(stem),
            limits.sitemap_shard_size,
            SitemapShardFormat,
        )
        .with_metrics(self.metrics.clone());
        let mut cursor = self.source.cursor(filter, limits.fetch_page_size);

        while let Some(batch) = cursor.next_batch().await? {
            for row in batch {
                match admit(&row) {
                    Admission::Admit => {}
                    Admission::Blocked => {
                        self.metrics.blocked_skipped.inc();
                        continue;
                    }
                    Admission::BucketMismatch => {
                        self.metrics.bucket_mismatch_skipped.inc();
                        continue;
                    }
                }
                if !self.dedup.claim(&row.path) {
                    self.metrics.duplicates_skipped.inc();
                    continue;
                }
                if let Some(entry) = self.sitemap_entry(&row, defaults) {
                    writer.append(entry)?;
                }
            }
        }

        let summary = writer.flush_remaining()?;
        Ok(StepProduct {
            urls: summary.total_entries,
            files: summary.paths().map(|p| p.to_path_buf()).collect(),
        })
    }
}
