//! Orchestrator: one full regeneration per call to [`Orchestrator::run`].

use super::audit::{AuditRecord, AuditSink, JsonlAuditLog};
use super::bucket_stream::{self, stream_bucket};
use super::context::{RunContext, StepProduct};
use super::hubs::HubPrefetch;
use super::index::write_sitemap_index;
use super::phase::{PhaseTracker, RunPhase};
use super::report::{RunFailure, RunReport, StepOutcome, StepStatus};
use super::shutdown::StopSignal;
use super::static_pages::{self, generate_static};
use crate::config::{Config, ResolvedConfig};
use crate::dedup::DedupCache;
use crate::error::{PipelineError, PipelineResult, WriteError};
use crate::hub::{self, GroupKind, GroupSummary, HubConfig, HubWriteOptions};
use crate::metrics::Metrics;
use crate::models::{Bucket, StaticKind};
use crate::source::{RecordSource, RowStore};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

pub struct Orchestrator {
    config: Arc<ResolvedConfig>,
    hubs: HubConfig,
    store: Arc<dyn RowStore>,
    audit: Option<Arc<dyn AuditSink>>,
    stop: StopSignal,
    generation_date: Option<chrono::NaiveDate>,
}

impl Orchestrator {
    pub fn new(config: ResolvedConfig, hubs: HubConfig, store: Arc<dyn RowStore>) -> Self {
        Self {
            config: Arc::new(config),
            hubs,
            store,
            audit: None,
            stop: StopSignal::new(),
            generation_date: None,
        }
    }

    /// Replace the default `<output>/audit/<run_id>.jsonl` log.
    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Date used for `<lastmod>` when a row has none. Defaults to today (UTC).
    pub fn with_generation_date(mut self, date: chrono::NaiveDate) -> Self {
        self.generation_date = Some(date);
        self
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    #[tracing::instrument(skip(self), fields(output_dir = %self.config.output_dir.display()))]
    pub async fn run(&self) -> Result<RunReport, RunFailure> {
        let run_id = Uuid::new_v4();
        let generation_date = self
            .generation_date
            .unwrap_or_else(|| chrono::Utc::now().date_naive());
        let mut report = RunReport::new(run_id, generation_date);
        let mut phases = PhaseTracker::new();
        let started = Instant::now();

        tracing::info!(%run_id, %generation_date, "starting generation run");

        let audit: Arc<dyn AuditSink> = match &self.audit {
            Some(audit) => Arc::clone(audit),
            None => Arc::new(JsonlAuditLog::new(&self.config.output_dir, run_id)),
        };

        // Caches are per run: a fresh claim set, and no artifact from a previous run.
        let dedup = Arc::new(DedupCache::new());
        if let Err(e) = reset_artifacts(&self.config.output_dir) {
            return Err(fail(report, &mut phases, e.into()));
        }
        phases.advance(RunPhase::CachesReset);

        let metrics = Arc::new(Metrics::new());
        let ctx = RunContext {
            run_id,
            generation_date,
            config: Arc::clone(&self.config),
            source: RecordSource::new(Arc::clone(&self.store)).with_metrics(Arc::clone(&metrics)),
            dedup: Arc::clone(&dedup),
            metrics: Arc::clone(&metrics),
        };

        let mut sitemaps: Vec<PathBuf> = Vec::new();
        let mut groups: Vec<GroupSummary> = Vec::new();

        let completed = 'generators: {
            for kind in StaticKind::ALL {
                if self.stop.is_stop_requested() {
                    break 'generators false;
                }
                let outcome = run_step(
                    &ctx,
                    audit.as_ref(),
                    static_pages::step_name(kind),
                    None,
                    generate_static(&ctx, kind),
                )
                .await;
                sitemaps.extend(outcome.files.iter().cloned());
                record(&mut report, outcome);
            }
            phases.advance(RunPhase::StaticGenerated);

            for bucket in Bucket::STREAMED {
                if self.stop.is_stop_requested() {
                    break 'generators false;
                }
                let outcome = run_step(
                    &ctx,
                    audit.as_ref(),
                    bucket_stream::step_name(bucket),
                    Some(bucket.as_str()),
                    stream_bucket(&ctx, bucket),
                )
                .await;
                sitemaps.extend(outcome.files.iter().cloned());
                record(&mut report, outcome);
            }
            phases.advance(RunPhase::BucketsStreamed);

            if !self.hubs.groups.is_empty() {
                if self.stop.is_stop_requested() {
                    break 'generators false;
                }
                let opts = HubWriteOptions {
                    base_url: &self.config.base_url,
                    output_dir: &self.config.output_dir,
                    part_size: self.config.limits.hub_part_size,
                    metrics: Some(Arc::clone(&metrics)),
                };

                // Collection runs ahead within a bounded window; claiming and
                // writing follow config order, one group at a time.
                let mut prefetch = HubPrefetch::start(&ctx, &self.hubs.groups);
                loop {
                    if self.stop.is_stop_requested() {
                        break 'generators false;
                    }
                    let Some((def, result)) = prefetch.next().await else {
                        break;
                    };
                    let groups_ref = &mut groups;
                    let outcome = run_step(&ctx, audit.as_ref(), def.step_name(), None, async {
                        let collected = result?;
                        match hub::write_group(collected, &dedup, &opts)? {
                            Some(output) => {
                                let product = StepProduct {
                                    urls: output.summary.url_count,
                                    files: output.files,
                                };
                                groups_ref.push(output.summary);
                                Ok::<_, PipelineError>(product)
                            }
                            None => Ok(StepProduct::default()),
                        }
                    })
                    .await;
                    record(&mut report, outcome);
                }
            }
            phases.advance(RunPhase::HubsGenerated);
            true
        };

        if !completed {
            tracing::warn!(%run_id, phase = %phases.current(), "stop requested, skipping remaining generators and the index");
            report.interrupted = true;
            return Ok(finish(report, &phases, &dedup, &metrics, started));
        }

        match write_indexes(&self.config, &sitemaps, &groups, &self.hubs, generation_date) {
            Ok(files) => report.files.extend(files),
            Err(e) => {
                dedup.reset();
                return Err(fail(report, &mut phases, e.into()));
            }
        }
        phases.advance(RunPhase::IndexBuilt);
        phases.advance(RunPhase::Done);

        Ok(finish(report, &phases, &dedup, &metrics, started))
    }
}

/// Time, log and audit one generator. Errors become a failed outcome.
async fn run_step<Fut>(
    ctx: &RunContext,
    audit: &dyn AuditSink,
    name: String,
    bucket: Option<&str>,
    step: Fut,
) -> StepOutcome
where
    Fut: Future<Output = PipelineResult<StepProduct>>,
{
    tracing::info!(step = %name, "generator started");
    let started = Instant::now();
    let result = step.await;
    let duration_ms = started.elapsed().as_millis() as u64;

    let outcome = match result {
        Ok(product) => {
            tracing::info!(step = %name, urls = product.urls, files = product.files.len(), duration_ms, "generator finished");
            StepOutcome {
                name,
                status: StepStatus::Success,
                urls: product.urls,
                files: product.files,
                duration_ms,
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!(step = %name, kind = e.kind(), error = %e, duration_ms, "generator failed");
            StepOutcome {
                name,
                status: StepStatus::Failed,
                urls: 0,
                files: Vec::new(),
                duration_ms,
                error: Some(e.to_string()),
            }
        }
    };

    if let Err(e) = audit.record(&AuditRecord::from_step(ctx.run_id, &outcome, bucket)) {
        tracing::warn!(step = %outcome.name, error = %e, "failed to write audit record");
    }
    outcome
}

fn record(report: &mut RunReport, outcome: StepOutcome) {
    report.files.extend(outcome.files.iter().cloned());
    report.steps.push(outcome);
}

fn fail(mut report: RunReport, phases: &mut PhaseTracker, error: PipelineError) -> RunFailure {
    tracing::error!(run_id = %report.run_id, phase = %phases.current(), error = %error, "run failed");
    phases.advance(RunPhase::Failed);
    report.phase = phases.current();
    RunFailure {
        report: Box::new(report),
        source: error,
    }
}

fn finish(
    mut report: RunReport,
    phases: &PhaseTracker,
    dedup: &DedupCache,
    metrics: &Metrics,
    started: Instant,
) -> RunReport {
    dedup.reset();
    report.phase = phases.current();
    report.metrics = metrics.snapshot();

    let failed: Vec<&str> = report.failed_steps().map(|s| s.name.as_str()).collect();
    tracing::info!(
        run_id = %report.run_id,
        phase = %report.phase,
        urls = report.metrics.urls_written,
        files = report.metrics.files_written,
        duplicates = report.metrics.duplicates_skipped,
        blocked = report.metrics.blocked_skipped,
        source_requests = report.metrics.source_requests,
        mean_flush_ms = report.metrics.mean_flush_ms,
        failed = ?failed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "generation run finished"
    );
    report
}

fn write_indexes(
    config: &ResolvedConfig,
    sitemaps: &[PathBuf],
    groups: &[GroupSummary],
    hubs: &HubConfig,
    date: chrono::NaiveDate,
) -> Result<Vec<PathBuf>, WriteError> {
    let mut files = vec![write_sitemap_index(&config.output_dir, &config.base_url, sitemaps, date)?];
    if !hubs.groups.is_empty() {
        files.push(hub::write_global_index(&config.output_dir, groups)?);
    }
    Ok(files)
}

/// Remove everything a previous run generated so the new run is a full
/// regeneration. The audit directory is kept.
pub fn reset_artifacts(output_dir: &Path) -> Result<(), WriteError> {
    std::fs::create_dir_all(output_dir).map_err(|e| WriteError::new(output_dir, e))?;

    let entries = std::fs::read_dir(output_dir).map_err(|e| WriteError::new(output_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| WriteError::new(output_dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let stale_sitemap = name.starts_with("sitemap") && (name.ends_with(".xml") || name.ends_with(".xml.tmp"));
        if stale_sitemap || name == Config::HUB_INDEX_FILE {
            let path = entry.path();
            std::fs::remove_file(&path).map_err(|e| WriteError::new(&path, e))?;
        }
    }

    for kind in [GroupKind::Family, GroupKind::Brand] {
        let dir = output_dir.join(kind.dir_name());
        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(|e| WriteError::new(&dir, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reset_removes_only_generated_artifacts() {
        let dir = TempDir::new().unwrap();
        let out = dir.path();
        for name in ["sitemap.xml", "sitemap-hot-pieces-3.xml", "index.html", "robots.txt"] {
            std::fs::write(out.join(name), "x").unwrap();
        }
        std::fs::create_dir_all(out.join("clusters/freinage")).unwrap();
        std::fs::write(out.join("clusters/freinage/part-001.html"), "x").unwrap();
        std::fs::create_dir_all(out.join("audit")).unwrap();
        std::fs::write(out.join("audit/old.jsonl"), "{}").unwrap();

        reset_artifacts(out).unwrap();

        assert!(!out.join("sitemap.xml").exists());
        assert!(!out.join("sitemap-hot-pieces-3.xml").exists());
        assert!(!out.join("index.html").exists());
        assert!(!out.join("clusters").exists());
        assert!(out.join("robots.txt").exists());
        assert!(out.join("audit/old.jsonl").exists());
    }

    #[test]
    fn test_reset_creates_missing_output_dir() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("public");
        reset_artifacts(&out).unwrap();
        assert!(out.is_dir());
    }
}
