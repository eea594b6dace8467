//! Run result returned to callers.

use super::phase::RunPhase;
use crate::error::PipelineError;
use crate::metrics::MetricsSnapshot;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Success => "success",
            StepStatus::Failed => "failed",
        }
    }
}

/// One generator invocation
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub name: String,
    pub status: StepStatus,
    pub urls: usize,
    pub files: Vec<PathBuf>,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl StepOutcome {
    pub fn is_failed(&self) -> bool {
        self.status == StepStatus::Failed
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub generation_date: chrono::NaiveDate,
    pub phase: RunPhase,
    pub steps: Vec<StepOutcome>,
    /// Every file written by the run, index files included
    pub files: Vec<PathBuf>,
    pub interrupted: bool,
    pub metrics: MetricsSnapshot,
}

impl RunReport {
    pub fn new(run_id: Uuid, generation_date: chrono::NaiveDate) -> Self {
        Self {
            run_id,
            generation_date,
            phase: RunPhase::Idle,
            steps: Vec::new(),
            files: Vec::new(),
            interrupted: false,
            metrics: MetricsSnapshot::default(),
        }
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| s.is_failed())
    }

    pub fn has_failures(&self) -> bool {
        self.steps.iter().any(StepOutcome::is_failed)
    }

    pub fn total_urls(&self) -> usize {
        self.steps.iter().map(|s| s.urls).sum()
    }

    pub fn step(&self, name: &str) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.name == name)
    }
}

/// A run-fatal error together with what the run had done so far.
#[derive(Error, Debug)]
#[error("run {} failed: {source}", .report.run_id)]
pub struct RunFailure {
    pub report: Box<RunReport>,
    #[source]
    pub source: PipelineError,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(name: &str, status: StepStatus, urls: usize) -> StepOutcome {
        StepOutcome {
            name: name.to_string(),
            status,
            urls,
            files: Vec::new(),
            duration_ms: 1,
            error: (status == StepStatus::Failed).then(|| "boom".to_string()),
        }
    }

    #[test]
    fn test_failed_steps() {
        let mut report = RunReport::new(Uuid::new_v4(), chrono::NaiveDate::default());
        report.steps.push(step("static:homepage", StepStatus::Success, 1));
        report.steps.push(step("bucket:hot", StepStatus::Failed, 0));
        report.steps.push(step("bucket:new", StepStatus::Success, 4));

        let failed: Vec<&str> = report.failed_steps().map(|s| s.name.as_str()).collect();
        assert_eq!(failed, vec!["bucket:hot"]);
        assert!(report.has_failures());
        assert_eq!(report.total_urls(), 5);
        assert!(report.step("bucket:new").is_some());
    }
}
