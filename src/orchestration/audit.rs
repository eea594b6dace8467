//! Per-generator audit trail.

use super::report::{StepOutcome, StepStatus};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One line of the audit log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub run_id: Uuid,
    pub generator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    pub status: String,
    pub urls_processed: usize,
    pub files_produced: usize,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

impl AuditRecord {
    pub fn from_step(run_id: Uuid, step: &StepOutcome, bucket: Option<&str>) -> Self {
        Self {
            run_id,
            generator: step.name.clone(),
            bucket: bucket.map(str::to_string),
            status: step.status.as_str().to_string(),
            urls_processed: step.urls,
            files_produced: step.files.len(),
            duration_ms: step.duration_ms,
            error: step.error.clone(),
            recorded_at: chrono::Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success.as_str()
    }
}

/// Receives one record per generator invocation. Failures are the caller's
/// to log; they never fail the run.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &AuditRecord) -> std::io::Result<()>;
}

/// Appends JSON lines to `<output>/audit/<run_id>.jsonl`.
pub struct JsonlAuditLog {
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
}

impl JsonlAuditLog {
    pub fn new(output_dir: &Path, run_id: Uuid) -> Self {
        Self {
            path: output_dir
                .join(crate::config::Config::AUDIT_DIR)
                .join(format!("{}.jsonl", run_id)),
            writer: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> std::io::Result<BufWriter<File>> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        Ok(BufWriter::new(file))
    }
}

impl AuditSink for JsonlAuditLog {
    fn record(&self, record: &AuditRecord) -> std::io::Result<()> {
        let mut guard = self.writer.lock();
        if guard.is_none() {
            *guard = Some(self.open()?);
        }
        let line = serde_json::to_string(record)?;
        if let Some(writer) = guard.as_mut() {
            writeln!(writer, "{}", line)?;
            writer.flush()?;
        }
        Ok(())
    }
}

/// Keeps records in memory
#[derive(Default)]
pub struct MemoryAuditLog {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }
}

impl AuditSink for MemoryAuditLog {
    fn record(&self, record: &AuditRecord) -> std::io::Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

/// Discards everything
pub struct NoopAuditLog;

impl AuditSink for NoopAuditLog {
    fn record(&self, _record: &AuditRecord) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn outcome(status: StepStatus) -> StepOutcome {
        StepOutcome {
            name: "bucket:hot".to_string(),
            status,
            urls: 12,
            files: vec![PathBuf::from("sitemap-hot-pieces.xml")],
            duration_ms: 7,
            error: (status == StepStatus::Failed).then(|| "source unavailable".to_string()),
        }
    }

    #[test]
    fn test_jsonl_log_appends_lines() {
        let dir = TempDir::new().unwrap();
        let run_id = Uuid::new_v4();
        let log = JsonlAuditLog::new(dir.path(), run_id);

        log.record(&AuditRecord::from_step(run_id, &outcome(StepStatus::Success), Some("hot")))
            .unwrap();
        log.record(&AuditRecord::from_step(run_id, &outcome(StepStatus::Failed), Some("hot")))
            .unwrap();

        let content = std::fs::read_to_string(dir.path().join("audit").join(format!("{}.jsonl", run_id))).unwrap();
        let records: Vec<AuditRecord> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert!(records[0].is_success());
        assert_eq!(records[0].files_produced, 1);
        assert_eq!(records[1].status, "failed");
        assert_eq!(records[1].error.as_deref(), Some("source unavailable"));
    }

    #[test]
    fn test_memory_log() {
        let log = MemoryAuditLog::new();
        let run_id = Uuid::new_v4();
        log.record(&AuditRecord::from_step(run_id, &outcome(StepStatus::Success), None))
            .unwrap();
        assert_eq!(log.records().len(), 1);
        assert_eq!(log.records()[0].run_id, run_id);
    }
}
