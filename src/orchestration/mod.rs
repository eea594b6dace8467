//! Run orchestration: reset, static sitemaps, bucket streams, hubs, index.

pub mod audit;
pub mod bucket_stream;
pub mod context;
pub mod hubs;
pub mod index;
pub mod phase;
pub mod report;
pub mod runner;
pub mod shutdown;
pub mod static_pages;

pub use audit::{AuditRecord, AuditSink, JsonlAuditLog, MemoryAuditLog, NoopAuditLog};
pub use phase::RunPhase;
pub use report::{RunFailure, RunReport, StepOutcome, StepStatus};
pub use runner::Orchestrator;
pub use shutdown::{setup_shutdown_handler, StopSignal};
