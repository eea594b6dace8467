pub mod cli;
pub mod config;
pub mod dedup;
pub mod error;
pub mod hub;
pub mod logging;
pub mod memory_store;
pub mod metrics;
pub mod models;
pub mod orchestration;
pub mod scoring;
pub mod shard_writer;
pub mod sitemap_writer;
pub mod source;
pub mod store;
pub mod url_utils;

// Re-export main types for library usage
pub use config::{Config, GeneratorConfig, ResolvedConfig};
pub use dedup::DedupCache;
pub use error::{ConfigError, PipelineError, SourceError, WriteError};
pub use hub::HubConfig;
pub use memory_store::MemoryStore;
pub use models::{Bucket, PageCandidate, PageType, ScoreResult, SignalBundle};
pub use orchestration::{Orchestrator, RunReport};
pub use scoring::score;
pub use shard_writer::ShardWriter;
pub use source::{RecordFilter, RecordSource, RowStore};
pub use store::CatalogStore;
