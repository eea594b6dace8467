//! Error taxonomy for the generation pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Failure reading from the backing catalog store.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The store could not serve the request. Retryable by the caller.
    #[error("source unavailable at offset {offset}: {message}")]
    Unavailable { offset: usize, message: String },
}

impl SourceError {
    pub fn unavailable(offset: usize, message: impl Into<String>) -> Self {
        SourceError::Unavailable {
            offset,
            message: message.into(),
        }
    }
}

/// Failure writing a shard, hub part or index file.
#[derive(Error, Debug)]
#[error("write failed for {}: {source}", .path.display())]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl WriteError {
    pub fn new(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// Invalid or missing configuration, detected before any generator runs.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid setting {field}: {message}")]
    Invalid { field: &'static str, message: String },

    #[error("invalid hub group {group}: {message}")]
    Group { group: String, message: String },
}

/// Top-level pipeline error.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    SourceUnavailable(#[from] SourceError),

    #[error(transparent)]
    WriteFailure(#[from] WriteError),

    #[error("configuration error: {0}")]
    ConfigurationError(#[from] ConfigError),
}

impl PipelineError {
    /// Short machine-friendly label used in audit records.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::SourceUnavailable(_) => "source_unavailable",
            PipelineError::WriteFailure(_) => "write_failure",
            PipelineError::ConfigurationError(_) => "configuration_error",
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_not_empty() {
        let err: PipelineError = SourceError::unavailable(3000, "connection reset").into();
        assert_eq!(err.kind(), "source_unavailable");
        assert!(err.to_string().contains("connection reset"));
        assert!(err.to_string().contains("3000"));

        let err: PipelineError = WriteError::new(
            "/out/sitemap-hot-pieces-1.xml",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        )
        .into();
        assert_eq!(err.kind(), "write_failure");
        assert!(err.to_string().contains("sitemap-hot-pieces-1.xml"));

        let err: PipelineError = ConfigError::Missing("output_dir").into();
        assert_eq!(err.kind(), "configuration_error");
        assert!(err.to_string().contains("output_dir"));
    }
}
