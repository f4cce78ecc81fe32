use std::path::PathBuf;

use directory::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    MalformedConfig(#[source] serde_json::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("malformed script: {0}")]
    MalformedScript(#[source] serde_json::Error),
}
