use std::path::PathBuf;

use thiserror::Error;

/// Failures loading an entity collection.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed entity payload: {0}")]
    Malformed(#[from] serde_json::Error),
}
