use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, KeeperError>;

#[derive(Debug, Error)]
pub enum KeeperError {
    /// The sites file could not be read. Reconciliation treats this as
    /// "keep the current fleet", never as "remove everything".
    #[error("sites file {path} unavailable: {source}")]
    RegistryUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("timed out after {ms}ms waiting for {condition}")]
    Timeout { ms: u64, condition: String },

    #[error("page driver error: {0}")]
    Driver(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl KeeperError {
    pub fn is_registry_unavailable(&self) -> bool {
        matches!(self, Self::RegistryUnavailable { .. })
    }
}
