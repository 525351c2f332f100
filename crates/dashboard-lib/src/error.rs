//! Error taxonomy for snapshot production
//!
//! Neither variant ever reaches an HTTP client: [`crate::source::SnapshotSource`]
//! absorbs both and degrades to the fallback or the empty snapshot.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The orchestrator query failed or its output could not be parsed
    #[error("inventory unavailable: {0}")]
    InventoryUnavailable(String),

    /// The fallback snapshot file is missing or unparsable
    #[error("fallback snapshot {path} unavailable: {reason}")]
    FallbackUnavailable { path: PathBuf, reason: String },
}

impl SnapshotError {
    pub fn inventory(reason: impl Into<String>) -> Self {
        SnapshotError::InventoryUnavailable(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, SnapshotError>;
