//! File-backed last-known-good snapshot
//!
//! The file is maintained outside this service; it is only ever read here.

use crate::error::{Result, SnapshotError};
use crate::models::StoredSnapshot;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default location, relative to the working directory
pub const DEFAULT_FALLBACK_PATH: &str = "Data/do-agents.json";

#[derive(Debug, Clone)]
pub struct FallbackStore {
    path: PathBuf,
}

impl FallbackStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored snapshot as-is
    ///
    /// The file only has to be a JSON object with an `agents` array; its
    /// contents are carried through untouched.
    pub async fn load(&self) -> Result<StoredSnapshot> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| self.unavailable(e.to_string()))?;

        let snapshot = StoredSnapshot::from_json(text).map_err(|reason| self.unavailable(reason))?;

        debug!(
            path = %self.path.display(),
            agents = snapshot.len(),
            "Loaded fallback snapshot"
        );
        Ok(snapshot)
    }

    fn unavailable(&self, reason: String) -> SnapshotError {
        SnapshotError::FallbackUnavailable {
            path: self.path.clone(),
            reason,
        }
    }
}

impl Default for FallbackStore {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_PATH)
    }
}
