//! Durable snapshot persistence.
//!
//! Opaque structured-data read/write keyed by a fixed path per strategy
//! instance. A missing file is a normal first-run condition; a corrupt one
//! is logged and degrades to the caller's default. Persistence trouble is
//! never fatal to the trading cycle.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::PersistenceError;

/// JSON document store at a fixed path.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    /// Write the snapshot, creating parent directories as needed.
    pub async fn save<T: Serialize>(&self, data: &T) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_vec_pretty(data).map_err(|source| PersistenceError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })?;

        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), "Snapshot saved");
        Ok(())
    }

    /// Read the snapshot, falling back to `default` when the file is
    /// absent (first run) or unreadable. Corruption is logged, never
    /// propagated.
    pub async fn load<T: DeserializeOwned>(&self, default: T) -> T {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No snapshot found, starting empty");
                return default;
            }
            Err(err) => {
                error!(path = %self.path.display(), error = %err, "Snapshot read failed, starting empty");
                return default;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(data) => {
                info!(path = %self.path.display(), "Snapshot loaded");
                data
            }
            Err(err) => {
                error!(path = %self.path.display(), error = %err, "Snapshot corrupt, starting empty");
                default
            }
        }
    }
}
