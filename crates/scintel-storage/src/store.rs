use crate::atomic::{read_json, write_json_atomic};
use crate::error::{Result, StorageError};
use scintel_common::types::Snapshot;
use scintel_health::BreakerRegistry;
use std::fs;
use std::path::{Path, PathBuf};

/// The published snapshot file plus its one-deep backup.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    backup_path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let backup_path = backup_path_for(&path);
        Self { path, backup_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Load the current snapshot, `None` on first run.
    pub fn load(&self) -> Result<Option<Snapshot>> {
        read_json(&self.path)
    }

    /// Replace the current snapshot. The file being replaced is copied to
    /// the backup path first.
    pub fn publish(&self, snapshot: &Snapshot) -> Result<()> {
        if self.path.exists() {
            fs::copy(&self.path, &self.backup_path)
                .map_err(|e| StorageError::io(&self.backup_path, e))?;
            tracing::debug!(backup = %self.backup_path.display(), "Previous snapshot backed up");
        }
        write_json_atomic(&self.path, snapshot)
    }
}

/// `data/snapshot.json` -> `data/snapshot.backup.json`
fn backup_path_for(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot".to_string());
    path.with_file_name(format!("{stem}.backup.json"))
}

/// Circuit breaker state carried between runs.
#[derive(Debug, Clone)]
pub struct BreakerStore {
    path: PathBuf,
}

impl BreakerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file means every breaker starts closed. An unreadable one
    /// is reported and treated the same way, so a corrupt state file cannot
    /// block harvesting.
    pub fn load(&self) -> BreakerRegistry {
        match read_json(&self.path) {
            Ok(Some(registry)) => registry,
            Ok(None) => BreakerRegistry::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable breaker state");
                BreakerRegistry::default()
            }
        }
    }

    pub fn save(&self, registry: &BreakerRegistry) -> Result<()> {
        write_json_atomic(&self.path, registry)
    }
}
