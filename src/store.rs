//! Read-only lookups against the on-device sync database.
//!
//! Implementations:
//! - `InMemoryFileStore` - For tests and the CLI, optionally seeded from a JSON snapshot
//! - Platform databases implement [`OfflineFileStore`] outside this crate

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::Deserialize;
use thiserror::Error;

use crate::models::{FileSyncSettingsRecord, LocalFileRecord};

/// Lookups the rewriter performs against persisted sync state.
pub trait OfflineFileStore: Send + Sync {
    /// Downloaded copy of `file_id` for the given scope, if any.
    fn local_file(&self, file_id: i64, scope_id: i64) -> Option<LocalFileRecord>;

    /// Sync marker for a file link, if it has already been scheduled.
    fn sync_setting(&self, file_id: i64) -> Option<FileSyncSettingsRecord>;
}

/// Errors raised while loading a [`StoreSnapshot`].
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot exists but could not be read.
    #[error("failed to read snapshot {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: PathBuf,
        /// Source I/O error.
        source: std::io::Error,
    },

    /// The snapshot is not valid JSON for the expected layout.
    #[error("failed to parse snapshot {path}: {source}")]
    Parse {
        /// Path that caused the error.
        path: PathBuf,
        /// Source parse error.
        source: serde_json::Error,
    },
}

/// Serialized view of the sync database used to seed an [`InMemoryFileStore`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    /// Completed downloads.
    #[serde(default)]
    pub local_files: Vec<LocalFileRecord>,
    /// Scheduled file links.
    #[serde(default)]
    pub sync_settings: Vec<FileSyncSettingsRecord>,
}

impl StoreSnapshot {
    /// Load a snapshot from disk. A missing file is an empty snapshot.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(SnapshotError::Io {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        serde_json::from_str(&contents).map_err(|err| SnapshotError::Parse {
            path: path.to_path_buf(),
            source: err,
        })
    }
}

/// In-memory sync database
#[derive(Debug, Default)]
pub struct InMemoryFileStore {
    local_files: RwLock<HashMap<(i64, i64), LocalFileRecord>>,
    sync_settings: RwLock<HashMap<i64, FileSyncSettingsRecord>>,
}

impl InMemoryFileStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed download, replacing any previous record for the same file and scope.
    pub fn insert_local_file(&self, record: LocalFileRecord) {
        let mut files = self.local_files.write().unwrap_or_else(|e| e.into_inner());
        files.insert((record.id, record.scope_id), record);
    }

    /// Mark a file link as scheduled.
    pub fn insert_sync_setting(&self, record: FileSyncSettingsRecord) {
        let mut settings = self.sync_settings.write().unwrap_or_else(|e| e.into_inner());
        settings.insert(record.id, record);
    }
}

impl From<StoreSnapshot> for InMemoryFileStore {
    fn from(snapshot: StoreSnapshot) -> Self {
        let store = Self::new();
        for record in snapshot.local_files {
            store.insert_local_file(record);
        }
        for record in snapshot.sync_settings {
            store.insert_sync_setting(record);
        }
        store
    }
}

impl OfflineFileStore for InMemoryFileStore {
    fn local_file(&self, file_id: i64, scope_id: i64) -> Option<LocalFileRecord> {
        let files = self.local_files.read().unwrap_or_else(|e| e.into_inner());
        files.get(&(file_id, scope_id)).cloned()
    }

    fn sync_setting(&self, file_id: i64) -> Option<FileSyncSettingsRecord> {
        let settings = self.sync_settings.read().unwrap_or_else(|e| e.into_inner());
        settings.get(&file_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    #[test]
    fn local_files_are_keyed_by_file_and_scope() {
        let store = InMemoryFileStore::new();
        store.insert_local_file(LocalFileRecord {
            id: 10,
            scope_id: 1,
            created_date: Utc::now(),
            path: "/files/1/10_a.png".into(),
        });

        assert!(store.local_file(10, 1).is_some());
        assert!(store.local_file(10, 2).is_none());
        assert!(store.local_file(11, 1).is_none());
    }

    #[test]
    fn missing_snapshot_is_empty() {
        let dir = tempdir().unwrap();
        let snapshot = StoreSnapshot::load_from_path(dir.path().join("absent.json")).unwrap();
        assert!(snapshot.local_files.is_empty());
        assert!(snapshot.sync_settings.is_empty());
    }

    #[test]
    fn loads_snapshot_into_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(
            &path,
            r#"{
                "localFiles": [
                    {"id": 5, "scopeId": 1, "createdDate": "2024-01-02T03:04:05Z", "path": "/files/1/5_a.pdf"}
                ],
                "syncSettings": [{"id": 6, "scopeId": 1}]
            }"#,
        )
        .unwrap();

        let store = InMemoryFileStore::from(StoreSnapshot::load_from_path(&path).unwrap());
        assert_eq!(store.local_file(5, 1).unwrap().path, "/files/1/5_a.pdf");
        assert!(store.sync_setting(6).is_some());
        assert!(store.sync_setting(5).is_none());
    }

    #[test]
    fn reports_parse_errors_with_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "[").unwrap();

        let err = StoreSnapshot::load_from_path(&path).unwrap_err();
        assert!(matches!(err, SnapshotError::Parse { .. }));
        assert!(err.to_string().contains("store.json"));
    }
}
