//! Registry persistence in a single JSON file.
//!
//! Every save writes the whole document to a sibling temp file and renames it
//! over the target, so a crash mid-write leaves the previous copy intact.

use middleman_core::error::PlatformError;
use middleman_core::providers::{RegistryStore, Result};
use middleman_core::registry::RegistrySnapshot;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// [`RegistryStore`] backed by a JSON file.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store at `path`. Nothing is touched until the first load or save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Target file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn storage(context: &str, err: impl std::fmt::Display) -> PlatformError {
    PlatformError::Storage(format!("{context}: {err}"))
}

impl RegistryStore for JsonFileStore {
    async fn load(&self) -> Result<RegistrySnapshot> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(RegistrySnapshot::default()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| storage("parse registry", e)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No registry file yet, starting empty");
                Ok(RegistrySnapshot::default())
            }
            Err(e) => Err(storage("read registry", e)),
        }
    }

    async fn save(&self, snapshot: &RegistrySnapshot) -> Result<()> {
        let json = serde_json::to_vec_pretty(snapshot).map_err(|e| storage("encode registry", e))?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| storage("create data directory", e))?;
        }
        let temp = self.temp_path();
        tokio::fs::write(&temp, json)
            .await
            .map_err(|e| storage("write registry", e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| storage("replace registry", e))?;
        debug!(path = %self.path.display(), "Registry saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use middleman_core::ids::UserId;
    use middleman_core::model::{LeaderboardKind, MmBan};

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("db.json"));
        assert_eq!(store.load().await.unwrap(), RegistrySnapshot::default());
    }

    #[tokio::test]
    async fn save_replaces_whole_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("db.json"));

        let mut snapshot = RegistrySnapshot::default();
        snapshot.award_point(LeaderboardKind::Middleman, UserId::new(42));
        snapshot.mm_bans.push(MmBan {
            user_id: UserId::new(7),
            reason: "scam attempt".into(),
        });
        store.save(&snapshot).await.unwrap();
        assert_eq!(store.load().await.unwrap(), snapshot);
        assert!(!store.temp_path().exists());

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("mmLeaderboard"));
    }

    #[tokio::test]
    async fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = JsonFileStore::new(path).load().await.unwrap_err();
        assert!(matches!(err, PlatformError::Storage(_)));
    }
}
