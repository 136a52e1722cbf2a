use std::path::{Path, PathBuf};

use axum::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::entries::repo_types::{MacroGoals, ResolvedFoodEntry};

pub const ENTRIES_KEY: &str = "foodEntries";
pub const GOALS_KEY: &str = "macroGoals";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence for the entry log and the goal value.
///
/// `append` is atomic with respect to other calls on the same store:
/// concurrent appends never drop each other's entries.
#[async_trait]
pub trait EntryStore: Send + Sync {
    async fn append(&self, entry: ResolvedFoodEntry) -> Result<(), StoreError>;
    async fn list(&self) -> Result<Vec<ResolvedFoodEntry>, StoreError>;
    /// Stored goal, or [`MacroGoals::default`] when none was ever saved.
    async fn goal(&self) -> Result<MacroGoals, StoreError>;
    async fn replace_goal(&self, goal: MacroGoals) -> Result<(), StoreError>;
    /// Drop entries stamped before `cutoff`; returns how many were removed.
    async fn prune_before(&self, cutoff: OffsetDateTime) -> Result<usize, StoreError>;
}

/// JSON files under a data directory, one per key.
pub struct FileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    async fn read_key<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write through a temp file and rename, so readers see either the old
    /// or the new value and a failed write leaves the old one in place.
    async fn write_key<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(value)?;
        let path = self.path(key);
        let tmp = temp_path(&path);
        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait]
impl EntryStore for FileStore {
    async fn append(&self, entry: ResolvedFoodEntry) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut entries: Vec<ResolvedFoodEntry> =
            self.read_key(ENTRIES_KEY).await?.unwrap_or_default();
        entries.push(entry);
        self.write_key(ENTRIES_KEY, &entries).await?;
        debug!(count = entries.len(), "entry appended");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ResolvedFoodEntry>, StoreError> {
        Ok(self.read_key(ENTRIES_KEY).await?.unwrap_or_default())
    }

    async fn goal(&self) -> Result<MacroGoals, StoreError> {
        Ok(self.read_key(GOALS_KEY).await?.unwrap_or_default())
    }

    async fn replace_goal(&self, goal: MacroGoals) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.write_key(GOALS_KEY, &goal).await
    }

    async fn prune_before(&self, cutoff: OffsetDateTime) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut entries: Vec<ResolvedFoodEntry> =
            self.read_key(ENTRIES_KEY).await?.unwrap_or_default();
        let before = entries.len();
        entries.retain(|e| e.timestamp >= cutoff);
        let removed = before - entries.len();
        if removed > 0 {
            self.write_key(ENTRIES_KEY, &entries).await?;
        }
        Ok(removed)
    }
}

/// Process-local store; nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<Vec<ResolvedFoodEntry>>,
    goal: RwLock<Option<MacroGoals>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn append(&self, entry: ResolvedFoodEntry) -> Result<(), StoreError> {
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ResolvedFoodEntry>, StoreError> {
        Ok(self.entries.read().await.clone())
    }

    async fn goal(&self) -> Result<MacroGoals, StoreError> {
        Ok(self.goal.read().await.unwrap_or_default())
    }

    async fn replace_goal(&self, goal: MacroGoals) -> Result<(), StoreError> {
        *self.goal.write().await = Some(goal);
        Ok(())
    }

    async fn prune_before(&self, cutoff: OffsetDateTime) -> Result<usize, StoreError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| e.timestamp >= cutoff);
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod storage_tests {
    use super::*;
    use crate::nutrition::Source;
    use std::sync::Arc;
    use time::macros::datetime;
    use uuid::Uuid;

    fn entry(description: &str, timestamp: OffsetDateTime) -> ResolvedFoodEntry {
        ResolvedFoodEntry {
            id: Uuid::new_v4(),
            description: description.into(),
            calories: 100.0,
            protein: 1.0,
            carbs: 2.0,
            fat: 3.0,
            confidence: 1.0,
            source: Source::Local,
            timestamp,
        }
    }

    async fn exercise(store: Arc<dyn EntryStore>) {
        assert!(store.list().await.unwrap().is_empty());
        assert_eq!(store.goal().await.unwrap(), MacroGoals::default());

        store.append(entry("old", datetime!(2024-12-01 10:00 UTC))).await.unwrap();
        store.append(entry("new", datetime!(2024-12-10 10:00 UTC))).await.unwrap();
        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].description, "old");

        let goal = MacroGoals {
            calories: 1800.0,
            protein: 120.0,
            carbs: 200.0,
            fat: 60.0,
        };
        store.replace_goal(goal).await.unwrap();
        assert_eq!(store.goal().await.unwrap(), goal);

        let removed = store.prune_before(datetime!(2024-12-05 00:00 UTC)).await.unwrap();
        assert_eq!(removed, 1);
        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].description, "new");
    }

    async fn concurrent_appends(store: Arc<dyn EntryStore>) {
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append(entry(&format!("meal {i}"), datetime!(2024-12-10 10:00 UTC)))
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.list().await.unwrap().len(), 32);
    }

    #[tokio::test]
    async fn memory_store_contract() {
        exercise(Arc::new(MemoryStore::new())).await;
        concurrent_appends(Arc::new(MemoryStore::new())).await;
    }

    #[tokio::test]
    async fn file_store_contract() {
        let dir = tempfile::tempdir().unwrap();
        exercise(Arc::new(FileStore::open(dir.path()).await.unwrap())).await;
    }

    #[tokio::test]
    async fn file_store_concurrent_appends_keep_every_entry() {
        let dir = tempfile::tempdir().unwrap();
        concurrent_appends(Arc::new(FileStore::open(dir.path()).await.unwrap())).await;
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).await.unwrap();
            store.append(entry("kept", datetime!(2024-12-10 10:00 UTC))).await.unwrap();
        }
        let store = FileStore::open(dir.path()).await.unwrap();
        assert_eq!(store.list().await.unwrap()[0].description, "kept");
        assert!(dir.path().join("foodEntries.json").exists());
        assert!(!dir.path().join("foodEntries.json.tmp").exists());
    }

    #[tokio::test]
    async fn file_store_keeps_legacy_ids_stable_and_persists_them() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("foodEntries.json"),
            r#"[{"description":"dosa","calories":133,"protein":3.5,"carbs":25.2,"fat":2.1,
                "confidence":0.9,"source":"ai","timestamp":"2024-12-10T08:00:00Z"}]"#,
        )
        .unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        let first = store.list().await.unwrap()[0].id;
        assert_eq!(store.list().await.unwrap()[0].id, first);

        store.append(entry("new", datetime!(2024-12-10 10:00 UTC))).await.unwrap();
        let raw = std::fs::read_to_string(dir.path().join("foodEntries.json")).unwrap();
        assert!(raw.contains(&first.to_string()));
        assert_eq!(store.list().await.unwrap()[0].id, first);
    }

    #[tokio::test]
    async fn file_store_reports_corrupt_data() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("foodEntries.json"), b"{not json").unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        assert!(matches!(store.list().await, Err(StoreError::Serde(_))));
        let err = store
            .append(entry("x", datetime!(2024-12-10 10:00 UTC)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Serde(_)));
        // the unreadable file is left untouched
        assert_eq!(
            std::fs::read(dir.path().join("foodEntries.json")).unwrap(),
            b"{not json"
        );
    }
}
