use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::model::{CurrentAnime, HistoryEntry, Settings, TrackingItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    WatchHistory,
    TrackingList,
    Settings,
    CurrentAnime,
}

impl StoreKey {
    pub const ALL: [StoreKey; 4] = [
        Self::WatchHistory,
        Self::TrackingList,
        Self::Settings,
        Self::CurrentAnime,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::WatchHistory => "watchHistory",
            Self::TrackingList => "trackingList",
            Self::Settings => "settings",
            Self::CurrentAnime => "currentAnime",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend failed: {0}")]
    Backend(#[from] rusqlite::Error),
    #[error("value stored under `{key}` is malformed: {source}")]
    Corrupt {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot encode value for `{key}`: {source}")]
    Encode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Keyed JSON store. A `set` fully replaces the value at its key; there are
/// no cross-key transactions, so callers keep one read-modify-write per key.
pub trait Store: Send {
    fn get(&self, key: StoreKey) -> Result<Option<Value>, StoreError>;
    fn set(&self, key: StoreKey, value: Value) -> Result<(), StoreError>;
}

pub fn load<T: DeserializeOwned>(store: &dyn Store, key: StoreKey) -> Result<Option<T>, StoreError> {
    match store.get(key)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                key: key.as_str(),
                source,
            }),
    }
}

pub fn save<T: Serialize>(store: &dyn Store, key: StoreKey, value: &T) -> Result<(), StoreError> {
    let encoded = serde_json::to_value(value).map_err(|source| StoreError::Encode {
        key: key.as_str(),
        source,
    })?;
    store.set(key, encoded)
}

pub fn load_history(store: &dyn Store) -> Result<Vec<HistoryEntry>, StoreError> {
    Ok(load(store, StoreKey::WatchHistory)?.unwrap_or_default())
}

pub fn load_tracking(store: &dyn Store) -> Result<Vec<TrackingItem>, StoreError> {
    Ok(load(store, StoreKey::TrackingList)?.unwrap_or_default())
}

pub fn load_settings(store: &dyn Store) -> Result<Settings, StoreError> {
    Ok(load(store, StoreKey::Settings)?.unwrap_or_default())
}

pub fn load_current(store: &dyn Store) -> Result<Option<CurrentAnime>, StoreError> {
    load(store, StoreKey::CurrentAnime)
}

/// First-run initialization: only keys that are missing get a value.
pub fn ensure_defaults(store: &dyn Store) -> Result<(), StoreError> {
    if store.get(StoreKey::WatchHistory)?.is_none() {
        store.set(StoreKey::WatchHistory, Value::Array(Vec::new()))?;
    }
    if store.get(StoreKey::TrackingList)?.is_none() {
        store.set(StoreKey::TrackingList, Value::Array(Vec::new()))?;
    }
    if store.get(StoreKey::Settings)?.is_none() {
        save(store, StoreKey::Settings, &Settings::default())?;
    }
    Ok(())
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn migrate(&self) -> anyhow::Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl Store for Database {
    fn get(&self, key: StoreKey) -> Result<Option<Value>, StoreError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|raw| {
            serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                key: key.as_str(),
                source,
            })
        })
        .transpose()
    }

    fn set(&self, key: StoreKey, value: Value) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key.as_str(), value.to_string(), now],
        )?;
        Ok(())
    }
}

/// Shared in-process store; clones see the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<StoreKey, Value>>>,
    #[cfg(test)]
    fail_writes: Arc<std::sync::atomic::AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies every key of `source`; later writes never reach it.
    pub fn snapshot_of(source: &dyn Store) -> Result<Self, StoreError> {
        let copy = Self::new();
        for key in StoreKey::ALL {
            if let Some(value) = source.get(key)? {
                copy.set(key, value)?;
            }
        }
        Ok(copy)
    }

    #[cfg(test)]
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Store for MemoryStore {
    fn get(&self, key: StoreKey) -> Result<Option<Value>, StoreError> {
        let values = self
            .values
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        Ok(values.get(&key).cloned())
    }

    fn set(&self, key: StoreKey, value: Value) -> Result<(), StoreError> {
        #[cfg(test)]
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!(
                "write to `{}` rejected",
                key.as_str()
            )));
        }
        let mut values = self
            .values
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        values.insert(key, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sqlite_store_round_trips_and_replaces_values() {
        let db = Database::open_in_memory().expect("open db");
        db.migrate().expect("migrate");

        assert!(db.get(StoreKey::TrackingList).expect("get").is_none());
        db.set(StoreKey::TrackingList, json!([{"id": "a"}]))
            .expect("first set");
        db.set(StoreKey::TrackingList, json!([])).expect("second set");
        assert_eq!(
            db.get(StoreKey::TrackingList).expect("get"),
            Some(json!([]))
        );
    }

    #[test]
    fn sqlite_store_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("anitracker.db");
        {
            let db = Database::open(&path).expect("open db");
            db.migrate().expect("migrate");
            ensure_defaults(&db).expect("defaults");
        }
        let db = Database::open(&path).expect("reopen db");
        db.migrate().expect("migrate again");
        let settings = load_settings(&db).expect("settings");
        assert_eq!(settings, Settings::default());
        assert!(load_history(&db).expect("history").is_empty());
    }

    #[test]
    fn ensure_defaults_keeps_existing_settings() {
        let store = MemoryStore::new();
        let custom = Settings {
            auto_update_progress: false,
            show_notifications: false,
            max_history_items: 50,
        };
        save(&store, StoreKey::Settings, &custom).expect("save settings");
        ensure_defaults(&store).expect("defaults");
        assert_eq!(load_settings(&store).expect("settings"), custom);
        assert_eq!(store.get(StoreKey::WatchHistory).expect("get"), Some(json!([])));
    }

    #[test]
    fn corrupt_value_surfaces_as_distinct_error() {
        let store = MemoryStore::new();
        store
            .set(StoreKey::TrackingList, json!({"not": "a list"}))
            .expect("set");
        let err = load_tracking(&store).expect_err("object is not a tracking list");
        assert!(matches!(err, StoreError::Corrupt { key: "trackingList", .. }));
    }

    #[test]
    fn snapshot_copy_is_detached_from_its_source() {
        let source = MemoryStore::new();
        source
            .set(StoreKey::TrackingList, json!([]))
            .expect("seed tracking");
        let copy = MemoryStore::snapshot_of(&source).expect("snapshot");
        assert_eq!(copy.get(StoreKey::TrackingList).expect("get"), Some(json!([])));
        assert_eq!(copy.get(StoreKey::Settings).expect("get"), None);

        copy.set(StoreKey::Settings, json!({"maxHistoryItems": 5}))
            .expect("write copy");
        assert_eq!(source.get(StoreKey::Settings).expect("get"), None);
    }

    #[test]
    fn rejected_write_is_reported_to_the_caller() {
        let store = MemoryStore::new();
        store.fail_writes(true);
        let err = save(&store, StoreKey::Settings, &Settings::default())
            .expect_err("write should fail");
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
