//! Key-value properties store for small persisted state.
//!
//! Holds the per-week schedule stores, the published-message bookkeeping,
//! and the poll cursor, namespaced by week key or a fixed pointer key. The
//! default implementation persists the whole map as one pretty-printed JSON
//! file, loaded on startup and rewritten on every mutation.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::types::{PublishedMessageSet, WeekStore};

/// Key for the poll cursor of one channel.
pub fn cursor_key(channel_id: &str) -> String {
    format!("poll:cursor:{}", channel_id)
}

/// Key for the week store of one week key.
pub fn week_store_key(week_key: &str) -> String {
    format!("sched:{}", week_key)
}

/// Key for the published-message set of one week key.
pub fn board_key(week_key: &str) -> String {
    format!("board:{}", week_key)
}

/// Key for the list of weeks still awaiting a board publish.
pub fn pending_publish_key() -> &'static str {
    "publish:pending"
}

/// Small persisted string-keyed store. Values are JSON.
pub trait PropsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Typed helpers over the raw store.
pub trait PropsStoreExt: PropsStore {
    fn get_week_store(&self, week_key: &str) -> WeekStore {
        self.get(&week_store_key(week_key))
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    fn put_week_store(&self, week_key: &str, store: &WeekStore) -> Result<()> {
        self.set(&week_store_key(week_key), serde_json::to_value(store)?)
    }

    fn get_board(&self, week_key: &str) -> PublishedMessageSet {
        self.get(&board_key(week_key))
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    fn put_board(&self, week_key: &str, set: &PublishedMessageSet) -> Result<()> {
        self.set(&board_key(week_key), serde_json::to_value(set)?)
    }

    fn get_cursor(&self, channel_id: &str) -> Option<String> {
        self.get(&cursor_key(channel_id))
            .and_then(|v| v.as_str().map(|s| s.to_string()))
    }

    fn put_cursor(&self, channel_id: &str, message_id: &str) -> Result<()> {
        self.set(&cursor_key(channel_id), Value::String(message_id.to_string()))
    }

    fn get_pending_weeks(&self) -> Vec<String> {
        self.get(pending_publish_key())
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    fn put_pending_weeks(&self, weeks: &[String]) -> Result<()> {
        self.set(pending_publish_key(), serde_json::to_value(weeks)?)
    }
}

impl<T: PropsStore + ?Sized> PropsStoreExt for T {}

/// JSON-file-backed properties store.
#[derive(Debug)]
pub struct FileProps {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, Value>>,
}

impl FileProps {
    /// Load from `path`, starting empty if the file is missing or corrupt.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<BTreeMap<String, Value>>(&contents) {
                Ok(map) => {
                    tracing::debug!("Loaded {} props from {:?}", map.len(), path);
                    map
                }
                Err(e) => {
                    tracing::warn!("Failed to parse props file {:?}: {}", path, e);
                    BTreeMap::new()
                }
            },
            Err(_) => {
                tracing::info!("No props file at {:?}, starting empty", path);
                BTreeMap::new()
            }
        };
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn persist(&self, entries: &BTreeMap<String, Value>) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("writing props file {:?}", self.path))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("props lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PropsStore for FileProps {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().expect("props lock").get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.lock().expect("props lock");
        entries.insert(key.to_string(), value);
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().expect("props lock");
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryProps {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryProps {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PropsStore for MemoryProps {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().expect("props lock").get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries
            .lock()
            .expect("props lock")
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().expect("props lock").remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScheduledEntry;

    #[test]
    fn test_memory_round_trip() {
        let props = MemoryProps::new();
        let mut store = WeekStore::default();
        store.schedule.insert(
            WeekStore::row_key(2),
            ScheduledEntry {
                when_text: "9:00 PM ET 9/28".to_string(),
                epoch_seconds: Some(1_759_107_600),
                home: "FALCONS".to_string(),
                away: "WOLVES".to_string(),
            },
        );

        props.put_week_store("2025-09-28|harbor", &store).unwrap();
        let loaded = props.get_week_store("2025-09-28|harbor");
        assert_eq!(loaded, store);

        // Unknown keys come back as an empty store, not an error.
        let empty = props.get_week_store("2025-10-05|depot");
        assert!(empty.schedule.is_empty());
    }

    #[test]
    fn test_cursor_round_trip() {
        let props = MemoryProps::new();
        assert_eq!(props.get_cursor("42"), None);
        props.put_cursor("42", "100200300").unwrap();
        assert_eq!(props.get_cursor("42"), Some("100200300".to_string()));
    }

    #[test]
    fn test_pending_weeks_round_trip() {
        let props = MemoryProps::new();
        assert!(props.get_pending_weeks().is_empty());

        let weeks = vec!["2025-09-28|harbor".to_string(), "2025-10-05|depot".to_string()];
        props.put_pending_weeks(&weeks).unwrap();
        assert_eq!(props.get_pending_weeks(), weeks);

        props.put_pending_weeks(&[]).unwrap();
        assert!(props.get_pending_weeks().is_empty());
    }

    #[test]
    fn test_file_props_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("props.json");

        let props = FileProps::load_from(&path);
        props
            .set(
                "board:2025-09-28|harbor",
                serde_json::json!({"headerMessageId": "77"}),
            )
            .unwrap();
        drop(props);

        let reloaded = FileProps::load_from(&path);
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.get("board:2025-09-28|harbor").is_some());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("props.json");
        std::fs::write(&path, "{not json").unwrap();
        let props = FileProps::load_from(&path);
        assert!(props.is_empty());
    }
}
