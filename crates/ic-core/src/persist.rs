//! Persisted record: the saved-chart library and the active tab.
//!
//! The record is stored as one JSON string under a single key, wrapped in a
//! versioned envelope:
//!
//! ```json
//! {"state":{"savedCharts":[...],"currentTab":0},"version":0}
//! ```
//!
//! The live chart and the selection are never persisted.

use crate::model::{ActiveView, Chart};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub const PERSIST_VERSION: u32 = 0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub saved_charts: Vec<Chart>,
    #[serde(default)]
    pub current_tab: ActiveView,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    state: T,
    #[serde(default)]
    version: u32,
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("malformed persisted state: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported persisted version {0}")]
    Version(u32),
    #[error("storage unavailable: {0}")]
    Storage(String),
}

impl PersistedState {
    pub fn to_json(&self) -> Result<String, PersistError> {
        let envelope = Envelope {
            state: self,
            version: PERSIST_VERSION,
        };
        Ok(serde_json::to_string(&envelope)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PersistError> {
        let envelope: Envelope<PersistedState> = serde_json::from_str(json)?;
        if envelope.version != PERSIST_VERSION {
            return Err(PersistError::Version(envelope.version));
        }
        Ok(envelope.state)
    }

    /// Read the record under `key`. A missing or unreadable record yields
    /// the empty state; the latter is logged. An unparseable record is
    /// copied to [`backup_key`] first so the next save cannot destroy it.
    pub fn load(storage: &mut dyn KeyValueStore, key: &str) -> Self {
        let raw = match storage.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::default(),
            Err(e) => {
                log::warn!("could not read {key}: {e}");
                return Self::default();
            }
        };
        Self::from_json(&raw).unwrap_or_else(|e| {
            let backup = backup_key(key);
            log::warn!("discarding persisted state under {key} (kept as {backup}): {e}");
            if let Err(e) = storage.set(&backup, &raw) {
                log::warn!("could not back up {key}: {e}");
            }
            Self::default()
        })
    }

    pub fn save(&self, storage: &mut dyn KeyValueStore, key: &str) -> Result<(), PersistError> {
        storage.set(key, &self.to_json()?)
    }
}

/// Where [`PersistedState::load`] keeps a record it could not parse.
pub fn backup_key(key: &str) -> String {
    format!("{key}.bak")
}

// ─── Storage backends ────────────────────────────────────────────────────

/// String key-value storage (browser `localStorage`, or memory in tests).
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::NodeId;
    use crate::model::{Connection, Node};
    use pretty_assertions::assert_eq;

    fn sample() -> PersistedState {
        let a = NodeId::intern("p-a");
        let b = NodeId::intern("p-b");
        let mut chart = Chart::empty("chart-1".into(), "Me", 5);
        chart.nodes.push(Node::new(a, 1.0, 2.0, 3.0));
        chart.nodes.push(Node::new(b, 4.0, 5.0, 6.0));
        chart.connections.push(Connection::new(a, b));
        PersistedState {
            saved_charts: vec![chart],
            current_tab: ActiveView::Gallery,
        }
    }

    #[test]
    fn envelope_shape() {
        let json = PersistedState::default().to_json().unwrap();
        assert_eq!(json, r#"{"state":{"savedCharts":[],"currentTab":0},"version":0}"#);
    }

    #[test]
    fn storage_roundtrip() {
        let mut storage = MemoryStorage::new();
        let state = sample();
        state.save(&mut storage, "k").unwrap();
        assert_eq!(PersistedState::load(&mut storage, "k"), state);
    }

    #[test]
    fn missing_or_malformed_record_is_empty() {
        let mut storage = MemoryStorage::new();
        assert_eq!(PersistedState::load(&mut storage, "k"), PersistedState::default());
        assert_eq!(storage.get(&backup_key("k")).unwrap(), None);
        storage.set("k", "{not json").unwrap();
        assert_eq!(PersistedState::load(&mut storage, "k"), PersistedState::default());
    }

    #[test]
    fn unreadable_record_survives_next_save() {
        let mut storage = MemoryStorage::new();
        let broken = r#"{"state":{"savedCharts":[{"id":"c","nodes":"oops"}]},"version":0}"#;
        storage.set("k", broken).unwrap();

        let state = PersistedState::load(&mut storage, "k");
        assert_eq!(state, PersistedState::default());
        state.save(&mut storage, "k").unwrap();

        assert_eq!(storage.get("k.bak").unwrap().as_deref(), Some(broken));
        assert_eq!(PersistedState::load(&mut storage, "k"), PersistedState::default());
    }

    #[test]
    fn unknown_version_rejected() {
        let err = PersistedState::from_json(r#"{"state":{},"version":3}"#).unwrap_err();
        assert!(matches!(err, PersistError::Version(3)));
    }

    #[test]
    fn legacy_node_fields_default() {
        let json = r##"{"state":{"savedCharts":[{"id":"c","title":"t","createdAt":1,"lastModified":2,
            "nodes":[{"id":"n1","x":10,"y":20,"radius":30,"color":"#fff","title":"T","lines":["a"],"fontSize":14}],
            "connections":[]}],"currentTab":1},"version":0}"##;
        let state = PersistedState::from_json(json).unwrap();
        let node = &state.saved_charts[0].nodes[0];
        assert_eq!(node.opacity, 1.0);
        assert_eq!(node.image, None);
        assert_eq!(node.image_transform().size, 1.0);
        assert_eq!(state.current_tab, ActiveView::Gallery);
    }
}
