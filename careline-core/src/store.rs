//! In-memory message store
//!
//! Holds the tagged message sequence for one derivation pass. The store is
//! read-only once loaded; every derived structure borrows from it.
//!
//! Loading is lenient at message granularity: an array element that cannot
//! be read as a [`Message`] (missing `id`, `sender_role` or `message`) is
//! skipped with a warning. Only a missing file or a document that is not a JSON array fails
//! the whole load.

use crate::error::{Error, Result};
use crate::types::Message;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Loaded message sequence with an id index.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    index: HashMap<i64, usize>,
    skipped: usize,
}

impl MessageStore {
    /// Build a store from already-parsed messages, preserving order.
    ///
    /// Ids should be unique. When they are not, lookups resolve to the first
    /// occurrence.
    pub fn new(messages: Vec<Message>) -> Self {
        let mut index = HashMap::with_capacity(messages.len());
        for (pos, msg) in messages.iter().enumerate() {
            if index.contains_key(&msg.id) {
                tracing::warn!(message_id = msg.id, position = pos, "Duplicate message id");
                continue;
            }
            index.insert(msg.id, pos);
        }
        Self {
            messages,
            index,
            skipped: 0,
        }
    }

    /// Load a JSON array of messages from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&path.display().to_string(), &content)
    }

    /// Parse a JSON array of messages.
    ///
    /// `source_name` is only used in diagnostics.
    pub fn from_json_str(source_name: &str, json: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(json)?;
        let Value::Array(items) = document else {
            return Err(Error::Load {
                source_name: source_name.to_string(),
                message: "expected a JSON array of messages".to_string(),
            });
        };

        let mut messages = Vec::with_capacity(items.len());
        let mut skipped = 0;
        for (pos, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<Message>(item) {
                Ok(msg) => messages.push(msg),
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(
                        source = source_name,
                        position = pos,
                        error = %e,
                        "Skipping malformed message"
                    );
                }
            }
        }

        let mut store = Self::new(messages);
        store.skipped = skipped;
        tracing::debug!(
            source = source_name,
            loaded = store.len(),
            skipped,
            "Loaded messages"
        );
        Ok(store)
    }

    /// Write messages as a pretty JSON array.
    ///
    /// The file is written next to `path` and renamed into place so a reader
    /// never observes a partial file.
    pub fn save(messages: &[Message], path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(messages)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Messages in load order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Consume the store, returning its messages
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Look up a message by id
    pub fn get(&self, id: i64) -> Option<&Message> {
        self.index.get(&id).map(|&pos| &self.messages[pos])
    }

    /// Number of array elements dropped at load
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_malformed_entries() {
        let json = r#"[
            {"id": 1, "timestamp": "2025-01-13, 09:00 AM", "sender_name": "A", "sender_role": "Member", "message": "hello"},
            {"timestamp": "2025-01-13, 09:05 AM", "message": "no id"},
            {"id": 3, "sender_role": "Member", "message": 42},
            {"id": 4, "sender_role": "Member", "message": "fine"}
        ]"#;
        let store = MessageStore::from_json_str("test", json).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.skipped(), 2);
        assert_eq!(store.messages()[1].id, 4);
        assert_eq!(store.get(4).map(|m| m.message.as_str()), Some("fine"));
        assert!(store.get(3).is_none());
    }

    #[test]
    fn test_skips_entry_without_sender_role() {
        let json = r#"[
            {"id": 1, "sender_name": "A", "sender_role": "Concierge", "message": "hello"},
            {"id": 2, "sender_name": "B", "message": "who am I"}
        ]"#;
        let store = MessageStore::from_json_str("test", json).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.skipped(), 1);
        assert!(store.get(2).is_none());
    }

    #[test]
    fn test_rejects_non_array() {
        let err = MessageStore::from_json_str("test", r#"{"id": 1}"#).unwrap_err();
        assert!(matches!(err, Error::Load { .. }));

        let err = MessageStore::from_json_str("test", "[{").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_duplicate_ids_resolve_to_first() {
        let json = r#"[
            {"id": 1, "sender_role": "Member", "message": "first"},
            {"id": 1, "sender_role": "Member", "message": "second"}
        ]"#;
        let store = MessageStore::from_json_str("test", json).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).map(|m| m.message.as_str()), Some("first"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = MessageStore::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/messages.json");
        let json = r#"[{"id": 1, "sender_role": "Member", "message": "hi", "topic": "Travel", "linked_event_id": 9}]"#;
        let store = MessageStore::from_json_str("test", json).unwrap();

        MessageStore::save(store.messages(), &path).unwrap();
        let reloaded = MessageStore::load(&path).unwrap();
        assert_eq!(reloaded.messages(), store.messages());
        assert!(!path.with_extension("json.tmp").exists());
    }
}
