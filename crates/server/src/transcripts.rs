//! Per-call transcript collection
//!
//! Caller and agent lines are collected per call id and exposed over the
//! HTTP endpoints; a broadcast channel drives the live update feed.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Who said a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Caller,
    Agent,
}

/// One transcript line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Transcript store keyed by call id
pub struct TranscriptStore {
    calls: DashMap<String, Vec<TranscriptLine>>,
    updates: broadcast::Sender<String>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(64);
        Self {
            calls: DashMap::new(),
            updates,
        }
    }

    /// Register a call so it shows up in listings before any line lands
    pub fn ensure(&self, call_sid: &str) {
        self.calls.entry(call_sid.to_string()).or_default();
        let _ = self.updates.send(call_sid.to_string());
    }

    /// Append a line and notify subscribers
    pub fn append(&self, call_sid: &str, speaker: Speaker, text: impl Into<String>) {
        let line = TranscriptLine {
            speaker,
            text: text.into(),
            timestamp: Utc::now(),
        };
        self.calls
            .entry(call_sid.to_string())
            .or_default()
            .push(line);
        let _ = self.updates.send(call_sid.to_string());
    }

    /// Lines for one call
    pub fn get(&self, call_sid: &str) -> Option<Vec<TranscriptLine>> {
        self.calls.get(call_sid).map(|lines| lines.clone())
    }

    /// All known call ids
    pub fn list(&self) -> Vec<String> {
        self.calls.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Subscribe to change notifications (payload = changed call id)
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.updates.subscribe()
    }

    /// Full store as JSON, the shape pushed over the update feed
    pub fn snapshot(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for entry in self.calls.iter() {
            map.insert(
                entry.key().clone(),
                serde_json::to_value(entry.value()).unwrap_or_default(),
            );
        }
        serde_json::Value::Object(map)
    }
}

impl Default for TranscriptStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_get() {
        let store = TranscriptStore::new();
        store.append("CA1", Speaker::Caller, "hello");
        store.append("CA1", Speaker::Agent, "hi there");

        let lines = store.get("CA1").unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].speaker, Speaker::Caller);
        assert_eq!(lines[1].text, "hi there");

        assert!(store.get("CA2").is_none());
    }

    #[test]
    fn test_ensure_registers_empty_call() {
        let store = TranscriptStore::new();
        store.ensure("CA1");

        assert_eq!(store.list(), vec!["CA1".to_string()]);
        assert!(store.get("CA1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_updates_broadcast() {
        let store = TranscriptStore::new();
        let mut updates = store.subscribe();

        store.append("CA7", Speaker::Caller, "line");
        assert_eq!(updates.recv().await.unwrap(), "CA7");
    }

    #[test]
    fn test_snapshot_shape() {
        let store = TranscriptStore::new();
        store.append("CA1", Speaker::Agent, "welcome");

        let snapshot = store.snapshot();
        assert_eq!(snapshot["CA1"][0]["speaker"], "agent");
        assert_eq!(snapshot["CA1"][0]["text"], "welcome");
    }
}
