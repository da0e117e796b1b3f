//! Shared types for dockstream
//!
//! This crate contains data structures passed between the stream decoder and
//! downstream pipeline stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Metadata key under which the source container identifier is injected.
pub const CONTAINER_ID_KEY: &str = "containerid";

/// Tag attached to events whose timestamp prefix could not be decoded.
pub const TAG_DECODE_FAILED: &str = "decode_failed";

/// Arbitrary key/value metadata attached to every event from one stream.
pub type ExtraMap = HashMap<String, Value>;

/// A single decoded log event
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogEvent {
    /// Parsed line timestamp, or the decode-time clock when no prefix parsed
    pub timestamp: DateTime<Utc>,

    /// Line content with the timestamp prefix stripped and whitespace trimmed
    pub message: String,

    /// Caller-supplied metadata plus the injected container identifier
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: ExtraMap,

    /// Markers such as [`TAG_DECODE_FAILED`]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl LogEvent {
    /// Create a new event with no metadata or tags
    pub fn new(timestamp: DateTime<Utc>, message: String) -> Self {
        Self {
            timestamp,
            message,
            extra: ExtraMap::new(),
            tags: Vec::new(),
        }
    }

    /// Add a tag unless it is already present
    pub fn add_tag(&mut self, tag: &str) {
        if !self.tags.iter().any(|t| t == tag) {
            self.tags.push(tag.to_string());
        }
    }

    /// Check whether a tag is present
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Get the injected source container identifier (if any)
    pub fn container_id(&self) -> Option<&str> {
        self.extra.get(CONTAINER_ID_KEY).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_tag_deduplicates() {
        let mut event = LogEvent::new(Utc::now(), "msg".to_string());
        event.add_tag(TAG_DECODE_FAILED);
        event.add_tag(TAG_DECODE_FAILED);
        assert_eq!(event.tags, vec![TAG_DECODE_FAILED.to_string()]);
        assert!(event.has_tag(TAG_DECODE_FAILED));
    }

    #[test]
    fn test_container_id_lookup() {
        let mut event = LogEvent::new(Utc::now(), "msg".to_string());
        assert_eq!(event.container_id(), None);
        event
            .extra
            .insert(CONTAINER_ID_KEY.to_string(), Value::String("abc123".into()));
        assert_eq!(event.container_id(), Some("abc123"));
    }

    #[test]
    fn test_serialized_event_omits_empty_fields() {
        let event = LogEvent::new(Utc::now(), "msg".to_string());
        let json = serde_json::to_value(&event).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("timestamp"));
        assert!(obj.contains_key("message"));
        assert!(!obj.contains_key("extra"));
        assert!(!obj.contains_key("tags"));
    }
}
