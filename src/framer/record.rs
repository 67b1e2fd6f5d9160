//! Framed SSE record type.

use std::collections::HashMap;

/// The reserved end-of-stream sentinel literal.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One framed SSE record: the fields of a `field: value` block between two
/// blank lines. A record is valid only if `data` or `event` is non-empty;
/// empty blocks are dropped silently by the framer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FramedRecord {
    /// `id:` field, if present.
    pub id: Option<String>,
    /// `event:` field, after any configured alias remapping.
    pub event: Option<String>,
    /// `data:` lines joined with `\n`.
    pub data: String,
    /// `retry:` field, parsed as an integer.
    pub retry: Option<u64>,
    /// Unknown fields, stashed when custom fields are allowed.
    pub metadata: HashMap<String, String>,
}

impl FramedRecord {
    /// The synthetic record emitted for the `[DONE]` sentinel.
    pub fn stream_done() -> Self {
        Self {
            event: Some("stream_done".to_string()),
            data: DONE_SENTINEL.to_string(),
            ..Default::default()
        }
    }

    /// True when the record carries something worth normalizing.
    pub fn is_valid(&self) -> bool {
        !self.data.is_empty() || self.event.as_deref().is_some_and(|e| !e.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_record_invalid() {
        assert!(!FramedRecord::default().is_valid());
    }

    #[test]
    fn test_data_only_record_valid() {
        let record = FramedRecord {
            data: "{}".to_string(),
            ..Default::default()
        };
        assert!(record.is_valid());
    }

    #[test]
    fn test_event_only_record_valid() {
        let record = FramedRecord {
            event: Some("ping".to_string()),
            ..Default::default()
        };
        assert!(record.is_valid());
    }

    #[test]
    fn test_stream_done_shape() {
        let record = FramedRecord::stream_done();
        assert_eq!(record.event.as_deref(), Some("stream_done"));
        assert_eq!(record.data, DONE_SENTINEL);
        assert!(record.is_valid());
    }
}
