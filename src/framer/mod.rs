//! SSE stream framing.
//!
//! Turns a sequence of arbitrary-length text chunks into discrete
//! [`FramedRecord`]s. Stateless except for the in-progress record and a
//! trailing partial-line buffer, so feeding a stream split at any byte
//! boundary yields the same record sequence as feeding it whole.

mod record;

pub use record::{FramedRecord, DONE_SENTINEL};

use std::collections::HashMap;

use tracing::debug;

use crate::config::FramerConfig;
use crate::error::FramingError;

/// One classified line of an SSE stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// `event: <type>` declaration.
    Event(String),
    /// `data: <payload>` line.
    Data(String),
    /// `id: <id>` line.
    Id(String),
    /// `retry: <ms>` line.
    Retry(String),
    /// Any other `name: value` field.
    Field(String, String),
    /// Blank line: record boundary.
    Empty,
    /// Comment line (starts with `:`).
    Comment(String),
    /// The bare `[DONE]` sentinel.
    Done,
}

/// Classify a single SSE line.
pub fn parse_sse_line(line: &str) -> SseLine {
    if line.is_empty() {
        return SseLine::Empty;
    }
    if line == DONE_SENTINEL {
        return SseLine::Done;
    }
    if let Some(stripped) = line.strip_prefix(':') {
        return SseLine::Comment(stripped.trim().to_string());
    }
    match line.split_once(':') {
        Some(("event", rest)) => SseLine::Event(rest.trim().to_string()),
        Some(("data", rest)) => SseLine::Data(rest.strip_prefix(' ').unwrap_or(rest).to_string()),
        Some(("id", rest)) => SseLine::Id(rest.trim().to_string()),
        Some(("retry", rest)) => SseLine::Retry(rest.trim().to_string()),
        Some((name, rest)) => SseLine::Field(name.trim().to_string(), rest.trim().to_string()),
        // A line without a colon is a field name with an empty value.
        None => SseLine::Field(line.trim().to_string(), String::new()),
    }
}

/// Stateful SSE framer: accumulates lines and emits complete records at
/// block boundaries.
#[derive(Debug, Default)]
pub struct SseFramer {
    config: FramerConfig,
    current_id: Option<String>,
    current_event: Option<String>,
    data_lines: Vec<String>,
    retry: Option<u64>,
    metadata: HashMap<String, String>,
    accumulated: usize,
    /// Record exceeded the size limit; swallow its remaining lines until the
    /// next boundary.
    oversized: bool,
    /// Trailing partial line carried across chunk boundaries.
    partial: String,
}

impl SseFramer {
    pub fn new(config: FramerConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Feed one line (without its terminator).
    ///
    /// Returns `Ok(Some(record))` when the line completes a record,
    /// `Ok(None)` when the line was consumed, and a [`FramingError`] when
    /// the in-progress record exceeds the configured maximum size. The
    /// error is per-record: the framer recovers at the next boundary.
    pub fn feed_line(&mut self, line: &str) -> Result<Option<FramedRecord>, FramingError> {
        let parsed = parse_sse_line(line);

        if self.oversized {
            return match parsed {
                SseLine::Empty => {
                    self.oversized = false;
                    Ok(None)
                }
                _ => Ok(None),
            };
        }

        match parsed {
            SseLine::Done => {
                self.reset_record();
                Ok(Some(FramedRecord::stream_done()))
            }
            SseLine::Data(data) if data == DONE_SENTINEL => {
                self.reset_record();
                Ok(Some(FramedRecord::stream_done()))
            }
            SseLine::Event(name) => {
                self.grow(name.len())?;
                let mapped = self
                    .config
                    .event_type_mapping
                    .get(&name)
                    .cloned()
                    .unwrap_or(name);
                self.current_event = Some(mapped);
                Ok(None)
            }
            SseLine::Data(data) => {
                self.grow(data.len())?;
                self.data_lines.push(data);
                Ok(None)
            }
            SseLine::Id(id) => {
                self.grow(id.len())?;
                self.current_id = Some(id);
                Ok(None)
            }
            SseLine::Retry(raw) => match raw.parse::<u64>() {
                Ok(ms) => {
                    self.retry = Some(ms);
                    Ok(None)
                }
                Err(_) => {
                    debug!(value = %raw, "ignoring unparseable retry field");
                    Ok(None)
                }
            },
            SseLine::Field(name, value) => {
                if self.config.allow_custom_events && !name.is_empty() {
                    self.grow(name.len() + value.len())?;
                    self.metadata.insert(name, value);
                }
                Ok(None)
            }
            SseLine::Comment(_) => Ok(None),
            SseLine::Empty => Ok(self.emit_record()),
        }
    }

    /// Feed an arbitrary chunk of stream text. Complete lines are framed;
    /// a trailing partial line is buffered for the next chunk.
    pub fn feed_chunk(&mut self, text: &str) -> Vec<Result<FramedRecord, FramingError>> {
        self.partial.push_str(text);
        let mut out = Vec::new();

        while let Some(pos) = self.partial.find('\n') {
            let rest = self.partial.split_off(pos + 1);
            let mut line = std::mem::replace(&mut self.partial, rest);
            line.truncate(line.len() - 1);
            if line.ends_with('\r') {
                line.truncate(line.len() - 1);
            }
            match self.feed_line(&line) {
                Ok(Some(record)) => out.push(Ok(record)),
                Ok(None) => {}
                Err(e) => out.push(Err(e)),
            }
        }

        out
    }

    /// Flush at end of stream: the trailing partial line is fed once, then
    /// any pending record is emitted.
    pub fn finish(&mut self) -> Vec<Result<FramedRecord, FramingError>> {
        let mut out = Vec::new();
        if !self.partial.is_empty() {
            let line = std::mem::take(&mut self.partial);
            let line = line.strip_suffix('\r').unwrap_or(&line).to_string();
            match self.feed_line(&line) {
                Ok(Some(record)) => out.push(Ok(record)),
                Ok(None) => {}
                Err(e) => out.push(Err(e)),
            }
        }
        match self.feed_line("") {
            Ok(Some(record)) => out.push(Ok(record)),
            Ok(None) => {}
            Err(e) => out.push(Err(e)),
        }
        out
    }

    /// Reset all framing state, including the partial-line buffer.
    pub fn reset(&mut self) {
        self.reset_record();
        self.oversized = false;
        self.partial.clear();
    }

    fn emit_record(&mut self) -> Option<FramedRecord> {
        let record = FramedRecord {
            id: self.current_id.take(),
            event: self.current_event.take(),
            data: std::mem::take(&mut self.data_lines).join("\n"),
            retry: self.retry.take(),
            metadata: std::mem::take(&mut self.metadata),
        };
        self.accumulated = 0;
        // Blocks that yield neither data nor event are dropped silently.
        record.is_valid().then_some(record)
    }

    fn reset_record(&mut self) {
        self.current_id = None;
        self.current_event = None;
        self.data_lines.clear();
        self.retry = None;
        self.metadata.clear();
        self.accumulated = 0;
    }

    fn grow(&mut self, bytes: usize) -> Result<(), FramingError> {
        self.accumulated += bytes;
        if self.accumulated > self.config.max_event_size {
            let size = self.accumulated;
            self.reset_record();
            self.oversized = true;
            return Err(FramingError::RecordTooLarge {
                size,
                limit: self.config.max_event_size,
            });
        }
        Ok(())
    }
}
