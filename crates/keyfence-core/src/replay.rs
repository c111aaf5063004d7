//! Key-event recording and deterministic replay.
//!
//! [`KeyRecorder`] captures dispatched key events together with their
//! consumed outcome; [`KeyScript`] is the serializable form used to
//! reproduce routing bugs and to drive integration tests.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::KeyfenceResult;
use crate::input::{KeyChord, KeyEvent};

// ─── Key Record ──────────────────────────────────────────────────────────────

/// A recorded key press with its offset from the start of recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Time offset from the start of recording, in milliseconds.
    pub offset_ms: u64,
    /// The key chord in stable text encoding.
    pub key: KeyChord,
    /// Whether the router consumed the event (absent in hand-written scripts).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed: Option<bool>,
}

impl KeyRecord {
    /// Offset as a `Duration`.
    #[must_use]
    pub const fn offset(&self) -> Duration {
        Duration::from_millis(self.offset_ms)
    }

    /// A fresh, unconsumed event for this record.
    #[must_use]
    pub fn to_event(&self) -> KeyEvent {
        KeyEvent::from(self.key)
    }
}

// ─── Key Script ──────────────────────────────────────────────────────────────

/// An ordered list of key records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyScript {
    records: Vec<KeyRecord>,
}

impl KeyScript {
    /// Build a script from records.
    #[must_use]
    pub const fn new(records: Vec<KeyRecord>) -> Self {
        Self { records }
    }

    /// Parse a whitespace-separated list of chords, e.g. `"Down ctrl+f w Enter"`.
    ///
    /// All offsets are zero.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` for the first chord that fails to parse.
    pub fn parse_compact(text: &str) -> KeyfenceResult<Self> {
        let records = text
            .split_whitespace()
            .map(|token| -> KeyfenceResult<KeyRecord> {
                Ok(KeyRecord {
                    offset_ms: 0,
                    key: token.parse()?,
                    consumed: None,
                })
            })
            .collect::<KeyfenceResult<Vec<_>>>()?;
        Ok(Self { records })
    }

    /// Decode a JSON script.
    ///
    /// # Errors
    ///
    /// Returns `Replay` if the JSON is malformed or a chord is invalid.
    pub fn from_json(json: &str) -> KeyfenceResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `Replay` if serialization fails.
    pub fn to_json(&self) -> KeyfenceResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The records in order.
    #[must_use]
    pub fn records(&self) -> &[KeyRecord] {
        &self.records
    }

    /// Fresh events in order.
    pub fn events(&self) -> impl Iterator<Item = KeyEvent> + '_ {
        self.records.iter().map(KeyRecord::to_event)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the script is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ─── Key Recorder ────────────────────────────────────────────────────────────

/// Records dispatched key events for later replay.
#[derive(Debug, Default)]
pub struct KeyRecorder {
    records: Vec<KeyRecord>,
    start: Option<Instant>,
}

impl KeyRecorder {
    /// Create an idle recorder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
            start: None,
        }
    }

    /// Start a fresh recording at `now`.
    pub fn start(&mut self, now: Instant) {
        self.records.clear();
        self.start = Some(now);
    }

    /// Stop recording and return the script.
    pub fn stop(&mut self) -> KeyScript {
        self.start = None;
        KeyScript::new(std::mem::take(&mut self.records))
    }

    /// Whether recording is in progress.
    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.start.is_some()
    }

    /// Record a dispatched event (ignored while idle).
    pub fn record(&mut self, event: &KeyEvent, now: Instant) {
        let Some(start) = self.start else {
            return;
        };
        let offset = now.saturating_duration_since(start);
        self.records.push(KeyRecord {
            offset_ms: u64::try_from(offset.as_millis()).unwrap_or(u64::MAX),
            key: event.chord(),
            consumed: Some(event.consumed),
        });
    }

    /// Number of records so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
