//! Speech channel contract.
//!
//! The core never synthesizes speech itself. It hands text to a [`Speech`]
//! implementation provided by the host and never waits for completion.
//! At most one utterance is "current"; a [`SpeechPriority::High`] utterance
//! may preempt a normal one.

use serde::{Deserialize, Serialize};

/// Urgency of an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechPriority {
    /// Regular feedback (cursor moves, match labels).
    Normal,
    /// Must be heard (errors, confirmations, mode changes).
    High,
}

/// Fire-and-forget speech output.
pub trait Speech {
    /// Queue `text` for speaking. Must not block.
    fn speak(&mut self, text: &str, priority: SpeechPriority);
}

// ─── Noop ────────────────────────────────────────────────────────────────────

/// Discards every utterance.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSpeech;

impl Speech for NoopSpeech {
    fn speak(&mut self, _text: &str, _priority: SpeechPriority) {}
}

// ─── Tracing ─────────────────────────────────────────────────────────────────

/// Emits every utterance as a `tracing` event under the `keyfence::speech` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSpeech;

impl Speech for TracingSpeech {
    fn speak(&mut self, text: &str, priority: SpeechPriority) {
        if text.trim().is_empty() {
            return;
        }
        tracing::info!(target: "keyfence::speech", ?priority, text, "speak");
    }
}

// ─── Recording ───────────────────────────────────────────────────────────────

/// A spoken line as seen by a [`RecordingSpeech`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    /// Text that was spoken.
    pub text: String,
    /// Priority it was spoken with.
    pub priority: SpeechPriority,
}

/// Records utterances in memory and models the single "current" slot.
///
/// A `High` utterance always becomes current. A `Normal` utterance becomes
/// current unless a `High` one is still playing (call
/// [`finish_current`](Self::finish_current) to simulate completion).
/// Every accepted utterance is appended to the history regardless.
#[derive(Debug, Clone, Default)]
pub struct RecordingSpeech {
    history: Vec<Utterance>,
    current: Option<Utterance>,
}

impl RecordingSpeech {
    /// Create an empty recorder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            history: Vec::new(),
            current: None,
        }
    }

    /// All utterances in order.
    #[must_use]
    pub fn history(&self) -> &[Utterance] {
        &self.history
    }

    /// Texts of all utterances in order.
    #[must_use]
    pub fn texts(&self) -> Vec<&str> {
        self.history.iter().map(|u| u.text.as_str()).collect()
    }

    /// The most recent utterance text.
    #[must_use]
    pub fn last_text(&self) -> Option<&str> {
        self.history.last().map(|u| u.text.as_str())
    }

    /// The utterance currently playing.
    #[must_use]
    pub const fn current(&self) -> Option<&Utterance> {
        self.current.as_ref()
    }

    /// Mark the current utterance as finished.
    pub fn finish_current(&mut self) {
        self.current = None;
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.history.clear();
        self.current = None;
    }

    /// Whether any utterance contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.history.iter().any(|u| u.text.contains(needle))
    }
}

impl Speech for RecordingSpeech {
    fn speak(&mut self, text: &str, priority: SpeechPriority) {
        if text.trim().is_empty() {
            return;
        }
        let utterance = Utterance {
            text: text.to_string(),
            priority,
        };
        let preempts = match &self.current {
            Some(current) => priority >= current.priority,
            None => true,
        };
        if preempts {
            self.current = Some(utterance.clone());
        }
        self.history.push(utterance);
    }
}

impl<S: Speech + ?Sized> Speech for Box<S> {
    fn speak(&mut self, text: &str, priority: SpeechPriority) {
        (**self).speak(text, priority);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_keeps_history_in_order() {
        let mut speech = RecordingSpeech::new();
        speech.speak("one", SpeechPriority::Normal);
        speech.speak("two", SpeechPriority::High);
        assert_eq!(speech.texts(), vec!["one", "two"]);
        assert_eq!(speech.last_text(), Some("two"));
        assert!(speech.contains("tw"));
    }

    #[test]
    fn high_preempts_normal() {
        let mut speech = RecordingSpeech::new();
        speech.speak("moving", SpeechPriority::Normal);
        speech.speak("error", SpeechPriority::High);
        assert_eq!(speech.current().unwrap().text, "error");
    }

    #[test]
    fn normal_does_not_preempt_high_until_finished() {
        let mut speech = RecordingSpeech::new();
        speech.speak("error", SpeechPriority::High);
        speech.speak("moving", SpeechPriority::Normal);
        assert_eq!(speech.current().unwrap().text, "error");
        assert_eq!(speech.history().len(), 2);

        speech.finish_current();
        speech.speak("moving again", SpeechPriority::Normal);
        assert_eq!(speech.current().unwrap().text, "moving again");
    }

    #[test]
    fn blank_text_is_ignored() {
        let mut speech = RecordingSpeech::new();
        speech.speak("   ", SpeechPriority::High);
        assert!(speech.history().is_empty());
        assert!(speech.current().is_none());
    }

    #[test]
    fn boxed_speech_forwards() {
        let mut boxed: Box<dyn Speech> = Box::new(NoopSpeech);
        boxed.speak("hello", SpeechPriority::Normal);
        let mut tracing_speech = TracingSpeech;
        tracing_speech.speak("hello", SpeechPriority::High);
    }

    #[test]
    fn utterance_serde_roundtrip() {
        let u = Utterance {
            text: "Wall, 1 of 3".into(),
            priority: SpeechPriority::High,
        };
        let json = serde_json::to_string(&u).unwrap();
        assert!(json.contains("\"high\""));
        let decoded: Utterance = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, u);
    }
}
