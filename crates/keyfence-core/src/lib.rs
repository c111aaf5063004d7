//! Core types for the keyfence keyboard input core.
//!
//! This crate defines the vocabulary every other keyfence crate shares:
//! key events and the keymap (`KeyEvent`, `KeyChord`, `Keymap`), the speech
//! channel contract (`Speech`), the error taxonomy (`KeyfenceError`),
//! configuration (`KeyfenceConfig`), tracing conventions, the injectable
//! clock, and key-script recording.
//!
//! It has no knowledge of surfaces or routing.

#![forbid(unsafe_code)]

pub mod config;
pub mod determinism;
pub mod error;
pub mod input;
pub mod replay;
pub mod speech;
pub mod tracing_config;

pub use config::KeyfenceConfig;
pub use determinism::{Clock, TickClock, WallClock};
pub use error::{KeyfenceError, KeyfenceResult};
pub use input::{KeyAction, KeyChord, KeyEvent, Keymap, key_name, parse_key_name};
pub use replay::{KeyRecord, KeyRecorder, KeyScript};
pub use speech::{NoopSpeech, RecordingSpeech, Speech, SpeechPriority, TracingSpeech, Utterance};

pub use crossterm::event::{KeyCode, KeyModifiers};
