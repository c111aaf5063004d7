//! The modal interaction contract.
//!
//! Every modal surface (menu, browser, prompt, text field) implements
//! [`Surface`] and is registered in the session. The router only ever
//! touches a surface through this trait: it asks whether the surface is
//! active, hands it key events, and drives its open/close lifecycle.

use std::any::Any;
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::time::Instant;

use keyfence_core::{KeyAction, KeyEvent, KeyfenceConfig, KeyfenceResult, Keymap, Speech, SpeechPriority};
use keyfence_nav::LevelAnnouncer;
use serde::{Deserialize, Serialize};

// ─── Surface Identity ────────────────────────────────────────────────────────

/// Unique identifier for a surface within a session.
///
/// Ids use a `namespace.name` convention, e.g. `menu.architect` or
/// `prompt.confirm`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SurfaceId(pub String);

impl SurfaceId {
    /// Create a new surface id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SurfaceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Result a surface hands back to the host when an interaction finishes.
///
/// Outcomes are queued in the session and drained by the host; they carry
/// only what the user chose, never domain state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SurfaceOutcome {
    /// A list or tree item was chosen.
    Selected {
        /// Surface that produced the outcome.
        surface: SurfaceId,
        /// Index of the chosen item in the surface's item list.
        index: usize,
        /// Label of the chosen item.
        label: String,
    },
    /// A prompt option was confirmed.
    Confirmed {
        /// Surface that produced the outcome.
        surface: SurfaceId,
        /// Index of the confirmed option.
        option: usize,
        /// Label of the confirmed option.
        label: String,
    },
    /// The user backed out without choosing.
    Cancelled {
        /// Surface that produced the outcome.
        surface: SurfaceId,
    },
    /// Edited text was committed.
    TextCommitted {
        /// Surface that produced the outcome.
        surface: SurfaceId,
        /// The committed text.
        text: String,
    },
}

impl SurfaceOutcome {
    /// The surface that produced this outcome.
    #[must_use]
    pub const fn surface(&self) -> &SurfaceId {
        match self {
            Self::Selected { surface, .. }
            | Self::Confirmed { surface, .. }
            | Self::Cancelled { surface }
            | Self::TextCommitted { surface, .. } => surface,
        }
    }
}

// ─── Surface Context ─────────────────────────────────────────────────────────

/// Session services lent to a surface for one lifecycle call or key event.
pub struct SurfaceContext<'a> {
    /// Speech output.
    pub speech: &'a mut dyn Speech,
    /// Key-to-action bindings.
    pub keymap: &'a Keymap,
    /// Session configuration.
    pub config: &'a KeyfenceConfig,
    /// Debounced tree-depth announcements.
    pub levels: &'a mut LevelAnnouncer,
    /// Outcome queue drained by the host.
    pub outcomes: &'a mut VecDeque<SurfaceOutcome>,
    /// Persistent modes currently switched on.
    pub modes: &'a BTreeSet<String>,
    /// Session time for this event.
    pub now: Instant,
}

impl SurfaceContext<'_> {
    /// Speak at normal priority.
    pub fn announce(&mut self, text: impl AsRef<str>) {
        self.speech.speak(text.as_ref(), SpeechPriority::Normal);
    }

    /// Speak at high priority, preempting normal speech.
    pub fn announce_urgent(&mut self, text: impl AsRef<str>) {
        self.speech.speak(text.as_ref(), SpeechPriority::High);
    }

    /// Speak `text`, followed by `"n of m"` when position announcements are on.
    pub fn announce_with_position(&mut self, text: &str, index: usize, count: usize) {
        if self.config.announce_positions && count > 0 {
            let position = keyfence_nav::position_label(index, count);
            self.announce(format!("{text}, {position}"));
        } else {
            self.announce(text);
        }
    }

    /// Queue an outcome for the host.
    pub fn emit(&mut self, outcome: SurfaceOutcome) {
        tracing::debug!(target: "keyfence::surface", surface = %outcome.surface(), ?outcome, "outcome queued");
        self.outcomes.push_back(outcome);
    }

    /// Semantic action bound to `event`, if any.
    #[must_use]
    pub fn action(&self, event: &KeyEvent) -> Option<&KeyAction> {
        self.keymap.resolve_event(event)
    }

    /// Whether persistent mode `name` is on.
    #[must_use]
    pub fn mode_on(&self, name: &str) -> bool {
        self.modes.contains(name)
    }
}

impl fmt::Debug for SurfaceContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceContext")
            .field("config", &self.config)
            .field("pending_outcomes", &self.outcomes.len())
            .field("modes", &self.modes)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

// ─── Surface Trait ───────────────────────────────────────────────────────────

/// What the router should do after a surface handled a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceAction {
    /// The key was used; stop dispatch.
    Consumed,
    /// The key means nothing to this surface; let the table decide.
    Ignored,
    /// Close this surface; the key is consumed.
    Close,
    /// Open another surface (subject to priority); the key is consumed.
    Open(SurfaceId),
    /// Close this surface, then open another; the key is consumed.
    Replace(SurfaceId),
}

/// A modal interaction surface.
///
/// Implementations own their activation flag and all sub-state (cursor,
/// search buffer). `close` must reset every piece of that sub-state so the
/// next `open` starts fresh.
pub trait Surface: Send {
    /// Unique identifier for this surface.
    fn id(&self) -> &SurfaceId;

    /// Spoken name, announced on open.
    fn title(&self) -> &str;

    /// Whether this surface currently owns input.
    fn is_active(&self) -> bool;

    /// Activate the surface and announce it.
    fn open(&mut self, ctx: &mut SurfaceContext<'_>);

    /// Deactivate the surface and reset its sub-state.
    fn close(&mut self, ctx: &mut SurfaceContext<'_>);

    /// Handle one key event while active.
    ///
    /// Expected failures (`NoTarget`, `InvalidPosition`, ...) may be
    /// returned as errors: the router announces them and consumes the key.
    /// Any other error is treated as a handler fault.
    ///
    /// # Errors
    ///
    /// Returns a [`keyfence_core::KeyfenceError`] when the key's action
    /// cannot be carried out.
    fn handle_input(
        &mut self,
        event: &KeyEvent,
        ctx: &mut SurfaceContext<'_>,
    ) -> KeyfenceResult<SurfaceAction>;

    /// Whether edits made since `open` would be lost by cancelling.
    fn has_unsaved_changes(&self) -> bool {
        false
    }

    /// Downcast support for hosts reading surface state.
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast support.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
