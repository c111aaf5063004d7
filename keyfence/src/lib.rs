//! # keyfence
//!
//! Keyboard input core for screen-reader-first applications.
//!
//! keyfence decides, for every key press, which part of the program owns
//! it. Modal surfaces (menus, trees, prompts, text fields) sit in an
//! ordered guard table; the first guard whose condition holds gets the key
//! and the rest never see it. While any surface is open, keys it does not
//! use are absorbed instead of leaking into the host's world controls.
//!
//! Everything a user hears comes through the [`Speech`] channel: cursor
//! moves, typeahead results, tree depth changes, and failures.
//!
//! # Quick Start
//!
//! ```rust
//! use keyfence::prelude::*;
//!
//! let mut session = Session::with_speech(RecordingSpeech::new(), KeyfenceConfig::default());
//! session.register(ListMenu::new(
//!     "menu.materials",
//!     "Materials",
//!     vec!["Wall".into(), "Wood".into(), "Granite".into()],
//! ))?;
//!
//! let mut router = EventRouter::builder()
//!     .guard(Guard::surface("materials", Tier::DomainSurface, "menu.materials"))
//!     .guard(Guard::hotkey(
//!         "open_materials",
//!         "ctrl+m".parse()?,
//!         AmbientAction::Open(SurfaceId::new("menu.materials")),
//!     ))
//!     .build()?;
//!
//! let mut open = KeyEvent::new(KeyCode::Char('m'), KeyModifiers::CONTROL);
//! assert!(router.dispatch(&mut session, &mut open));
//! assert!(router.dispatch(&mut session, &mut KeyEvent::char('w')));
//! assert_eq!(session.speech().last_text(), Some("Wall, 2 matches"));
//!
//! router.dispatch(&mut session, &mut KeyEvent::plain(KeyCode::Down));
//! router.dispatch(&mut session, &mut KeyEvent::plain(KeyCode::Enter));
//! assert!(matches!(
//!     session.next_outcome(),
//!     Some(SurfaceOutcome::Selected { index: 1, .. })
//! ));
//! # Ok::<(), keyfence::KeyfenceError>(())
//! ```
//!
//! ## Crate Layout
//!
//! | Crate | Purpose |
//! |-------|---------|
//! | [`keyfence-core`](core) | Key events, keymap, speech contract, errors, config, tracing, clock, key scripts |
//! | [`keyfence-nav`](nav) | Clamped list moves, tree arithmetic, level debouncing, typeahead |
//! | [`keyfence-router`](router) | Surface contract, session, guard table, router, reference surfaces |
//!
//! ## Priority Tiers
//!
//! | Tier | Holds when | Unused keys |
//! |------|-----------|-------------|
//! | `TextCapture` | its surface is active | absorbed |
//! | `DialogBlocking` | its surface is active | absorbed |
//! | `WorldOverlay` | its surface is active | catch-all |
//! | `DomainSurface` | its surface is active | catch-all |
//! | `Ambient` | no surface active, host interactive, chord matches | host |
//! | `CatchAll` | any surface active | absorbed |

// ─── Sub-crate module aliases (advanced access) ─────────────────────────────

/// Key events, speech, errors, configuration, and tracing conventions.
pub use keyfence_core as core;
/// Navigation arithmetic, level debouncing, and typeahead search.
pub use keyfence_nav as nav;
/// Surface contract, session, and the priority router.
pub use keyfence_router as router;

// ─── Core types ─────────────────────────────────────────────────────────────

// Errors
pub use keyfence_core::{KeyfenceError, KeyfenceResult};

// Configuration and logging
pub use keyfence_core::KeyfenceConfig;
pub use keyfence_core::tracing_config::{Verbosity, init_subscriber};

// Input
pub use keyfence_core::{KeyAction, KeyChord, KeyCode, KeyEvent, KeyModifiers, Keymap};

// Speech
pub use keyfence_core::{NoopSpeech, RecordingSpeech, Speech, SpeechPriority, TracingSpeech};

// Time and replay
pub use keyfence_core::{Clock, KeyRecord, KeyRecorder, KeyScript, TickClock, WallClock};

// ─── Navigation ─────────────────────────────────────────────────────────────

pub use keyfence_nav::{
    BackspaceOutcome, LevelAnnouncer, MatchTier, NavigationPosition, SiblingPosition,
    TypeaheadSearch, find_parent_index, jump_to_first, jump_to_last, page_down, page_up,
    position_label, rank_matches, select_next, select_previous, sibling_position,
};

// ─── Routing ────────────────────────────────────────────────────────────────

pub use keyfence_router::{
    AmbientAction, ConfirmPrompt, DispatchOutcome, DispatchTrace, EventRouter, Guard, HostState,
    KeyFilter, ListMenu, RouterBuilder, Session, Surface, SurfaceAction, SurfaceContext,
    SurfaceId, SurfaceOutcome, SurfaceRegistry, TextEntry, Tier, TreeItem, TreeMenu,
};

// ─── Prelude ────────────────────────────────────────────────────────────────

/// Convenience re-exports for common usage.
///
/// ```rust
/// use keyfence::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AmbientAction, EventRouter, Guard, KeyCode, KeyEvent, KeyModifiers, KeyfenceConfig,
        KeyfenceError, KeyfenceResult, RecordingSpeech, Session, Speech, SpeechPriority, Surface,
        SurfaceAction, SurfaceContext, SurfaceId, SurfaceOutcome, Tier,
    };
    pub use crate::{ConfirmPrompt, ListMenu, TextEntry, TreeItem, TreeMenu};
}
