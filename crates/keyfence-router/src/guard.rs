//! Guard table entries.
//!
//! A [`Guard`] pairs an activation condition with a handler. The router
//! evaluates guards in declaration order; declaration order is priority.

use std::fmt;

use keyfence_core::{KeyAction, KeyChord, KeyEvent, KeyfenceResult, Keymap};
use serde::{Deserialize, Serialize};

use crate::surface::{SurfaceContext, SurfaceId};

// ─── Tier ────────────────────────────────────────────────────────────────────

/// Priority band. Earlier variants win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// A text-entry sub-mode capturing typed characters.
    TextCapture,
    /// A blocking dialog restricting input to its own keys.
    DialogBlocking,
    /// World and overlay composite surfaces.
    WorldOverlay,
    /// Ordinary modal surfaces: menus, grids, trees, prompts.
    DomainSurface,
    /// Global hotkeys, live only while no surface is active.
    Ambient,
    /// Absorbs leftovers while any surface is active.
    CatchAll,
}

impl Tier {
    /// Whether guards of this tier route to a surface.
    #[must_use]
    pub const fn is_surface_tier(self) -> bool {
        matches!(
            self,
            Self::TextCapture | Self::DialogBlocking | Self::WorldOverlay | Self::DomainSurface
        )
    }

    /// Key filter a surface guard of this tier gets unless overridden.
    #[must_use]
    pub fn default_filter(self) -> KeyFilter {
        match self {
            Self::TextCapture => KeyFilter::text_capture(),
            Self::DialogBlocking => KeyFilter::dialog(),
            _ => KeyFilter::pass_through(),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TextCapture => "text_capture",
            Self::DialogBlocking => "dialog_blocking",
            Self::WorldOverlay => "world_overlay",
            Self::DomainSurface => "domain_surface",
            Self::Ambient => "ambient",
            Self::CatchAll => "catch_all",
        };
        f.write_str(name)
    }
}

// ─── Key Filter ──────────────────────────────────────────────────────────────

/// Which keys a surface guard hands to its surface.
///
/// Keys the filter rejects are either absorbed on the spot
/// (`absorb_unaccepted`) or left for later guards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFilter {
    actions: Option<Vec<KeyAction>>,
    typed_chars: bool,
    absorb_unaccepted: bool,
}

impl KeyFilter {
    /// Hand every key to the surface.
    #[must_use]
    pub const fn pass_through() -> Self {
        Self {
            actions: None,
            typed_chars: true,
            absorb_unaccepted: false,
        }
    }

    /// Confirm, cancel, delete-back, delete-forward, and typed characters.
    /// Everything else is absorbed.
    #[must_use]
    pub fn text_capture() -> Self {
        Self {
            actions: Some(vec![
                KeyAction::Confirm,
                KeyAction::Cancel,
                KeyAction::DeleteBack,
                KeyAction::DeleteForward,
            ]),
            typed_chars: true,
            absorb_unaccepted: true,
        }
    }

    /// Arrows, Home/End, confirm, and cancel. Everything else is absorbed.
    #[must_use]
    pub fn dialog() -> Self {
        Self {
            actions: Some(vec![
                KeyAction::Up,
                KeyAction::Down,
                KeyAction::Left,
                KeyAction::Right,
                KeyAction::Home,
                KeyAction::End,
                KeyAction::Confirm,
                KeyAction::Cancel,
            ]),
            typed_chars: false,
            absorb_unaccepted: true,
        }
    }

    /// Accept only the listed actions (and optionally typed characters).
    #[must_use]
    pub fn only(actions: impl IntoIterator<Item = KeyAction>, typed_chars: bool) -> Self {
        Self {
            actions: Some(actions.into_iter().collect()),
            typed_chars,
            absorb_unaccepted: true,
        }
    }

    /// Set whether rejected keys are absorbed.
    #[must_use]
    pub const fn absorbing(mut self, absorb: bool) -> Self {
        self.absorb_unaccepted = absorb;
        self
    }

    /// Whether rejected keys are absorbed.
    #[must_use]
    pub const fn absorbs_unaccepted(&self) -> bool {
        self.absorb_unaccepted
    }

    /// Whether `event` should reach the surface.
    ///
    /// Printable characters count as text even when bound to an action the
    /// filter does not list.
    #[must_use]
    pub fn accepts(&self, event: &KeyEvent, keymap: &Keymap) -> bool {
        let Some(actions) = &self.actions else {
            return true;
        };
        if let Some(action) = keymap.resolve_event(event)
            && actions.contains(action)
        {
            return true;
        }
        self.typed_chars && event.text_char().is_some()
    }
}

impl Default for KeyFilter {
    fn default() -> Self {
        Self::pass_through()
    }
}

// ─── Ambient Action ──────────────────────────────────────────────────────────

/// One-shot handler run by an ambient hotkey.
pub type InvokeFn = Box<dyn FnMut(&mut SurfaceContext<'_>) -> KeyfenceResult<()> + Send>;

/// What an ambient hotkey does.
pub enum AmbientAction {
    /// Open a surface.
    Open(SurfaceId),
    /// Flip a persistent session mode and announce "<mode> on/off".
    ToggleMode(String),
    /// Run a one-shot action.
    Invoke(InvokeFn),
}

impl AmbientAction {
    /// Wrap a closure as an `Invoke` action.
    pub fn invoke(
        f: impl FnMut(&mut SurfaceContext<'_>) -> KeyfenceResult<()> + Send + 'static,
    ) -> Self {
        Self::Invoke(Box::new(f))
    }
}

impl fmt::Debug for AmbientAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(id) => f.debug_tuple("Open").field(id).finish(),
            Self::ToggleMode(name) => f.debug_tuple("ToggleMode").field(name).finish(),
            Self::Invoke(_) => f.write_str("Invoke(..)"),
        }
    }
}

// ─── Guard ───────────────────────────────────────────────────────────────────

/// What a guard checks and runs.
#[derive(Debug)]
pub(crate) enum GuardKind {
    Surface {
        surface: SurfaceId,
        filter: KeyFilter,
        exclusions: Vec<SurfaceId>,
    },
    Hotkey {
        chord: KeyChord,
        action: AmbientAction,
    },
    CatchAll,
}

/// One entry of the router's guard table.
#[derive(Debug)]
pub struct Guard {
    pub(crate) name: String,
    pub(crate) tier: Tier,
    pub(crate) kind: GuardKind,
}

impl Guard {
    /// A guard routing keys to `surface` while it is active.
    ///
    /// Uses the tier's default key filter.
    #[must_use]
    pub fn surface(name: impl Into<String>, tier: Tier, surface: impl Into<SurfaceId>) -> Self {
        Self {
            name: name.into(),
            tier,
            kind: GuardKind::Surface {
                surface: surface.into(),
                filter: tier.default_filter(),
                exclusions: Vec::new(),
            },
        }
    }

    /// An ambient hotkey.
    #[must_use]
    pub fn hotkey(name: impl Into<String>, chord: KeyChord, action: AmbientAction) -> Self {
        Self {
            name: name.into(),
            tier: Tier::Ambient,
            kind: GuardKind::Hotkey { chord, action },
        }
    }

    pub(crate) fn catch_all() -> Self {
        Self {
            name: "catch_all".to_owned(),
            tier: Tier::CatchAll,
            kind: GuardKind::CatchAll,
        }
    }

    /// Replace the key filter (surface guards only; ignored otherwise).
    #[must_use]
    pub fn with_filter(mut self, new_filter: KeyFilter) -> Self {
        if let GuardKind::Surface { filter, .. } = &mut self.kind {
            *filter = new_filter;
        }
        self
    }

    /// Do not hold while `other` is active (surface guards only). The guard
    /// then steps aside and a later guard for `other` receives the key.
    #[must_use]
    pub fn excluding(mut self, other: impl Into<SurfaceId>) -> Self {
        if let GuardKind::Surface { exclusions, .. } = &mut self.kind {
            exclusions.push(other.into());
        }
        self
    }

    /// Guard name, used in logs and traces.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Priority tier.
    #[must_use]
    pub const fn tier(&self) -> Tier {
        self.tier
    }

    /// Surface routed to, for surface guards.
    #[must_use]
    pub const fn surface_id(&self) -> Option<&SurfaceId> {
        match &self.kind {
            GuardKind::Surface { surface, .. } => Some(surface),
            _ => None,
        }
    }
}
