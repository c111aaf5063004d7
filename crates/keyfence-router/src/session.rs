//! Session-scoped state: the surface registry and the services surfaces
//! borrow while handling input.
//!
//! A [`Session`] owns every registered surface, the persistent modes, the
//! host state, the speech channel, the clock, and the outcome queue. The
//! router receives it by `&mut` for each event; nothing is global.

use std::any::Any;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::time::Instant;

use keyfence_core::{
    Clock, KeyEvent, KeyRecorder, KeyScript, KeyfenceConfig, KeyfenceError, KeyfenceResult,
    Keymap, Speech, SpeechPriority, TracingSpeech, WallClock,
};
use keyfence_nav::LevelAnnouncer;
use serde::{Deserialize, Serialize};

use crate::surface::{Surface, SurfaceContext, SurfaceId, SurfaceOutcome};

// ─── Surface Registry ────────────────────────────────────────────────────────

/// Registry of the surfaces a session can route to.
///
/// Insertion order is preserved for inspection; routing priority comes
/// from the guard table, not from this order.
pub struct SurfaceRegistry {
    surfaces: HashMap<SurfaceId, Box<dyn Surface>>,
    order: Vec<SurfaceId>,
}

impl SurfaceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            surfaces: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a surface.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateSurface` if a surface with the same id exists.
    pub fn register(&mut self, surface: Box<dyn Surface>) -> KeyfenceResult<()> {
        let id = surface.id().clone();
        if self.surfaces.contains_key(&id) {
            return Err(KeyfenceError::DuplicateSurface { id: id.0 });
        }
        tracing::debug!(target: "keyfence::session", surface = %id, "surface registered");
        self.order.push(id.clone());
        self.surfaces.insert(id, surface);
        Ok(())
    }

    /// Look up a surface by id.
    #[must_use]
    pub fn get(&self, id: &SurfaceId) -> Option<&dyn Surface> {
        self.surfaces.get(id).map(AsRef::as_ref)
    }

    /// Look up a surface mutably by id.
    pub fn get_mut(&mut self, id: &SurfaceId) -> Option<&mut Box<dyn Surface>> {
        self.surfaces.get_mut(id)
    }

    /// Whether `id` is registered.
    #[must_use]
    pub fn contains(&self, id: &SurfaceId) -> bool {
        self.surfaces.contains_key(id)
    }

    /// Whether `id` is registered and active.
    #[must_use]
    pub fn is_active(&self, id: &SurfaceId) -> bool {
        self.surfaces.get(id).is_some_and(|s| s.is_active())
    }

    /// Whether any registered surface is active.
    #[must_use]
    pub fn any_active(&self) -> bool {
        self.surfaces.values().any(|s| s.is_active())
    }

    /// Ids of active surfaces, in registration order.
    #[must_use]
    pub fn active_ids(&self) -> Vec<&SurfaceId> {
        self.order.iter().filter(|id| self.is_active(id)).collect()
    }

    /// Registered ids in registration order.
    #[must_use]
    pub fn ids(&self) -> &[SurfaceId] {
        &self.order
    }

    /// Downcast a registered surface to its concrete type.
    #[must_use]
    pub fn downcast<T: Any>(&self, id: &SurfaceId) -> Option<&T> {
        self.surfaces.get(id)?.as_any().downcast_ref()
    }

    /// Mutably downcast a registered surface to its concrete type.
    pub fn downcast_mut<T: Any>(&mut self, id: &SurfaceId) -> Option<&mut T> {
        self.surfaces.get_mut(id)?.as_any_mut().downcast_mut()
    }

    /// Number of registered surfaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

impl Default for SurfaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SurfaceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceRegistry")
            .field("order", &self.order)
            .field("active", &self.active_ids())
            .finish()
    }
}

// ─── Host State ──────────────────────────────────────────────────────────────

/// What the host application is doing, as far as ambient hotkeys care.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostState {
    /// Normal play; ambient hotkeys are live.
    #[default]
    Interactive,
    /// The host's own pause or main menu is up.
    Menu,
    /// The host is loading; no ambient hotkeys.
    Loading,
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// Everything one input session owns.
pub struct Session<S: Speech = Box<dyn Speech>> {
    registry: SurfaceRegistry,
    modes: BTreeSet<String>,
    host_state: HostState,
    speech: S,
    clock: Box<dyn Clock>,
    config: KeyfenceConfig,
    keymap: Keymap,
    levels: LevelAnnouncer,
    outcomes: VecDeque<SurfaceOutcome>,
    recorder: KeyRecorder,
}

impl Session {
    /// Session that speaks through `tracing`, on wall-clock time.
    #[must_use]
    pub fn new(config: KeyfenceConfig) -> Self {
        Self::with_speech(Box::new(TracingSpeech), config)
    }
}

impl<S: Speech> Session<S> {
    /// Session that speaks through `speech`, on wall-clock time.
    #[must_use]
    pub fn with_speech(speech: S, config: KeyfenceConfig) -> Self {
        Self {
            registry: SurfaceRegistry::new(),
            modes: BTreeSet::new(),
            host_state: HostState::default(),
            speech,
            clock: Box::new(WallClock),
            config,
            keymap: Keymap::default(),
            levels: LevelAnnouncer::new(),
            outcomes: VecDeque::new(),
            recorder: KeyRecorder::new(),
        }
    }

    /// Replace the clock (e.g. with a `TickClock` in tests).
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace the keymap.
    #[must_use]
    pub fn with_keymap(mut self, keymap: Keymap) -> Self {
        self.keymap = keymap;
        self
    }

    // ── Surfaces ────────────────────────────────────────────────────────

    /// Register a surface.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateSurface` if the id is taken.
    pub fn register(&mut self, surface: impl Surface + 'static) -> KeyfenceResult<()> {
        self.registry.register(Box::new(surface))
    }

    /// The surface registry.
    #[must_use]
    pub const fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    /// Concrete view of a registered surface.
    #[must_use]
    pub fn surface<T: Any>(&self, id: &SurfaceId) -> Option<&T> {
        self.registry.downcast(id)
    }

    /// Mutable concrete view of a registered surface (for host-side setup
    /// such as replacing a menu's items).
    pub fn surface_mut<T: Any>(&mut self, id: &SurfaceId) -> Option<&mut T> {
        self.registry.downcast_mut(id)
    }

    /// Whether `id` is registered and active.
    #[must_use]
    pub fn is_active(&self, id: &SurfaceId) -> bool {
        self.registry.is_active(id)
    }

    /// Whether any surface is active.
    #[must_use]
    pub fn any_active(&self) -> bool {
        self.registry.any_active()
    }

    /// Run `f` against surface `id` with a context borrowed from this
    /// session. Returns `None` if `id` is not registered.
    pub(crate) fn with_surface<R>(
        &mut self,
        id: &SurfaceId,
        f: impl FnOnce(&mut dyn Surface, &mut SurfaceContext<'_>) -> R,
    ) -> Option<R> {
        let now = self.clock.now();
        let surface = self.registry.surfaces.get_mut(id)?;
        let mut ctx = SurfaceContext {
            speech: &mut self.speech,
            keymap: &self.keymap,
            config: &self.config,
            levels: &mut self.levels,
            outcomes: &mut self.outcomes,
            modes: &self.modes,
            now,
        };
        Some(f(surface.as_mut(), &mut ctx))
    }

    /// Run `f` with a context not tied to any surface.
    pub(crate) fn with_context<R>(&mut self, f: impl FnOnce(&mut SurfaceContext<'_>) -> R) -> R {
        let now = self.clock.now();
        let mut ctx = SurfaceContext {
            speech: &mut self.speech,
            keymap: &self.keymap,
            config: &self.config,
            levels: &mut self.levels,
            outcomes: &mut self.outcomes,
            modes: &self.modes,
            now,
        };
        f(&mut ctx)
    }

    // ── Modes and host state ────────────────────────────────────────────

    /// Whether persistent mode `name` is on.
    #[must_use]
    pub fn mode_on(&self, name: &str) -> bool {
        self.modes.contains(name)
    }

    /// Switch mode `name` on or off.
    pub fn set_mode(&mut self, name: &str, on: bool) {
        if on {
            self.modes.insert(name.to_owned());
        } else {
            self.modes.remove(name);
        }
    }

    /// Flip mode `name`; returns the new state.
    pub fn toggle_mode(&mut self, name: &str) -> bool {
        let on = !self.mode_on(name);
        self.set_mode(name, on);
        on
    }

    /// Modes currently on, sorted.
    #[must_use]
    pub const fn modes(&self) -> &BTreeSet<String> {
        &self.modes
    }

    /// Current host state.
    #[must_use]
    pub const fn host_state(&self) -> HostState {
        self.host_state
    }

    /// Update the host state.
    pub fn set_host_state(&mut self, state: HostState) {
        if state != self.host_state {
            tracing::debug!(target: "keyfence::session", from = ?self.host_state, to = ?state, "host state changed");
        }
        self.host_state = state;
    }

    // ── Services ────────────────────────────────────────────────────────

    /// Speak directly through the session's channel.
    pub fn announce(&mut self, text: &str, priority: SpeechPriority) {
        self.speech.speak(text, priority);
    }

    /// The speech channel.
    #[must_use]
    pub const fn speech(&self) -> &S {
        &self.speech
    }

    /// The speech channel, mutably.
    pub const fn speech_mut(&mut self) -> &mut S {
        &mut self.speech
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &KeyfenceConfig {
        &self.config
    }

    /// Key bindings.
    #[must_use]
    pub const fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    /// Key bindings, mutably (for rebinding at runtime).
    pub const fn keymap_mut(&mut self) -> &mut Keymap {
        &mut self.keymap
    }

    /// Level announcer state.
    #[must_use]
    pub const fn levels(&self) -> &LevelAnnouncer {
        &self.levels
    }

    pub(crate) fn reset_levels(&mut self, id: &SurfaceId) {
        self.levels.reset(id.as_str());
    }

    /// Current session time.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    // ── Outcomes ────────────────────────────────────────────────────────

    /// Pop the oldest pending outcome.
    pub fn next_outcome(&mut self) -> Option<SurfaceOutcome> {
        self.outcomes.pop_front()
    }

    /// Take every pending outcome, oldest first.
    pub fn drain_outcomes(&mut self) -> Vec<SurfaceOutcome> {
        self.outcomes.drain(..).collect()
    }

    /// Number of pending outcomes.
    #[must_use]
    pub fn pending_outcomes(&self) -> usize {
        self.outcomes.len()
    }

    // ── Recording ───────────────────────────────────────────────────────

    /// Start recording dispatched keys.
    pub fn start_recording(&mut self) {
        let now = self.clock.now();
        self.recorder.start(now);
    }

    /// Stop recording and return the captured script.
    pub fn stop_recording(&mut self) -> KeyScript {
        self.recorder.stop()
    }

    /// Whether keys are being recorded.
    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub(crate) fn record(&mut self, event: &KeyEvent) {
        if self.recorder.is_recording() {
            let now = self.clock.now();
            self.recorder.record(event, now);
        }
    }
}

impl<S: Speech> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("registry", &self.registry)
            .field("modes", &self.modes)
            .field("host_state", &self.host_state)
            .field("config", &self.config)
            .field("pending_outcomes", &self.outcomes.len())
            .field("recording", &self.recorder.is_recording())
            .finish_non_exhaustive()
    }
}
