//! The priority dispatcher.
//!
//! [`EventRouter`] walks an ordered guard table for every key event and
//! stops at the first guard whose condition holds and whose handler claims
//! the key. Conditions are exclusive by construction:
//!
//! - exactly one surface guard can hold per event: the first guard (in
//!   table order) whose surface is active, and only if none of its
//!   exclusions is active;
//! - ambient hotkeys hold only while no surface at all is active and the
//!   host is interactive;
//! - the trailing catch-all holds while any surface is active.
//!
//! Handler failures never escape: expected errors are spoken and consume
//! the key, anything else (including a panic) is logged, announced with
//! the configured fault text, and also consumes the key.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use keyfence_core::tracing_config::span_names;
use keyfence_core::{
    KeyChord, KeyEvent, KeyfenceError, KeyfenceResult, Speech, SpeechPriority,
};
use serde::{Deserialize, Serialize};

use crate::guard::{AmbientAction, Guard, GuardKind, Tier};
use crate::session::{HostState, Session};
use crate::surface::{SurfaceAction, SurfaceId};

// ─── Dispatch Trace ──────────────────────────────────────────────────────────

/// How a dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// A handler used the key.
    Handled,
    /// A guard swallowed the key without using it.
    Absorbed,
    /// A handler failed; the key was swallowed.
    Faulted,
    /// No guard held; the host may run its own binding.
    Unhandled,
}

impl DispatchOutcome {
    /// Whether the host must skip its native binding.
    #[must_use]
    pub const fn consumes(self) -> bool {
        !matches!(self, Self::Unhandled)
    }
}

/// Record of the most recent dispatch, for inspection and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchTrace {
    /// The key that was dispatched.
    pub key: KeyChord,
    /// Name of the guard that ended dispatch, if any.
    pub guard: Option<String>,
    /// Tier of that guard.
    pub tier: Option<Tier>,
    /// How dispatch ended.
    pub outcome: DispatchOutcome,
}

impl DispatchTrace {
    /// Whether the event was consumed.
    #[must_use]
    pub const fn consumed(&self) -> bool {
        self.outcome.consumes()
    }
}

// ─── Router Builder ──────────────────────────────────────────────────────────

/// Builds and validates a guard table.
#[derive(Debug, Default)]
pub struct RouterBuilder {
    guards: Vec<Guard>,
}

impl RouterBuilder {
    /// Start an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a guard. Declaration order is priority order.
    #[must_use]
    pub fn guard(mut self, guard: Guard) -> Self {
        self.guards.push(guard);
        self
    }

    /// Validate the table and append the catch-all.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGuardTable` if tiers are declared out of order, a
    /// surface guard sits outside the surface tiers, a catch-all is declared
    /// by hand, or a guard name repeats. Returns `DuplicateSurface` if two
    /// guards route to the same surface.
    pub fn build(self) -> KeyfenceResult<EventRouter> {
        let mut names = HashSet::new();
        let mut surfaces = HashSet::new();
        let mut previous = Tier::TextCapture;

        for guard in &self.guards {
            if guard.tier == Tier::CatchAll {
                return Err(invalid_table(format!(
                    "guard {} declares the catch-all tier, which is appended automatically",
                    guard.name
                )));
            }
            if guard.tier < previous {
                return Err(invalid_table(format!(
                    "guard {} ({}) is declared after a {} guard",
                    guard.name, guard.tier, previous
                )));
            }
            previous = guard.tier;

            if !names.insert(guard.name.as_str()) {
                return Err(invalid_table(format!("guard name {} repeats", guard.name)));
            }
            if let GuardKind::Surface { surface, .. } = &guard.kind {
                if !guard.tier.is_surface_tier() {
                    return Err(invalid_table(format!(
                        "surface guard {} cannot use the {} tier",
                        guard.name, guard.tier
                    )));
                }
                if !surfaces.insert(surface) {
                    return Err(KeyfenceError::DuplicateSurface {
                        id: surface.to_string(),
                    });
                }
            }
        }

        let mut guards = self.guards;
        guards.push(Guard::catch_all());
        tracing::debug!(target: "keyfence::router", guards = guards.len(), "guard table built");
        Ok(EventRouter {
            guards,
            last_trace: None,
            unknown_logged: HashSet::new(),
        })
    }
}

fn invalid_table(reason: String) -> KeyfenceError {
    KeyfenceError::InvalidGuardTable { reason }
}

// ─── Event Router ────────────────────────────────────────────────────────────

/// Result of running a handler behind the unwind boundary.
type Guarded<T> = std::thread::Result<KeyfenceResult<T>>;

/// Ambient work extracted from a hotkey guard before the table is released.
enum HotkeyStep {
    Open(SurfaceId),
    Toggle(String),
    Invoked(Guarded<()>),
}

/// Ordered guard table plus per-router diagnostics.
pub struct EventRouter {
    guards: Vec<Guard>,
    last_trace: Option<DispatchTrace>,
    unknown_logged: HashSet<SurfaceId>,
}

impl EventRouter {
    /// Start building a router.
    #[must_use]
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Guard names in priority order (catch-all last).
    #[must_use]
    pub fn guard_names(&self) -> Vec<&str> {
        self.guards.iter().map(Guard::name).collect()
    }

    /// The guards in priority order.
    pub fn guards(&self) -> impl Iterator<Item = &Guard> {
        self.guards.iter()
    }

    /// Tier of the guard routing to `id`.
    #[must_use]
    pub fn tier_of(&self, id: &SurfaceId) -> Option<Tier> {
        self.guards
            .iter()
            .find(|guard| guard.surface_id() == Some(id))
            .map(Guard::tier)
    }

    /// The most recent dispatch.
    #[must_use]
    pub const fn last_trace(&self) -> Option<&DispatchTrace> {
        self.last_trace.as_ref()
    }

    /// The active surface that owns input: the first in table order.
    #[must_use]
    pub fn active_surface<'a, S: Speech>(&'a self, session: &Session<S>) -> Option<&'a SurfaceId> {
        self.highest_active(session).map(|(id, _)| id)
    }

    fn highest_active<S: Speech>(&self, session: &Session<S>) -> Option<(&SurfaceId, Tier)> {
        self.guards.iter().find_map(|guard| {
            let id = guard.surface_id()?;
            session.is_active(id).then_some((id, guard.tier))
        })
    }

    // ── Dispatch ────────────────────────────────────────────────────────

    /// Route one key event. Returns whether the event was consumed; the
    /// event's own `consumed` flag is set to match.
    pub fn dispatch<S: Speech>(&mut self, session: &mut Session<S>, event: &mut KeyEvent) -> bool {
        let key = event.chord();
        let span = tracing::trace_span!(target: "keyfence::router", span_names::DISPATCH, key = %key);
        let _enter = span.enter();

        let trace = self.route(session, event);
        if trace.consumed() {
            event.consume();
        }
        tracing::trace!(
            target: "keyfence::router",
            guard = trace.guard.as_deref().unwrap_or("-"),
            tier = ?trace.tier,
            consumed = event.consumed,
            "dispatched"
        );

        session.record(event);
        self.last_trace = Some(trace);
        event.consumed
    }

    fn route<S: Speech>(&mut self, session: &mut Session<S>, event: &KeyEvent) -> DispatchTrace {
        let key = event.chord();
        let holder = self.select_surface_guard(session);
        let any_active = session.any_active();

        for index in 0..self.guards.len() {
            let outcome = match &self.guards[index].kind {
                GuardKind::Surface { .. } if holder == Some(index) => {
                    self.run_surface_guard(index, session, event)
                }
                GuardKind::Surface { .. } => None,
                GuardKind::Hotkey { chord, .. } => {
                    let live = !any_active
                        && session.host_state() == HostState::Interactive
                        && chord.matches(event);
                    if live {
                        Some(self.run_hotkey(index, session))
                    } else {
                        None
                    }
                }
                GuardKind::CatchAll => any_active.then_some(DispatchOutcome::Absorbed),
            };

            if let Some(outcome) = outcome {
                let guard = &self.guards[index];
                return DispatchTrace {
                    key,
                    guard: Some(guard.name.clone()),
                    tier: Some(guard.tier),
                    outcome,
                };
            }
        }

        DispatchTrace {
            key,
            guard: None,
            tier: None,
            outcome: DispatchOutcome::Unhandled,
        }
    }

    /// Index of the one surface guard whose condition holds, if any.
    fn select_surface_guard<S: Speech>(&mut self, session: &Session<S>) -> Option<usize> {
        let mut holder = None;
        let mut contenders: Vec<&SurfaceId> = Vec::new();

        for (index, guard) in self.guards.iter().enumerate() {
            let GuardKind::Surface {
                surface,
                exclusions,
                ..
            } = &guard.kind
            else {
                continue;
            };
            if !session.registry().contains(surface) {
                if self.unknown_logged.insert(surface.clone()) {
                    tracing::warn!(
                        target: "keyfence::router",
                        guard = %guard.name,
                        surface = %surface,
                        "guard routes to an unregistered surface; treating it as inactive"
                    );
                }
                continue;
            }
            if !session.is_active(surface) {
                continue;
            }
            // An excluded guard steps aside and does not block later guards.
            if exclusions.iter().any(|x| session.is_active(x)) {
                continue;
            }
            if contenders.is_empty() {
                holder = Some(index);
            }
            contenders.push(surface);
        }

        if contenders.len() > 1 {
            tracing::warn!(
                target: "keyfence::router",
                active = ?contenders,
                "several routed surfaces are active; table order decides"
            );
        }
        holder
    }

    fn run_surface_guard<S: Speech>(
        &self,
        index: usize,
        session: &mut Session<S>,
        event: &KeyEvent,
    ) -> Option<DispatchOutcome> {
        let guard = &self.guards[index];
        let GuardKind::Surface {
            surface: id,
            filter,
            ..
        } = &guard.kind
        else {
            return None;
        };

        let absorb = filter.absorbs_unaccepted();
        if !filter.accepts(event, session.keymap()) {
            return absorb.then_some(DispatchOutcome::Absorbed);
        }

        let span = tracing::trace_span!(
            target: "keyfence::router",
            span_names::GUARD,
            guard = %guard.name,
            tier = %guard.tier
        );
        let _enter = span.enter();

        let result = session.with_surface(id, |surface, ctx| {
            panic::catch_unwind(AssertUnwindSafe(|| surface.handle_input(event, ctx)))
        })?;

        let action = match settle(session, &guard.name, result) {
            Ok(action) => action,
            Err(outcome) => return Some(outcome),
        };

        match action {
            SurfaceAction::Consumed => Some(DispatchOutcome::Handled),
            SurfaceAction::Ignored => absorb.then_some(DispatchOutcome::Absorbed),
            SurfaceAction::Close => {
                self.close_quietly(session, id);
                Some(DispatchOutcome::Handled)
            }
            SurfaceAction::Open(next) => {
                self.open_quietly(session, &next);
                Some(DispatchOutcome::Handled)
            }
            SurfaceAction::Replace(next) => {
                self.close_quietly(session, id);
                self.open_quietly(session, &next);
                Some(DispatchOutcome::Handled)
            }
        }
    }

    fn run_hotkey<S: Speech>(&mut self, index: usize, session: &mut Session<S>) -> DispatchOutcome {
        let guard = &mut self.guards[index];
        let span = tracing::trace_span!(
            target: "keyfence::router",
            span_names::GUARD,
            guard = %guard.name,
            tier = %guard.tier
        );
        let _enter = span.enter();

        let GuardKind::Hotkey { action, .. } = &mut guard.kind else {
            return DispatchOutcome::Unhandled;
        };
        let step = match action {
            AmbientAction::Open(id) => HotkeyStep::Open(id.clone()),
            AmbientAction::ToggleMode(name) => HotkeyStep::Toggle(name.clone()),
            AmbientAction::Invoke(run) => HotkeyStep::Invoked(
                session.with_context(|ctx| panic::catch_unwind(AssertUnwindSafe(|| run(ctx)))),
            ),
        };
        let name = guard.name.clone();

        match step {
            HotkeyStep::Open(id) => {
                self.open_quietly(session, &id);
                DispatchOutcome::Handled
            }
            HotkeyStep::Toggle(mode) => {
                let on = session.toggle_mode(&mode);
                let state = if on { "on" } else { "off" };
                session.announce(&format!("{mode} {state}"), SpeechPriority::Normal);
                DispatchOutcome::Handled
            }
            HotkeyStep::Invoked(result) => match settle(session, &name, result) {
                Ok(()) => DispatchOutcome::Handled,
                Err(outcome) => outcome,
            },
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Open surface `id`, unless a higher-priority tier owns input.
    ///
    /// Opening an already-active surface is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSurface` if no guard routes to `id` or it is not
    /// registered, and `BlockedByHigherPriority` if an active surface sits
    /// in a strictly higher tier.
    pub fn open<S: Speech>(&self, session: &mut Session<S>, id: &SurfaceId) -> KeyfenceResult<()> {
        let span = tracing::debug_span!(target: "keyfence::router", span_names::OPEN, surface = %id);
        let _enter = span.enter();

        let unknown = || KeyfenceError::UnknownSurface { id: id.to_string() };
        let tier = self.tier_of(id).ok_or_else(unknown)?;
        if !session.registry().contains(id) {
            return Err(unknown());
        }
        if session.is_active(id) {
            return Ok(());
        }
        if let Some((blocking, blocking_tier)) = self.highest_active(session)
            && blocking_tier < tier
        {
            tracing::debug!(
                target: "keyfence::router",
                requested = %id,
                blocking = %blocking,
                "open blocked by higher-priority surface"
            );
            return Err(KeyfenceError::BlockedByHigherPriority {
                requested: id.to_string(),
                blocking: blocking.to_string(),
            });
        }

        session.with_surface(id, |surface, ctx| surface.open(ctx));
        tracing::debug!(target: "keyfence::router", surface = %id, %tier, "surface opened");
        Ok(())
    }

    /// Close surface `id` and forget its level history.
    ///
    /// Closing an inactive surface is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSurface` if `id` is not registered.
    pub fn close<S: Speech>(&self, session: &mut Session<S>, id: &SurfaceId) -> KeyfenceResult<()> {
        let span = tracing::debug_span!(target: "keyfence::router", span_names::CLOSE, surface = %id);
        let _enter = span.enter();

        if !session.registry().contains(id) {
            return Err(KeyfenceError::UnknownSurface { id: id.to_string() });
        }
        if !session.is_active(id) {
            return Ok(());
        }
        session.with_surface(id, |surface, ctx| surface.close(ctx));
        session.reset_levels(id);
        tracing::debug!(target: "keyfence::router", surface = %id, "surface closed");
        Ok(())
    }

    /// Open on behalf of a handler: failures are routing outcomes, not
    /// user-facing errors.
    fn open_quietly<S: Speech>(&self, session: &mut Session<S>, id: &SurfaceId) {
        match self.open(session, id) {
            Ok(()) | Err(KeyfenceError::BlockedByHigherPriority { .. }) => {}
            Err(err) => {
                tracing::warn!(target: "keyfence::router", surface = %id, error = %err, "open request failed");
            }
        }
    }

    fn close_quietly<S: Speech>(&self, session: &mut Session<S>, id: &SurfaceId) {
        if let Err(err) = self.close(session, id) {
            tracing::warn!(target: "keyfence::router", surface = %id, error = %err, "close request failed");
        }
    }
}

impl fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRouter")
            .field("guards", &self.guard_names())
            .field("last_trace", &self.last_trace)
            .finish_non_exhaustive()
    }
}

/// Resolve a guarded handler result at the guard boundary.
///
/// `Ok` carries the handler's value on. `Err` is the final outcome: an
/// expected error is spoken and handled, anything else is a fault.
fn settle<S: Speech, T>(
    session: &mut Session<S>,
    guard: &str,
    result: Guarded<T>,
) -> Result<T, DispatchOutcome> {
    let detail = match result {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(err)) if err.is_expected() => {
            if let Some(text) = err.announcement() {
                session.announce(&text, SpeechPriority::High);
            }
            tracing::debug!(target: "keyfence::router", guard, error = %err, "handler reported expected failure");
            return Err(DispatchOutcome::Handled);
        }
        Ok(Err(err)) => err.to_string(),
        Err(payload) => panic_detail(payload.as_ref()),
    };

    let fault = KeyfenceError::fault(guard, detail);
    tracing::error!(target: "keyfence::router", guard, error = %fault, "handler fault");
    let text = session.config().fault_announcement.clone();
    session.announce(&text, SpeechPriority::High);
    Err(DispatchOutcome::Faulted)
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_owned())
}
