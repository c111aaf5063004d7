//! Deterministic time injection for testing and replay.
//!
//! Provides a [`Clock`] trait that abstracts time sources, allowing tests
//! and replayed key scripts to substitute [`TickClock`] (virtual, manually
//! advanced) for [`WallClock`] (real `Instant::now()`). The typeahead
//! timeout is the only consumer of time in the input core.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

// ─── Clock Trait ────────────────────────────────────────────────────────────

/// Abstraction over time sources.
///
/// Production code uses [`WallClock`]. Tests and replay use [`TickClock`]
/// where time only advances when explicitly told to.
pub trait Clock: Send {
    /// Current instant (monotonic).
    fn now(&self) -> Instant;

    /// Elapsed duration since a previous instant.
    fn elapsed_since(&self, earlier: Instant) -> Duration {
        self.now().saturating_duration_since(earlier)
    }
}

// ─── Wall Clock ─────────────────────────────────────────────────────────────

/// Production clock backed by `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl Clock for WallClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// ─── Tick Clock ─────────────────────────────────────────────────────────────

/// Virtual clock for deterministic testing.
///
/// Time only advances through [`tick`](Self::tick) or
/// [`advance`](Self::advance). Clones share the same timeline, so a test can
/// keep one handle while the session owns another.
#[derive(Debug, Clone)]
pub struct TickClock {
    /// The fixed anchor instant (captured once at creation).
    anchor: Instant,
    /// Accumulated virtual elapsed time, in microseconds.
    elapsed_us: Arc<AtomicU64>,
    /// Tick size (each `tick()` call advances by this amount).
    tick_size: Duration,
    /// Total ticks advanced.
    tick_count: Arc<AtomicU64>,
}

impl TickClock {
    /// Create a tick clock with the given tick interval.
    #[must_use]
    pub fn new(tick_size: Duration) -> Self {
        Self {
            anchor: Instant::now(),
            elapsed_us: Arc::new(AtomicU64::new(0)),
            tick_size,
            tick_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create a tick clock that advances 100ms per tick.
    #[must_use]
    pub fn at_100ms() -> Self {
        Self::new(Duration::from_millis(100))
    }

    /// Advance time by one tick.
    pub fn tick(&self) {
        self.advance(self.tick_size);
        self.tick_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Advance time by `n` ticks.
    pub fn tick_n(&self, n: u64) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// Advance time by an arbitrary duration (does not count as a tick).
    pub fn advance(&self, by: Duration) {
        let micros = u64::try_from(by.as_micros()).unwrap_or(u64::MAX);
        self.elapsed_us.fetch_add(micros, Ordering::Relaxed);
    }

    /// Total ticks that have been advanced.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count.load(Ordering::Relaxed)
    }

    /// The tick interval.
    #[must_use]
    pub const fn tick_size(&self) -> Duration {
        self.tick_size
    }

    /// Total virtual elapsed time.
    #[must_use]
    pub fn virtual_elapsed(&self) -> Duration {
        Duration::from_micros(self.elapsed_us.load(Ordering::Relaxed))
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::at_100ms()
    }
}

impl Clock for TickClock {
    fn now(&self) -> Instant {
        self.anchor + self.virtual_elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_clock_is_monotonic() {
        let clock = WallClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn tick_clock_only_moves_when_told() {
        let clock = TickClock::new(Duration::from_millis(250));
        let start = clock.now();
        assert_eq!(clock.now(), start);

        clock.tick();
        assert_eq!(clock.elapsed_since(start), Duration::from_millis(250));
        assert_eq!(clock.tick_count(), 1);

        clock.tick_n(3);
        assert_eq!(clock.virtual_elapsed(), Duration::from_millis(1000));
        assert_eq!(clock.tick_count(), 4);
    }

    #[test]
    fn clones_share_the_timeline() {
        let clock = TickClock::at_100ms();
        let handle = clock.clone();
        let boxed: Box<dyn Clock> = Box::new(clock);
        let before = boxed.now();

        handle.advance(Duration::from_secs(5));
        assert_eq!(boxed.elapsed_since(before), Duration::from_secs(5));
        assert_eq!(handle.tick_count(), 0);
    }

    #[test]
    fn elapsed_since_future_instant_saturates() {
        let clock = TickClock::at_100ms();
        let later = clock.now() + Duration::from_secs(1);
        assert_eq!(clock.elapsed_since(later), Duration::ZERO);
    }
}
