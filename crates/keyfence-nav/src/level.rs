//! Debounced tree-depth announcements.
//!
//! Tree surfaces tell the user when the cursor crosses into another depth.
//! Repeating "Level 2" on every move between siblings is noise, so the
//! announcer remembers the last depth per surface key and only reports
//! transitions. The first observation after a fresh open at depth 1 is
//! silent: the surface's own open announcement already covers it.

use std::collections::HashMap;

/// Per-surface "last announced depth" tracker.
///
/// Depths are 1-based: root nodes live at depth 1.
#[derive(Debug, Clone, Default)]
pub struct LevelAnnouncer {
    last: HashMap<String, usize>,
}

impl LevelAnnouncer {
    /// Create an empty announcer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the cursor's depth for `key`.
    ///
    /// Returns `Some(depth)` when the change should be announced:
    /// - first observation at depth > 1;
    /// - any change of depth, including a return to depth 1 from deeper.
    ///
    /// Returns `None` for an unchanged depth and for the first observation
    /// at depth 1.
    pub fn observe(&mut self, key: &str, depth: usize) -> Option<usize> {
        match self.last.insert(key.to_owned(), depth) {
            None if depth <= 1 => None,
            None => Some(depth),
            Some(previous) if previous == depth => None,
            Some(_) => Some(depth),
        }
    }

    /// Spoken text for an announced depth.
    #[must_use]
    pub fn announcement(depth: usize) -> String {
        format!("Level {depth}")
    }

    /// Last observed depth for `key`.
    #[must_use]
    pub fn last_depth(&self, key: &str) -> Option<usize> {
        self.last.get(key).copied()
    }

    /// Forget `key`; the next observation behaves like a fresh open.
    pub fn reset(&mut self, key: &str) {
        if self.last.remove(key).is_some() {
            tracing::trace!(target: "keyfence::nav", surface = key, "level tracking reset");
        }
    }

    /// Forget every key.
    pub fn clear(&mut self) {
        self.last.clear();
    }

    /// Number of keys being tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.last.len()
    }

    /// Whether no keys are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}
