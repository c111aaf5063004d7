//! Incremental ranked typeahead search over a list of labels.
//!
//! Each character extends a buffer that is matched against every label and
//! classified into one of three [`MatchTier`]s:
//!
//! 1. the buffer prefixes the label's name (its leading word);
//! 2. the buffer prefixes a later word of the name;
//! 3. the buffer prefixes a word that appears only in the label's
//!    parenthetical annotation, e.g. `"debris"` in `"5 wood (debris)"`.
//!
//! Matches are ordered by tier, then by original position. A character that
//! leaves no match clears the whole buffer and parks it in the "last failed
//! search" slot for one announcement. The buffer expires after an idle
//! timeout; time is passed in by the caller so the engine stays clock-free.

use std::time::{Duration, Instant};

use keyfence_core::config::DEFAULT_TYPEAHEAD_TIMEOUT_MS;
use serde::{Deserialize, Serialize};

// ─── Label Parsing ───────────────────────────────────────────────────────────

/// Split a label into its name and its parenthetical annotation.
///
/// The annotation is the text inside the first `(`...`)` group; the name is
/// everything outside it, trimmed. A label without parentheses has no
/// annotation. An unclosed `(` runs to the end of the label.
#[must_use]
pub fn split_label(label: &str) -> (String, Option<String>) {
    let Some(open) = label.find('(') else {
        return (label.trim().to_owned(), None);
    };
    let rest = &label[open + 1..];
    let (annotation, tail) = match rest.find(')') {
        Some(close) => (&rest[..close], &rest[close + 1..]),
        None => (rest, ""),
    };

    let head = label[..open].trim_end();
    let tail = tail.trim();
    let name = if tail.is_empty() {
        head.to_owned()
    } else if head.is_empty() {
        tail.to_owned()
    } else {
        format!("{head} {tail}")
    };

    let annotation = annotation.trim();
    let annotation = (!annotation.is_empty()).then(|| annotation.to_owned());
    (name.trim().to_owned(), annotation)
}

/// Byte offsets where a word starts in `text`.
///
/// A word is a run of alphanumeric characters; whitespace and punctuation
/// separate words.
fn word_starts(text: &str) -> impl Iterator<Item = usize> + '_ {
    let mut previous_alnum = false;
    text.char_indices().filter_map(move |(offset, ch)| {
        let alnum = ch.is_alphanumeric();
        let starts = alnum && !previous_alnum;
        previous_alnum = alnum;
        starts.then_some(offset)
    })
}

// ─── Match Tier ──────────────────────────────────────────────────────────────

/// Where in a label the search buffer matched. Lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// Prefix of the name's leading word.
    LeadingWord,
    /// Prefix of a later word in the name.
    InnerWord,
    /// Prefix of a word found only in the parenthetical annotation.
    Annotation,
}

/// Classify `label` against an already-lowercased `needle`.
fn classify_lower(needle: &str, label: &str) -> Option<MatchTier> {
    if needle.is_empty() {
        return None;
    }
    let (name, annotation) = split_label(label);
    let name = name.to_lowercase();

    let mut starts = word_starts(&name);
    let leading = starts.next();
    // Leading punctuation is not part of the first word.
    if name.starts_with(needle) || leading.is_some_and(|first| name[first..].starts_with(needle)) {
        return Some(MatchTier::LeadingWord);
    }
    if starts.any(|offset| name[offset..].starts_with(needle)) {
        return Some(MatchTier::InnerWord);
    }
    let annotation = annotation?.to_lowercase();
    word_starts(&annotation)
        .any(|offset| annotation[offset..].starts_with(needle))
        .then_some(MatchTier::Annotation)
}

/// Classify how `query` matches `label`, case-insensitively.
#[must_use]
pub fn classify(query: &str, label: &str) -> Option<MatchTier> {
    classify_lower(&query.to_lowercase(), label)
}

/// Indices of all labels matching `query`, tier 1 first, then tier 2, then
/// tier 3, each in original order.
#[must_use]
pub fn rank_matches<S: AsRef<str>>(query: &str, labels: &[S]) -> Vec<usize> {
    let needle = query.to_lowercase();
    let mut tiered: Vec<(MatchTier, usize)> = labels
        .iter()
        .enumerate()
        .filter_map(|(index, label)| {
            classify_lower(&needle, label.as_ref()).map(|tier| (tier, index))
        })
        .collect();
    // Stable sort keeps original order within a tier.
    tiered.sort_by_key(|&(tier, _)| tier);
    tiered.into_iter().map(|(_, index)| index).collect()
}

// ─── Backspace Outcome ───────────────────────────────────────────────────────

/// Result of [`TypeaheadSearch::process_backspace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackspaceOutcome {
    /// The buffer was already empty; nothing happened.
    Unchanged,
    /// The buffer became empty (or nothing matched any more) and the search
    /// was cleared.
    Cleared,
    /// The shortened buffer matched; carries the first match's label index.
    Matched(usize),
}

impl BackspaceOutcome {
    /// Whether the backspace changed the search state.
    #[must_use]
    pub const fn is_changed(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

// ─── Typeahead Search ────────────────────────────────────────────────────────

/// Search state owned by one surface.
///
/// Invariants: the match list is empty whenever the buffer is empty, and
/// the match cursor is a valid index into the match list (or 0 when it is
/// empty).
#[derive(Debug, Clone)]
pub struct TypeaheadSearch {
    buffer: String,
    last_input: Option<Instant>,
    matches: Vec<usize>,
    cursor: usize,
    last_failed: Option<String>,
    timeout: Duration,
}

impl Default for TypeaheadSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeaheadSearch {
    /// Create an idle search with the default 3 second timeout.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_timeout(Duration::from_millis(DEFAULT_TYPEAHEAD_TIMEOUT_MS))
    }

    /// Create an idle search with a custom idle timeout.
    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self {
            buffer: String::new(),
            last_input: None,
            matches: Vec::new(),
            cursor: 0,
            last_failed: None,
            timeout,
        }
    }

    /// The idle timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Append `ch` and re-rank `labels`.
    ///
    /// If more than the timeout has passed since the previous character, the
    /// old buffer is discarded first. Returns the label index of the best
    /// match, or `None` after clearing the search when nothing matches.
    pub fn process_char<S: AsRef<str>>(
        &mut self,
        ch: char,
        labels: &[S],
        now: Instant,
    ) -> Option<usize> {
        if self.is_expired(now) {
            tracing::trace!(target: "keyfence::nav", buffer = %self.buffer, "typeahead buffer expired");
            self.reset_buffer();
        }
        self.last_failed = None;
        self.last_input = Some(now);
        self.buffer.push(ch);

        let matches = rank_matches(&self.buffer, labels);
        if matches.is_empty() {
            tracing::trace!(target: "keyfence::nav", buffer = %self.buffer, "typeahead found no matches");
            self.last_failed = Some(std::mem::take(&mut self.buffer));
            self.reset_buffer();
            return None;
        }
        self.matches = matches;
        self.cursor = 0;
        self.current_match()
    }

    /// Drop the last buffered character and re-rank `labels`.
    pub fn process_backspace<S: AsRef<str>>(
        &mut self,
        labels: &[S],
        now: Instant,
    ) -> BackspaceOutcome {
        if self.buffer.pop().is_none() {
            return BackspaceOutcome::Unchanged;
        }
        if self.buffer.is_empty() {
            self.clear();
            return BackspaceOutcome::Cleared;
        }

        self.last_input = Some(now);
        self.matches = rank_matches(&self.buffer, labels);
        self.cursor = 0;
        match self.current_match() {
            Some(index) => BackspaceOutcome::Matched(index),
            None => {
                self.clear();
                BackspaceOutcome::Cleared
            }
        }
    }

    /// Discard the buffer, matches, and failed-search slot.
    pub fn clear(&mut self) {
        self.reset_buffer();
        self.last_failed = None;
    }

    fn reset_buffer(&mut self) {
        self.buffer.clear();
        self.matches.clear();
        self.cursor = 0;
        self.last_input = None;
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.last_input
            .is_some_and(|last| now.saturating_duration_since(last) > self.timeout)
    }

    /// Next match after `current` in ranked order, wrapping around.
    ///
    /// If `current` is not itself a match, moves to the nearest match with a
    /// larger label index, wrapping to the smallest one.
    pub fn next_match(&mut self, current: usize) -> Option<usize> {
        let position = match self.matches.iter().position(|&m| m == current) {
            Some(position) => (position + 1) % self.matches.len(),
            None => {
                let target = self
                    .matches
                    .iter()
                    .copied()
                    .filter(|&m| m > current)
                    .min()
                    .or_else(|| self.matches.iter().copied().min())?;
                self.matches.iter().position(|&m| m == target)?
            }
        };
        self.cursor = position;
        self.current_match()
    }

    /// Previous match before `current` in ranked order, wrapping around.
    ///
    /// If `current` is not itself a match, moves to the nearest match with a
    /// smaller label index, wrapping to the largest one.
    pub fn previous_match(&mut self, current: usize) -> Option<usize> {
        let len = self.matches.len();
        let position = match self.matches.iter().position(|&m| m == current) {
            Some(position) => (position + len - 1) % len,
            None => {
                let target = self
                    .matches
                    .iter()
                    .copied()
                    .filter(|&m| m < current)
                    .max()
                    .or_else(|| self.matches.iter().copied().max())?;
                self.matches.iter().position(|&m| m == target)?
            }
        };
        self.cursor = position;
        self.current_match()
    }

    /// Label index under the match cursor.
    #[must_use]
    pub fn current_match(&self) -> Option<usize> {
        self.matches.get(self.cursor).copied()
    }

    /// The current buffer.
    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Ranked label indices matching the buffer.
    #[must_use]
    pub fn match_indices(&self) -> &[usize] {
        &self.matches
    }

    /// Number of matches.
    #[must_use]
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    /// 1-based cursor position within the matches, for "2 of 5".
    #[must_use]
    pub fn match_position(&self) -> Option<usize> {
        (!self.matches.is_empty()).then_some(self.cursor + 1)
    }

    /// Whether a search is in progress.
    #[must_use]
    pub fn has_active_search(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// The buffer that last produced no matches, returned at most once.
    pub fn take_last_failed_search(&mut self) -> Option<String> {
        self.last_failed.take()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const LABELS: [&str; 3] = ["Wall", "Wood", "5 wood (debris)"];

    #[test]
    fn split_label_variants() {
        assert_eq!(
            split_label("5 wood (debris)"),
            ("5 wood".to_string(), Some("debris".to_string()))
        );
        assert_eq!(split_label("Granite"), ("Granite".to_string(), None));
        assert_eq!(
            split_label("Door (open) north"),
            ("Door north".to_string(), Some("open".to_string()))
        );
        assert_eq!(
            split_label("Crate (unfinished"),
            ("Crate".to_string(), Some("unfinished".to_string()))
        );
        assert_eq!(split_label("Lamp ()"), ("Lamp".to_string(), None));
    }

    #[test]
    fn classify_tiers() {
        assert_eq!(classify("w", "Wall"), Some(MatchTier::LeadingWord));
        assert_eq!(classify("WO", "5 wood (debris)"), Some(MatchTier::InnerWord));
        assert_eq!(classify("deb", "5 wood (debris)"), Some(MatchTier::Annotation));
        assert_eq!(classify("ood", "Wood"), None);
        assert_eq!(classify("", "Wood"), None);
        assert_eq!(classify("steel", "Steel-wall"), Some(MatchTier::LeadingWord));
        assert_eq!(classify("wall", "Steel-wall"), Some(MatchTier::InnerWord));
    }

    #[test]
    fn ranking_orders_tiers_then_position() {
        assert_eq!(rank_matches("w", &LABELS), vec![0, 1, 2]);
        let labels = ["Rock (wall)", "Big wall", "Wall"];
        assert_eq!(rank_matches("w", &labels), vec![2, 1, 0]);
    }

    #[test]
    fn leading_punctuation_keeps_first_word_tier() {
        assert_eq!(classify("w", "[Wall] segment"), Some(MatchTier::LeadingWord));
        assert_eq!(classify("seg", "[Wall] segment"), Some(MatchTier::InnerWord));
        assert_eq!(classify("w", "  -wood"), Some(MatchTier::LeadingWord));
        assert_eq!(rank_matches("w", &["Big wall", "[Wall] segment"]), vec![1, 0]);
    }

    #[test]
    fn first_char_selects_leading_word_match() {
        let now = Instant::now();
        let mut search = TypeaheadSearch::new();
        assert_eq!(search.process_char('w', &LABELS, now), Some(0));
        assert_eq!(search.match_indices(), &[0, 1, 2]);
        assert_eq!(search.match_position(), Some(1));
        assert!(search.has_active_search());
    }

    #[test]
    fn narrowing_refines_matches() {
        let now = Instant::now();
        let mut search = TypeaheadSearch::new();
        search.process_char('w', &LABELS, now);
        assert_eq!(search.process_char('o', &LABELS, now), Some(1));
        assert_eq!(search.match_indices(), &[1, 2]);
        assert_eq!(search.buffer(), "wo");
    }

    #[test]
    fn failure_clears_buffer_and_reports_once() {
        let now = Instant::now();
        let mut search = TypeaheadSearch::new();
        search.process_char('w', &LABELS, now);
        assert_eq!(search.process_char('x', &LABELS, now), None);
        assert_eq!(search.buffer(), "");
        assert!(search.match_indices().is_empty());
        assert!(!search.has_active_search());
        assert_eq!(search.take_last_failed_search().as_deref(), Some("wx"));
        assert_eq!(search.take_last_failed_search(), None);

        // A fresh buffer starts with the next character.
        assert_eq!(search.process_char('d', &LABELS, now), Some(2));
        assert_eq!(search.buffer(), "d");
    }

    #[test]
    fn timeout_resets_buffer() {
        let start = Instant::now();
        let mut search = TypeaheadSearch::new();
        search.process_char('w', &LABELS, start);
        let later = start + Duration::from_millis(3_001);
        assert_eq!(search.process_char('d', &LABELS, later), Some(2));
        assert_eq!(search.buffer(), "d");
    }

    #[test]
    fn within_timeout_buffer_accumulates() {
        let start = Instant::now();
        let mut search = TypeaheadSearch::with_timeout(Duration::from_millis(500));
        search.process_char('w', &LABELS, start);
        search.process_char('a', &LABELS, start + Duration::from_millis(500));
        assert_eq!(search.buffer(), "wa");
        search.process_char('d', &LABELS, start + Duration::from_millis(1_001));
        assert_eq!(search.buffer(), "d");
    }

    #[test]
    fn backspace_on_empty_is_noop() {
        let mut search = TypeaheadSearch::new();
        let outcome = search.process_backspace(&LABELS, Instant::now());
        assert_eq!(outcome, BackspaceOutcome::Unchanged);
        assert!(!outcome.is_changed());
    }

    #[test]
    fn backspace_rematches_or_clears() {
        let now = Instant::now();
        let mut search = TypeaheadSearch::new();
        search.process_char('w', &LABELS, now);
        search.process_char('a', &LABELS, now);
        assert_eq!(search.match_indices(), &[0]);

        assert_eq!(
            search.process_backspace(&LABELS, now),
            BackspaceOutcome::Matched(0)
        );
        assert_eq!(search.match_indices(), &[0, 1, 2]);

        assert_eq!(search.process_backspace(&LABELS, now), BackspaceOutcome::Cleared);
        assert!(!search.has_active_search());
        assert!(search.match_indices().is_empty());
    }

    #[test]
    fn clear_is_idempotent() {
        let mut search = TypeaheadSearch::new();
        search.process_char('w', &LABELS, Instant::now());
        search.clear();
        search.clear();
        assert!(!search.has_active_search());
        assert_eq!(search.current_match(), None);
        assert_eq!(search.match_position(), None);
    }

    fn with_matches(matches: Vec<usize>) -> TypeaheadSearch {
        let mut search = TypeaheadSearch::new();
        search.buffer.push('x');
        search.matches = matches;
        search
    }

    #[test]
    fn cyclic_navigation_wraps_within_matches() {
        let mut search = with_matches(vec![2, 5, 9]);
        assert_eq!(search.next_match(9), Some(2));
        assert_eq!(search.previous_match(9), Some(5));
        assert_eq!(search.previous_match(2), Some(9));
        assert_eq!(search.match_position(), Some(3));
    }

    #[test]
    fn navigation_from_non_match_jumps_to_nearest() {
        let mut search = with_matches(vec![2, 5, 9]);
        assert_eq!(search.next_match(6), Some(9));
        assert_eq!(search.next_match(10), Some(2));
        assert_eq!(search.previous_match(6), Some(5));
        assert_eq!(search.previous_match(1), Some(9));
    }

    #[test]
    fn navigation_follows_ranked_order() {
        // Ranked order differs from index order when tiers mix.
        let mut search = with_matches(vec![7, 1, 4]);
        assert_eq!(search.next_match(7), Some(1));
        assert_eq!(search.next_match(1), Some(4));
        assert_eq!(search.next_match(4), Some(7));
    }

    #[test]
    fn navigation_without_matches_is_none() {
        let mut search = TypeaheadSearch::new();
        assert_eq!(search.next_match(0), None);
        assert_eq!(search.previous_match(0), None);
    }

    proptest! {
        #[test]
        fn ranking_is_tier_sorted_and_stable(
            labels in proptest::collection::vec("[a-c ]{1,8}( \\([a-c]{1,4}\\))?", 0..20),
            query in "[a-c]{1,2}",
        ) {
            let ranked = rank_matches(&query, &labels);
            let tiers: Vec<(MatchTier, usize)> = ranked
                .iter()
                .map(|&i| (classify(&query, &labels[i]).unwrap(), i))
                .collect();
            let mut sorted = tiers.clone();
            sorted.sort();
            prop_assert_eq!(tiers, sorted);

            let expected = labels.iter().filter(|l| classify(&query, l).is_some()).count();
            prop_assert_eq!(ranked.len(), expected);
        }

        #[test]
        fn cursor_stays_valid(chars in proptest::collection::vec("[a-dx]", 1..10)) {
            let labels = ["Alpha", "Bravo (cargo)", "Charlie delta", "Dam"];
            let now = Instant::now();
            let mut search = TypeaheadSearch::new();
            for ch in chars.iter().filter_map(|s| s.chars().next()) {
                let found = search.process_char(ch, &labels, now);
                prop_assert_eq!(found.is_some(), search.has_active_search());
                if let Some(index) = found {
                    prop_assert!(index < labels.len());
                    prop_assert_eq!(search.match_position(), Some(1));
                } else {
                    prop_assert!(search.match_indices().is_empty());
                }
            }
        }
    }
}
