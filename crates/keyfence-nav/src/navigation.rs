//! Position arithmetic for flat lists and flattened indented trees.
//!
//! Everything here is a pure function of its inputs. Moves clamp at the
//! ends of the list; nothing wraps around. The only value type,
//! [`NavigationPosition`], exists to carry the `index < count` invariant
//! alongside the count it was checked against.

use serde::{Deserialize, Serialize};

/// Index of the next item, staying on the last item at the end.
///
/// A stale `index` beyond the end is pulled back to the last item.
#[must_use]
pub fn select_next(index: usize, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    index.saturating_add(1).min(count - 1)
}

/// Index of the previous item, staying on the first item at the start.
#[must_use]
pub fn select_previous(index: usize, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    index.min(count - 1).saturating_sub(1)
}

/// Index of the first item.
#[must_use]
pub const fn jump_to_first() -> usize {
    0
}

/// Index of the last item (0 for an empty list).
#[must_use]
pub const fn jump_to_last(count: usize) -> usize {
    count.saturating_sub(1)
}

/// Move `page` items forward, clamped to the last item.
#[must_use]
pub fn page_down(index: usize, count: usize, page: usize) -> usize {
    if count == 0 {
        return 0;
    }
    index.saturating_add(page.max(1)).min(count - 1)
}

/// Move `page` items back, clamped to the first item.
#[must_use]
pub fn page_up(index: usize, count: usize, page: usize) -> usize {
    if count == 0 {
        return 0;
    }
    index.min(count - 1).saturating_sub(page.max(1))
}

/// Spoken position, e.g. `"3 of 10"` for index 2 of 10.
#[must_use]
pub fn position_label(index: usize, count: usize) -> String {
    format!("{} of {count}", index + 1)
}

/// Nearest ancestor of `current` in a flattened indented tree.
///
/// Scans backward from `current - 1` for the first node whose indent is
/// strictly less than the current node's. Returns `None` for root-level
/// nodes (indent 0), when no shallower node precedes `current`, or when
/// `current` is out of range.
#[must_use]
pub fn find_parent_index<T>(
    nodes: &[T],
    current: usize,
    indent_of: impl Fn(&T) -> usize,
) -> Option<usize> {
    let indent = indent_of(nodes.get(current)?);
    if indent == 0 {
        return None;
    }
    nodes[..current]
        .iter()
        .rposition(|node| indent_of(node) < indent)
}

/// 1-based position of a node among its siblings, and the sibling count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiblingPosition {
    /// 1-based position within the sibling run.
    pub position: usize,
    /// Number of siblings in the run, including the node itself.
    pub count: usize,
}

impl SiblingPosition {
    /// Spoken form, e.g. `"2 of 5"`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} of {}", self.position, self.count)
    }
}

/// Position of `current` within the run of nodes sharing its indent.
///
/// The run extends in both directions until a node with a *shallower*
/// indent is met. Deeper nodes (descendants of siblings) are skipped
/// without ending the run and are not counted.
#[must_use]
pub fn sibling_position<T>(
    nodes: &[T],
    current: usize,
    indent_of: impl Fn(&T) -> usize,
) -> Option<SiblingPosition> {
    let indent = indent_of(nodes.get(current)?);

    let before = nodes[..current]
        .iter()
        .rev()
        .map(&indent_of)
        .take_while(|&d| d >= indent)
        .filter(|&d| d == indent)
        .count();
    let after = nodes[current + 1..]
        .iter()
        .map(&indent_of)
        .take_while(|&d| d >= indent)
        .filter(|&d| d == indent)
        .count();

    Some(SiblingPosition {
        position: before + 1,
        count: before + after + 1,
    })
}

// ─── Navigation Position ─────────────────────────────────────────────────────

/// A cursor into a list of `count` items.
///
/// Invariant: `index < count` whenever `count > 0`; otherwise `index == 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationPosition {
    index: usize,
    count: usize,
}

impl NavigationPosition {
    /// Create a position, clamping `index` into range.
    #[must_use]
    pub fn new(index: usize, count: usize) -> Self {
        Self {
            index: index.min(jump_to_last(count)),
            count,
        }
    }

    /// Current index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Item count.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Whether there are no items.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Whether the cursor is on the first item.
    #[must_use]
    pub const fn at_start(&self) -> bool {
        self.index == 0
    }

    /// Whether the cursor is on the last item.
    #[must_use]
    pub const fn at_end(&self) -> bool {
        self.index == jump_to_last(self.count)
    }

    /// Move to the next item. Returns `true` if the index changed.
    pub fn next(&mut self) -> bool {
        self.set_index(select_next(self.index, self.count))
    }

    /// Move to the previous item. Returns `true` if the index changed.
    pub fn previous(&mut self) -> bool {
        self.set_index(select_previous(self.index, self.count))
    }

    /// Jump to the first item. Returns `true` if the index changed.
    pub fn first(&mut self) -> bool {
        self.set_index(jump_to_first())
    }

    /// Jump to the last item. Returns `true` if the index changed.
    pub fn last(&mut self) -> bool {
        self.set_index(jump_to_last(self.count))
    }

    /// Page forward. Returns `true` if the index changed.
    pub fn page_down(&mut self, page: usize) -> bool {
        self.set_index(page_down(self.index, self.count, page))
    }

    /// Page back. Returns `true` if the index changed.
    pub fn page_up(&mut self, page: usize) -> bool {
        self.set_index(page_up(self.index, self.count, page))
    }

    /// Move to `index`, clamped. Returns `true` if the index changed.
    pub fn set_index(&mut self, index: usize) -> bool {
        let clamped = index.min(jump_to_last(self.count));
        let changed = clamped != self.index;
        self.index = clamped;
        changed
    }

    /// Change the item count, pulling the index back into range.
    pub fn set_count(&mut self, count: usize) {
        self.count = count;
        self.index = self.index.min(jump_to_last(count));
    }

    /// Spoken position, e.g. `"3 of 10"` (empty when there are no items).
    #[must_use]
    pub fn label(&self) -> String {
        if self.count == 0 {
            String::new()
        } else {
            position_label(self.index, self.count)
        }
    }
}
