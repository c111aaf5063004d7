//! Shared navigation primitives for keyfence surfaces.
//!
//! - [`navigation`]: clamped list moves and flattened-tree arithmetic.
//! - [`level`]: debounced tree-depth announcements.
//! - [`typeahead`]: incremental three-tier ranked search.
//!
//! Nothing here speaks or routes; surfaces turn these results into
//! announcements.

#![forbid(unsafe_code)]

pub mod level;
pub mod navigation;
pub mod typeahead;

pub use level::LevelAnnouncer;
pub use navigation::{
    NavigationPosition, SiblingPosition, find_parent_index, jump_to_first, jump_to_last,
    page_down, page_up, position_label, select_next, select_previous, sibling_position,
};
pub use typeahead::{
    BackspaceOutcome, MatchTier, TypeaheadSearch, classify, rank_matches, split_label,
};
