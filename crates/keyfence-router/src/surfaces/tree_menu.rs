//! Collapsible tree browser over a flattened, indented item list.

use std::any::Any;
use std::collections::BTreeSet;

use keyfence_core::{KeyAction, KeyEvent, KeyfenceError, KeyfenceResult};
use keyfence_nav::{
    BackspaceOutcome, LevelAnnouncer, NavigationPosition, TypeaheadSearch, find_parent_index,
    sibling_position,
};
use serde::{Deserialize, Serialize};

use crate::surface::{Surface, SurfaceAction, SurfaceContext, SurfaceId, SurfaceOutcome};

/// One node of a flattened tree. Children follow their parent with a
/// deeper indent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeItem {
    /// Spoken label.
    pub label: String,
    /// Nesting depth; 0 for roots.
    pub indent: usize,
}

impl TreeItem {
    /// Create an item.
    #[must_use]
    pub fn new(label: impl Into<String>, indent: usize) -> Self {
        Self {
            label: label.into(),
            indent,
        }
    }
}

/// A tree whose branches start collapsed.
///
/// Right expands a branch or steps into its first child; Left collapses
/// or steps out to the parent. Depth changes are announced as "Level N".
#[derive(Debug)]
pub struct TreeMenu {
    id: SurfaceId,
    title: String,
    items: Vec<TreeItem>,
    expanded: BTreeSet<usize>,
    /// Item indices of the rows currently shown.
    visible: Vec<usize>,
    position: NavigationPosition,
    search: TypeaheadSearch,
    active: bool,
}

impl TreeMenu {
    /// Create a closed tree.
    #[must_use]
    pub fn new(id: impl Into<SurfaceId>, title: impl Into<String>, items: Vec<TreeItem>) -> Self {
        let mut menu = Self {
            id: id.into(),
            title: title.into(),
            items,
            expanded: BTreeSet::new(),
            visible: Vec::new(),
            position: NavigationPosition::default(),
            search: TypeaheadSearch::new(),
            active: false,
        };
        menu.rebuild_visible();
        menu
    }

    /// The items, in flattened order.
    #[must_use]
    pub fn items(&self) -> &[TreeItem] {
        &self.items
    }

    /// Item index under the cursor.
    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.visible.get(self.position.index()).copied()
    }

    /// Item under the cursor.
    #[must_use]
    pub fn selected_item(&self) -> Option<&TreeItem> {
        self.selected().map(|i| &self.items[i])
    }

    /// Item indices of the visible rows.
    #[must_use]
    pub fn visible_rows(&self) -> &[usize] {
        &self.visible
    }

    /// Whether item `index` is an expanded branch.
    #[must_use]
    pub fn is_expanded(&self, index: usize) -> bool {
        self.expanded.contains(&index)
    }

    /// The search state.
    #[must_use]
    pub const fn search(&self) -> &TypeaheadSearch {
        &self.search
    }

    fn has_children(&self, index: usize) -> bool {
        self.items
            .get(index + 1)
            .is_some_and(|next| next.indent > self.items[index].indent)
    }

    fn rebuild_visible(&mut self) {
        let keep = self.selected();
        self.visible.clear();
        let mut hidden_below: Option<usize> = None;
        for (index, item) in self.items.iter().enumerate() {
            if let Some(depth) = hidden_below {
                if item.indent > depth {
                    continue;
                }
                hidden_below = None;
            }
            self.visible.push(index);
            if !self.expanded.contains(&index) && self.has_children(index) {
                hidden_below = Some(item.indent);
            }
        }
        let row = keep
            .and_then(|index| self.visible.iter().position(|&v| v == index))
            .unwrap_or(0);
        self.position = NavigationPosition::new(row, self.visible.len());
    }

    fn visible_labels(&self) -> Vec<String> {
        self.visible
            .iter()
            .map(|&i| self.items[i].label.clone())
            .collect()
    }

    fn describe_current(&self, ctx: &mut SurfaceContext<'_>) -> Option<String> {
        let index = self.selected()?;
        let item = &self.items[index];
        let mut parts = vec![item.label.clone()];
        if self.has_children(index) {
            parts.push(if self.is_expanded(index) { "expanded" } else { "collapsed" }.to_owned());
        }
        if ctx.config.announce_positions
            && let Some(siblings) =
                sibling_position(&self.visible, self.position.index(), |&i| self.items[i].indent)
        {
            parts.push(siblings.label());
        }
        if let Some(depth) = ctx.levels.observe(self.id.as_str(), item.indent + 1)
            && ctx.config.announce_levels
        {
            parts.push(LevelAnnouncer::announcement(depth));
        }
        Some(parts.join(", "))
    }

    fn announce_current(&self, ctx: &mut SurfaceContext<'_>) {
        match self.describe_current(ctx) {
            Some(text) => ctx.announce(text),
            None => ctx.announce("Empty"),
        }
    }

    fn jump_to_match(&mut self, found: Option<usize>, ctx: &mut SurfaceContext<'_>) {
        if let Some(row) = found {
            self.position.set_index(row);
            self.announce_current(ctx);
        }
    }

    fn expand_or_enter(&mut self, ctx: &mut SurfaceContext<'_>) -> KeyfenceResult<SurfaceAction> {
        let Some(index) = self.selected().filter(|&i| self.has_children(i)) else {
            return Err(KeyfenceError::no_target("expand"));
        };
        if self.expanded.insert(index) {
            self.rebuild_visible();
            self.search.clear();
        } else {
            self.position.next();
        }
        self.announce_current(ctx);
        Ok(SurfaceAction::Consumed)
    }

    fn collapse_or_leave(&mut self, ctx: &mut SurfaceContext<'_>) -> KeyfenceResult<SurfaceAction> {
        let Some(index) = self.selected() else {
            return Err(KeyfenceError::no_target("collapse"));
        };
        if self.expanded.remove(&index) {
            self.rebuild_visible();
            self.search.clear();
            self.announce_current(ctx);
            return Ok(SurfaceAction::Consumed);
        }
        let row = self.position.index();
        let Some(parent) = find_parent_index(&self.visible, row, |&i| self.items[i].indent) else {
            return Err(KeyfenceError::no_target("collapse"));
        };
        self.position.set_index(parent);
        self.announce_current(ctx);
        Ok(SurfaceAction::Consumed)
    }

    fn type_char(&mut self, ch: char, ctx: &mut SurfaceContext<'_>) -> KeyfenceResult<SurfaceAction> {
        let labels = self.visible_labels();
        match self.search.process_char(ch, &labels, ctx.now) {
            Some(row) => {
                self.position.set_index(row);
                self.announce_current(ctx);
                Ok(SurfaceAction::Consumed)
            }
            None => Err(KeyfenceError::NoMatches {
                query: self.search.take_last_failed_search().unwrap_or_default(),
            }),
        }
    }
}

impl Surface for TreeMenu {
    fn id(&self) -> &SurfaceId {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn open(&mut self, ctx: &mut SurfaceContext<'_>) {
        self.active = true;
        self.expanded.clear();
        self.position = NavigationPosition::default();
        self.rebuild_visible();
        self.search = TypeaheadSearch::with_timeout(ctx.config.typeahead_timeout());
        ctx.announce(&self.title);
        self.announce_current(ctx);
    }

    fn close(&mut self, ctx: &mut SurfaceContext<'_>) {
        self.active = false;
        self.search.clear();
        self.expanded.clear();
        self.position = NavigationPosition::default();
        self.rebuild_visible();
        ctx.levels.reset(self.id.as_str());
    }

    fn handle_input(
        &mut self,
        event: &KeyEvent,
        ctx: &mut SurfaceContext<'_>,
    ) -> KeyfenceResult<SurfaceAction> {
        let action = ctx.action(event).cloned();
        match action {
            Some(KeyAction::Up | KeyAction::PreviousMatch) if self.search.has_active_search() => {
                let found = self.search.previous_match(self.position.index());
                self.jump_to_match(found, ctx);
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::Down | KeyAction::NextMatch) if self.search.has_active_search() => {
                let found = self.search.next_match(self.position.index());
                self.jump_to_match(found, ctx);
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::NextMatch | KeyAction::PreviousMatch) => {
                Err(KeyfenceError::no_target("cycle through"))
            }
            Some(KeyAction::Up) => {
                self.position.previous();
                self.announce_current(ctx);
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::Down) => {
                self.position.next();
                self.announce_current(ctx);
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::Home) => {
                self.position.first();
                self.announce_current(ctx);
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::End) => {
                self.position.last();
                self.announce_current(ctx);
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::PageUp) => {
                self.position.page_up(ctx.config.page_size);
                self.announce_current(ctx);
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::PageDown) => {
                self.position.page_down(ctx.config.page_size);
                self.announce_current(ctx);
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::Right) => self.expand_or_enter(ctx),
            Some(KeyAction::Left) => self.collapse_or_leave(ctx),
            Some(KeyAction::DeleteBack) => {
                let labels = self.visible_labels();
                match self.search.process_backspace(&labels, ctx.now) {
                    BackspaceOutcome::Unchanged => return Ok(SurfaceAction::Ignored),
                    BackspaceOutcome::Cleared => ctx.announce("Search cleared"),
                    BackspaceOutcome::Matched(row) => {
                        self.position.set_index(row);
                        self.announce_current(ctx);
                    }
                }
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::Confirm) => {
                let Some(index) = self.selected() else {
                    return Err(KeyfenceError::no_target("select"));
                };
                ctx.emit(SurfaceOutcome::Selected {
                    surface: self.id.clone(),
                    index,
                    label: self.items[index].label.clone(),
                });
                Ok(SurfaceAction::Close)
            }
            Some(KeyAction::Cancel) if self.search.has_active_search() => {
                self.search.clear();
                ctx.announce("Search cleared");
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::Cancel) => {
                ctx.emit(SurfaceOutcome::Cancelled {
                    surface: self.id.clone(),
                });
                ctx.announce(format!("{} closed", self.title));
                Ok(SurfaceAction::Close)
            }
            _ => match event.text_char() {
                Some(ch) => self.type_char(ch, ctx),
                None => Ok(SurfaceAction::Ignored),
            },
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
