//! Flat labelled list with typeahead search.

use std::any::Any;

use keyfence_core::{KeyAction, KeyEvent, KeyfenceError, KeyfenceResult};
use keyfence_nav::{BackspaceOutcome, NavigationPosition, TypeaheadSearch};

use crate::surface::{Surface, SurfaceAction, SurfaceContext, SurfaceId, SurfaceOutcome};

/// A vertical menu of labels.
///
/// Arrows move without wrapping. Typed characters search; while a search
/// is active, Up/Down cycle through its matches instead. Enter selects,
/// Escape clears the search first and closes on a second press.
#[derive(Debug)]
pub struct ListMenu {
    id: SurfaceId,
    title: String,
    items: Vec<String>,
    position: NavigationPosition,
    search: TypeaheadSearch,
    active: bool,
}

impl ListMenu {
    /// Create a closed menu.
    #[must_use]
    pub fn new(id: impl Into<SurfaceId>, title: impl Into<String>, items: Vec<String>) -> Self {
        let count = items.len();
        Self {
            id: id.into(),
            title: title.into(),
            items,
            position: NavigationPosition::new(0, count),
            search: TypeaheadSearch::new(),
            active: false,
        }
    }

    /// Replace the items; the cursor is clamped and any search dropped.
    pub fn set_items(&mut self, items: Vec<String>) {
        self.position.set_count(items.len());
        self.items = items;
        self.search.clear();
    }

    /// The items.
    #[must_use]
    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Index under the cursor, if the menu has items.
    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        (!self.position.is_empty()).then(|| self.position.index())
    }

    /// Label under the cursor.
    #[must_use]
    pub fn selected_label(&self) -> Option<&str> {
        self.selected().map(|i| self.items[i].as_str())
    }

    /// The search state.
    #[must_use]
    pub const fn search(&self) -> &TypeaheadSearch {
        &self.search
    }

    fn announce_current(&self, ctx: &mut SurfaceContext<'_>) {
        match self.selected_label() {
            Some(label) => ctx.announce_with_position(label, self.position.index(), self.items.len()),
            None => ctx.announce("Empty"),
        }
    }

    fn announce_match(&self, ctx: &mut SurfaceContext<'_>) {
        let Some(label) = self.selected_label() else {
            return;
        };
        match (self.search.match_position(), self.search.match_count()) {
            (Some(k), n) if n > 1 => ctx.announce(format!("{label}, match {k} of {n}")),
            _ => ctx.announce(label),
        }
    }

    fn jump_to_match(&mut self, found: Option<usize>, ctx: &mut SurfaceContext<'_>) {
        if let Some(index) = found {
            self.position.set_index(index);
            self.announce_match(ctx);
        }
    }

    fn move_cursor(&mut self, action: &KeyAction, page: usize) -> bool {
        match action {
            KeyAction::Up => self.position.previous(),
            KeyAction::Down => self.position.next(),
            KeyAction::Home => self.position.first(),
            KeyAction::End => self.position.last(),
            KeyAction::PageUp => self.position.page_up(page),
            KeyAction::PageDown => self.position.page_down(page),
            _ => false,
        }
    }

    fn type_char(&mut self, ch: char, ctx: &mut SurfaceContext<'_>) -> KeyfenceResult<SurfaceAction> {
        match self.search.process_char(ch, &self.items, ctx.now) {
            Some(index) => {
                self.position.set_index(index);
                let label = &self.items[index];
                let count = self.search.match_count();
                if count == 1 {
                    ctx.announce(format!("{label}, 1 match"));
                } else {
                    ctx.announce(format!("{label}, {count} matches"));
                }
                Ok(SurfaceAction::Consumed)
            }
            None => Err(KeyfenceError::NoMatches {
                query: self.search.take_last_failed_search().unwrap_or_default(),
            }),
        }
    }
}

impl Surface for ListMenu {
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
        self.position = NavigationPosition::new(0, self.items.len());
        self.search = TypeaheadSearch::with_timeout(ctx.config.typeahead_timeout());
        ctx.announce(&self.title);
        self.announce_current(ctx);
    }

    fn close(&mut self, _ctx: &mut SurfaceContext<'_>) {
        self.active = false;
        self.search.clear();
        self.position.first();
    }

    fn handle_input(
        &mut self,
        event: &KeyEvent,
        ctx: &mut SurfaceContext<'_>,
    ) -> KeyfenceResult<SurfaceAction> {
        let action = ctx.action(event).cloned();
        match action {
            Some(KeyAction::Up) if self.search.has_active_search() => {
                let found = self.search.previous_match(self.position.index());
                self.jump_to_match(found, ctx);
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::Down) if self.search.has_active_search() => {
                let found = self.search.next_match(self.position.index());
                self.jump_to_match(found, ctx);
                Ok(SurfaceAction::Consumed)
            }
            Some(
                ref moved @ (KeyAction::Up
                | KeyAction::Down
                | KeyAction::Home
                | KeyAction::End
                | KeyAction::PageUp
                | KeyAction::PageDown),
            ) => {
                self.move_cursor(moved, ctx.config.page_size);
                // Re-announcing at the boundary tells the user they hit the end.
                self.announce_current(ctx);
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::NextMatch | KeyAction::PreviousMatch)
                if !self.search.has_active_search() =>
            {
                Err(KeyfenceError::no_target("cycle through"))
            }
            Some(KeyAction::NextMatch) => {
                let found = self.search.next_match(self.position.index());
                self.jump_to_match(found, ctx);
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::PreviousMatch) => {
                let found = self.search.previous_match(self.position.index());
                self.jump_to_match(found, ctx);
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::DeleteBack) => {
                match self.search.process_backspace(&self.items, ctx.now) {
                    BackspaceOutcome::Unchanged => return Ok(SurfaceAction::Ignored),
                    BackspaceOutcome::Cleared => ctx.announce("Search cleared"),
                    BackspaceOutcome::Matched(index) => {
                        self.position.set_index(index);
                        self.announce_match(ctx);
                    }
                }
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::Confirm) => {
                let (Some(index), Some(label)) = (self.selected(), self.selected_label()) else {
                    return Err(KeyfenceError::no_target("select"));
                };
                let label = label.to_owned();
                ctx.emit(SurfaceOutcome::Selected {
                    surface: self.id.clone(),
                    index,
                    label,
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
