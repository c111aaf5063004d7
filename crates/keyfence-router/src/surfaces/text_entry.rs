//! Single-line text field for the text-capture tier.

use std::any::Any;

use keyfence_core::{KeyAction, KeyEvent, KeyfenceError, KeyfenceResult};

use crate::surface::{Surface, SurfaceAction, SurfaceContext, SurfaceId, SurfaceOutcome};

/// An editable line of text.
///
/// Typed characters insert at the caret and are echoed. Enter commits the
/// text; Escape restores what was there on open.
///
/// Left/Right and Home/End move the caret, but [`KeyFilter::text_capture`]
/// absorbs them before they arrive. A host that wants caret movement routes
/// the field with a wider filter, for example
/// `KeyFilter::only([Confirm, Cancel, DeleteBack, DeleteForward, Left, Right, Home, End], true)`.
///
/// [`KeyFilter::text_capture`]: crate::KeyFilter::text_capture
#[derive(Debug)]
pub struct TextEntry {
    id: SurfaceId,
    title: String,
    text: String,
    /// Caret position in characters, not bytes.
    caret: usize,
    snapshot: String,
    active: bool,
}

impl TextEntry {
    /// Create a closed, empty field.
    #[must_use]
    pub fn new(id: impl Into<SurfaceId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            text: String::new(),
            caret: 0,
            snapshot: String::new(),
            active: false,
        }
    }

    /// Start with `text` already in the field.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    /// Replace the text; the caret moves to the end.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.caret = self.char_len();
    }

    /// Current text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Caret position in characters.
    #[must_use]
    pub const fn caret(&self) -> usize {
        self.caret
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.text
            .char_indices()
            .nth(chars)
            .map_or(self.text.len(), |(offset, _)| offset)
    }

    fn speak_text(&self, ctx: &mut SurfaceContext<'_>) {
        if self.text.is_empty() {
            ctx.announce("Blank");
        } else {
            ctx.announce(&self.text);
        }
    }

    fn speak_char_at(&self, index: usize, ctx: &mut SurfaceContext<'_>) {
        match self.text.chars().nth(index) {
            Some(ch) => ctx.announce(ch.to_string()),
            None => ctx.announce("End"),
        }
    }
}

impl Surface for TextEntry {
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
        self.snapshot.clone_from(&self.text);
        self.caret = self.char_len();
        if self.text.is_empty() {
            ctx.announce(format!("{}, edit text", self.title));
        } else {
            ctx.announce(format!("{}, edit text, {}", self.title, self.text));
        }
    }

    fn close(&mut self, _ctx: &mut SurfaceContext<'_>) {
        self.active = false;
        self.snapshot.clear();
        self.caret = self.char_len();
    }

    fn handle_input(
        &mut self,
        event: &KeyEvent,
        ctx: &mut SurfaceContext<'_>,
    ) -> KeyfenceResult<SurfaceAction> {
        let action = ctx.action(event).cloned();
        match action {
            Some(KeyAction::DeleteBack) => {
                if self.caret == 0 {
                    return Err(KeyfenceError::no_target("delete"));
                }
                self.caret -= 1;
                let at = self.byte_offset(self.caret);
                let removed = self.text.remove(at);
                ctx.announce(removed.to_string());
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::DeleteForward) => {
                if self.caret >= self.char_len() {
                    return Err(KeyfenceError::no_target("delete"));
                }
                let at = self.byte_offset(self.caret);
                let removed = self.text.remove(at);
                ctx.announce(removed.to_string());
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::Left) => {
                self.caret = self.caret.saturating_sub(1);
                self.speak_char_at(self.caret, ctx);
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::Right) => {
                self.caret = (self.caret + 1).min(self.char_len());
                self.speak_char_at(self.caret, ctx);
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::Home) => {
                self.caret = 0;
                self.speak_text(ctx);
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::End) => {
                self.caret = self.char_len();
                self.speak_text(ctx);
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::Confirm) => {
                ctx.emit(SurfaceOutcome::TextCommitted {
                    surface: self.id.clone(),
                    text: self.text.clone(),
                });
                ctx.announce(format!("{} set", self.title));
                Ok(SurfaceAction::Close)
            }
            Some(KeyAction::Cancel) => {
                if self.has_unsaved_changes() {
                    ctx.announce("Changes discarded");
                }
                self.text = std::mem::take(&mut self.snapshot);
                ctx.emit(SurfaceOutcome::Cancelled {
                    surface: self.id.clone(),
                });
                Ok(SurfaceAction::Close)
            }
            _ => match event.text_char() {
                Some(ch) => {
                    let at = self.byte_offset(self.caret);
                    self.text.insert(at, ch);
                    self.caret += 1;
                    ctx.announce(ch.to_string());
                    Ok(SurfaceAction::Consumed)
                }
                None => Ok(SurfaceAction::Ignored),
            },
        }
    }

    fn has_unsaved_changes(&self) -> bool {
        self.active && self.text != self.snapshot
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
