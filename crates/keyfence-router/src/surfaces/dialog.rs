//! Blocking confirmation prompt.

use std::any::Any;

use keyfence_core::{KeyAction, KeyEvent, KeyfenceError, KeyfenceResult};
use keyfence_nav::NavigationPosition;

use crate::surface::{Surface, SurfaceAction, SurfaceContext, SurfaceId, SurfaceOutcome};

/// A message with a short row of options ("Yes", "No").
///
/// Meant for the dialog-blocking tier: the guard's filter keeps hotkeys
/// and letters away, so only movement, Enter and Escape arrive here.
#[derive(Debug)]
pub struct ConfirmPrompt {
    id: SurfaceId,
    title: String,
    message: String,
    options: Vec<String>,
    position: NavigationPosition,
    active: bool,
}

impl ConfirmPrompt {
    /// Create a closed prompt.
    #[must_use]
    pub fn new(
        id: impl Into<SurfaceId>,
        title: impl Into<String>,
        message: impl Into<String>,
        options: Vec<String>,
    ) -> Self {
        let count = options.len();
        Self {
            id: id.into(),
            title: title.into(),
            message: message.into(),
            options,
            position: NavigationPosition::new(0, count),
            active: false,
        }
    }

    /// A prompt offering "Yes" and "No".
    #[must_use]
    pub fn yes_no(id: impl Into<SurfaceId>, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(id, title, message, vec!["Yes".to_owned(), "No".to_owned()])
    }

    /// Replace the message spoken on the next open.
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    /// The message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The options.
    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Index of the highlighted option.
    #[must_use]
    pub fn highlighted(&self) -> Option<usize> {
        (!self.position.is_empty()).then(|| self.position.index())
    }

    fn announce_option(&self, ctx: &mut SurfaceContext<'_>) {
        if let Some(index) = self.highlighted() {
            ctx.announce_with_position(&self.options[index], index, self.options.len());
        }
    }
}

impl Surface for ConfirmPrompt {
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
        self.position = NavigationPosition::new(0, self.options.len());
        ctx.announce(format!("{}. {}", self.title, self.message));
        self.announce_option(ctx);
    }

    fn close(&mut self, _ctx: &mut SurfaceContext<'_>) {
        self.active = false;
        self.position.first();
    }

    fn handle_input(
        &mut self,
        event: &KeyEvent,
        ctx: &mut SurfaceContext<'_>,
    ) -> KeyfenceResult<SurfaceAction> {
        let action = ctx.action(event).cloned();
        match action {
            Some(KeyAction::Up | KeyAction::Left) => {
                self.position.previous();
                self.announce_option(ctx);
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::Down | KeyAction::Right) => {
                self.position.next();
                self.announce_option(ctx);
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::Home) => {
                self.position.first();
                self.announce_option(ctx);
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::End) => {
                self.position.last();
                self.announce_option(ctx);
                Ok(SurfaceAction::Consumed)
            }
            Some(KeyAction::Confirm) => {
                let Some(option) = self.highlighted() else {
                    return Err(KeyfenceError::no_target("confirm"));
                };
                ctx.emit(SurfaceOutcome::Confirmed {
                    surface: self.id.clone(),
                    option,
                    label: self.options[option].clone(),
                });
                Ok(SurfaceAction::Close)
            }
            Some(KeyAction::Cancel) => {
                ctx.emit(SurfaceOutcome::Cancelled {
                    surface: self.id.clone(),
                });
                ctx.announce("Cancelled");
                Ok(SurfaceAction::Close)
            }
            _ => Ok(SurfaceAction::Ignored),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use keyfence_core::KeyCode;

    use super::*;
    use crate::surfaces::test_support::Harness;

    fn opened(h: &mut Harness) -> ConfirmPrompt {
        let mut prompt = ConfirmPrompt::yes_no("prompt.quit", "Quit", "Abandon this fortress?");
        prompt.open(&mut h.ctx());
        prompt
    }

    #[test]
    fn open_speaks_message_then_option() {
        let mut h = Harness::new();
        let prompt = opened(&mut h);
        assert!(prompt.is_active());
        assert_eq!(h.speech.texts(), vec!["Quit. Abandon this fortress?", "Yes, 1 of 2"]);
    }

    #[test]
    fn arrows_move_between_options() {
        let mut h = Harness::new();
        let mut prompt = opened(&mut h);
        h.key(&mut prompt, KeyCode::Right).unwrap();
        assert_eq!(prompt.highlighted(), Some(1));
        assert_eq!(h.last(), "No, 2 of 2");
        h.key(&mut prompt, KeyCode::Down).unwrap();
        assert_eq!(prompt.highlighted(), Some(1));
        h.key(&mut prompt, KeyCode::Home).unwrap();
        assert_eq!(h.last(), "Yes, 1 of 2");
    }

    #[test]
    fn enter_confirms_highlighted_option() {
        let mut h = Harness::new();
        let mut prompt = opened(&mut h);
        h.key(&mut prompt, KeyCode::End).unwrap();
        assert_eq!(h.key(&mut prompt, KeyCode::Enter).unwrap(), SurfaceAction::Close);
        assert_eq!(
            h.outcomes.pop_front(),
            Some(SurfaceOutcome::Confirmed {
                surface: SurfaceId::new("prompt.quit"),
                option: 1,
                label: "No".to_string(),
            })
        );
    }

    #[test]
    fn escape_cancels() {
        let mut h = Harness::new();
        let mut prompt = opened(&mut h);
        assert_eq!(h.key(&mut prompt, KeyCode::Esc).unwrap(), SurfaceAction::Close);
        assert!(matches!(h.outcomes.pop_front(), Some(SurfaceOutcome::Cancelled { .. })));
    }

    #[test]
    fn letters_are_ignored() {
        let mut h = Harness::new();
        let mut prompt = opened(&mut h);
        assert_eq!(h.key(&mut prompt, KeyCode::Char('y')).unwrap(), SurfaceAction::Ignored);
    }

    #[test]
    fn prompt_without_options_cannot_confirm() {
        let mut h = Harness::new();
        let mut prompt = ConfirmPrompt::new("p", "Notice", "Done.", Vec::new());
        prompt.open(&mut h.ctx());
        assert_eq!(h.speech.texts(), vec!["Notice. Done."]);
        assert!(h.key(&mut prompt, KeyCode::Enter).unwrap_err().is_expected());
    }
}
