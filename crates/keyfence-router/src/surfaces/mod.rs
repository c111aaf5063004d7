//! Reference surfaces built on the shared navigation primitives.
//!
//! These carry no domain rules of their own. Hosts use them directly for
//! plain menus and prompts, or as models for their own surfaces.

pub mod dialog;
pub mod list_menu;
pub mod text_entry;
pub mod tree_menu;

pub use dialog::ConfirmPrompt;
pub use list_menu::ListMenu;
pub use text_entry::TextEntry;
pub use tree_menu::{TreeItem, TreeMenu};
