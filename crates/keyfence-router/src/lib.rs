//! Priority dispatch and the modal surface contract.
//!
//! ```text
//! key event ─► EventRouter ─► guard table (declaration order = priority)
//!                 │             ├─ text capture     (typed chars only)
//!                 │             ├─ dialog blocking  (own keys only)
//!                 │             ├─ world / overlay
//!                 │             ├─ domain surfaces  (menus, trees, prompts)
//!                 │             ├─ ambient hotkeys  (no surface active)
//!                 │             └─ catch-all        (absorbs leftovers)
//!                 ▼
//!              Session ─► Surface::handle_input(event, SurfaceContext)
//! ```
//!
//! Hosts register [`Surface`] implementations in a [`Session`], describe
//! the guard table with [`EventRouter::builder`], and call
//! [`EventRouter::dispatch`] for every key. A `true` return means the host
//! must skip its own binding for that key.

#![forbid(unsafe_code)]

pub mod guard;
pub mod router;
pub mod session;
pub mod surface;
pub mod surfaces;

// ─── Re-exports ─────────────────────────────────────────────────────────────

pub use guard::{AmbientAction, Guard, InvokeFn, KeyFilter, Tier};
pub use router::{DispatchOutcome, DispatchTrace, EventRouter, RouterBuilder};
pub use session::{HostState, Session, SurfaceRegistry};
pub use surface::{Surface, SurfaceAction, SurfaceContext, SurfaceId, SurfaceOutcome};
pub use surfaces::{ConfirmPrompt, ListMenu, TextEntry, TreeItem, TreeMenu};
