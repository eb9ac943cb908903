//! Content lifecycle for posts and pages.
//!
//! - `slug`: per-kind unique slug allocation
//! - `lifecycle`: trash/restore/publish transitions and bulk actions
//! - `text`: tag stripping, word counts and read time
//! - `service`: editor save and auto-save paths

pub mod lifecycle;
mod service;
pub mod slug;
pub mod text;

pub use lifecycle::{BulkAction, Transition};
pub use service::{ContentService, SaveAction};
