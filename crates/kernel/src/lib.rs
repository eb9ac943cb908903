//! Atelier kernel library.
//!
//! Exposes the site kernel for the `atelier` binary and for integration
//! tests: content lifecycle, comment moderation, the media library and the
//! Gmail mailer behind an axum router.

pub mod cli;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod file;
pub mod mail;
pub mod models;
pub mod routes;
pub mod session;
pub mod state;

pub use config::Config;
pub use state::AppState;
