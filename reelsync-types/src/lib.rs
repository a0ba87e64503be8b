//! # reelsync-types
//!
//! Shared type definitions for reelsync collaborative review sessions.
//! This crate holds the viewer-state model that the network layer keeps in
//! sync: reels, media, annotations and display settings, plus the
//! `Command` vocabulary that mutates them.

pub mod command;
mod error;
pub mod reduce;
pub mod state;
pub mod sync;
mod viewer;

pub use command::*;
pub use error::Rejection;
pub use sync::sync_script;
pub use viewer::Viewer;

// Re-export all state types at crate root for convenience
pub use state::*;
