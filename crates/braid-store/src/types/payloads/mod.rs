//! Typed payload definitions for each [`EventType`](super::EventType).
//!
//! Payloads are stored as opaque JSON in the events table; these structs are
//! the opt-in typed view obtained through
//! [`SessionEvent::typed_payload()`](super::SessionEvent::typed_payload).
//! All fields use camelCase naming on the wire.

pub mod compact;
pub mod config;
pub mod context;
pub mod error;
pub mod file;
pub mod message;
pub mod metadata;
pub mod rules;
pub mod session;
pub mod skill;
pub mod streaming;
pub mod tool;
pub mod worktree;

pub use braid_core::tokens::TokenUsage;
