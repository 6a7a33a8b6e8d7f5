//! # braid-store
//!
//! Event-sourced session tree store over a single embedded SQLite database.
//!
//! Conversations are append-only trees of events; any point of history can
//! be projected back into an LLM-ready message list by replaying its
//! ancestor chain. Sessions are linear pointer heads into the tree, forks
//! share history through a single cross-session edge, and every event is
//! indexed for full-text search at append time.
//!
//! - **Event model**: [`EventType`], [`SessionEvent`], per-type payloads
//! - **Backend**: pooled `rusqlite` connections, versioned migrations,
//!   stateless repositories composed inside transactions
//! - **Append protocol**: dense per-session sequences, head advance,
//!   denormalized counters, FTS row — all atomic
//! - **Projection**: two-pass message reconstruction honoring deletions,
//!   compaction, context clears, and tool-result sequencing
//! - **Fork**: a new session whose root points into the source history
//! - **Search**: FTS5 with BM25 ranking and scope filters

#![deny(unsafe_code)]

pub mod checksum;
pub mod errors;
pub mod factory;
pub mod reconstruct;
pub mod sqlite;
pub mod store;
pub mod types;

pub use errors::{EventStoreError, Result};
pub use factory::EventChainBuilder;
pub use reconstruct::{
    reconstruct_from_events, ReconstructedTokenUsage, ReconstructionResult,
    COMPACTION_ACK_TEXT, COMPACTION_SUMMARY_PREFIX,
};
pub use sqlite::repositories::event::ListEventsOptions;
pub use sqlite::repositories::search::SearchOptions;
pub use sqlite::repositories::session::ListSessionsOptions;
pub use sqlite::{new_file, new_in_memory, new_pool, run_migrations, ConnectionConfig};
pub use store::{
    AppendOptions, CreateSessionResult, EventStore, ForkOptions, ForkResult, SessionOptions,
};
pub use types::{
    EventType, Message, MessageWithEventId, SearchResult, SessionEvent, SessionEventPayload,
    SessionState, ALL_EVENT_TYPES,
};
