//! # braid-core
//!
//! Shared primitives for the braid session store:
//!
//! - **Branded IDs**: prefixed, time-orderable identifiers ([`SessionId`],
//!   [`EventId`], [`WorkspaceId`], [`BranchId`], [`BlobId`], [`ToolCallId`])
//! - **Token usage**: the camelCase wire struct providers report
//! - **Pricing**: per-model cost tables consumed by the append engine

#![deny(unsafe_code)]

pub mod ids;
pub mod pricing;
pub mod tokens;

pub use ids::{BlobId, BranchId, EventId, SessionId, ToolCallId, WorkspaceId};
pub use pricing::calculate_cost;
pub use tokens::TokenUsage;
