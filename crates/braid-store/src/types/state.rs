//! Projection and query output types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use braid_core::ids::{BranchId, EventId, SessionId, WorkspaceId};
use braid_core::tokens::TokenUsage;

use super::event_type::EventType;

/// A reconstructed message, ready for an LLM API.
///
/// `content` is a plain string or a block array for user messages and always
/// a block array for assistant messages. Tool results appear as
/// `tool_result` blocks inside user messages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// "user" or "assistant".
    pub role: String,
    /// Message content.
    pub content: Value,
}

/// A reconstructed message with its source event IDs.
///
/// Merged messages carry multiple IDs; synthetic messages (compaction pair,
/// flushed tool results) carry `None` slots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageWithEventId {
    /// The reconstructed message.
    pub message: Message,
    /// Source event IDs, oldest first.
    pub event_ids: Vec<Option<EventId>>,
}

/// Full session state at a given event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Session ID.
    pub session_id: SessionId,
    /// Workspace ID.
    pub workspace_id: WorkspaceId,
    /// Event the state was projected at.
    pub head_event_id: EventId,
    /// Current model (from the session's latest-model cache).
    pub model: String,
    /// Working directory.
    pub working_directory: String,
    /// Reconstructed messages.
    pub messages_with_event_ids: Vec<MessageWithEventId>,
    /// Aggregate token usage over non-deleted message events.
    pub token_usage: TokenUsage,
    /// Highest turn number seen on assistant events.
    pub turn_count: i64,
    /// Provider name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Effective system prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Effective reasoning level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_level: Option<String>,
    /// Whether the session has ended.
    pub is_ended: bool,
}

/// Workspace info.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    /// Workspace ID.
    pub id: WorkspaceId,
    /// Absolute path.
    pub path: String,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last activity timestamp.
    pub last_activity_at: String,
    /// Number of sessions.
    pub session_count: i64,
}

/// A named head pointer within a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    /// Branch ID.
    pub id: BranchId,
    /// Branch name.
    pub name: String,
    /// Session ID.
    pub session_id: SessionId,
    /// Root event ID.
    pub root_event_id: EventId,
    /// Current head event ID.
    pub head_event_id: EventId,
    /// Whether this is the default branch.
    pub is_default: bool,
    /// Creation timestamp.
    pub created_at: String,
}

/// One full-text search hit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Backing event ID.
    pub event_id: EventId,
    /// Session the event belongs to.
    pub session_id: SessionId,
    /// Event type.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Event timestamp.
    pub timestamp: String,
    /// Content snippet with match markers.
    pub snippet: String,
    /// Positive relevance score (|BM25|); results arrive best first.
    pub score: f64,
}
