//! Raw database row types.
//!
//! These mirror table shapes, including the denormalized columns the insert
//! path extracts from payloads. The event `type` stays a plain string here so
//! rows written by newer versions with unrecognized types still round-trip
//! through storage untouched.

use serde::{Deserialize, Serialize};

use braid_core::ids::{BlobId, BranchId, EventId, SessionId, WorkspaceId};

/// Raw row from the `events` table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventRow {
    /// Event ID.
    pub id: EventId,
    /// Session ID.
    pub session_id: SessionId,
    /// Parent event ID.
    pub parent_id: Option<EventId>,
    /// Sequence number within the session.
    pub sequence: i64,
    /// Depth from the root.
    pub depth: i64,
    /// Event type wire string.
    #[serde(rename = "type")]
    pub event_type: String,
    /// ISO 8601 timestamp.
    pub timestamp: String,
    /// Payload JSON text.
    pub payload: String,
    /// Blob holding offloaded content, if any.
    pub content_blob_id: Option<BlobId>,
    /// Workspace ID.
    pub workspace_id: WorkspaceId,
    /// Denormalized message role.
    pub role: Option<String>,
    /// Denormalized tool name.
    pub tool_name: Option<String>,
    /// Denormalized tool call ID.
    pub tool_call_id: Option<String>,
    /// Denormalized turn number.
    pub turn: Option<i64>,
    /// Denormalized input tokens.
    pub input_tokens: Option<i64>,
    /// Denormalized output tokens.
    pub output_tokens: Option<i64>,
    /// Denormalized cache read tokens.
    pub cache_read_tokens: Option<i64>,
    /// Denormalized cache creation tokens.
    pub cache_creation_tokens: Option<i64>,
    /// Integrity checksum.
    pub checksum: Option<String>,
}

/// Raw row from the `sessions` table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionRow {
    /// Session ID.
    pub id: SessionId,
    /// Workspace ID.
    pub workspace_id: WorkspaceId,
    /// Head event ID (advances on every append).
    pub head_event_id: Option<EventId>,
    /// Root event ID.
    pub root_event_id: Option<EventId>,
    /// Session title.
    pub title: Option<String>,
    /// Latest model (denormalized cache; `config.model_switch` events are
    /// the source of truth).
    pub latest_model: String,
    /// Provider name.
    pub provider: Option<String>,
    /// Working directory.
    pub working_directory: String,
    /// Parent session (fork lineage).
    pub parent_session_id: Option<SessionId>,
    /// Fork point event (fork lineage).
    pub fork_from_event_id: Option<EventId>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last activity timestamp.
    pub last_activity_at: String,
    /// End timestamp (null = active).
    pub ended_at: Option<String>,
    /// Event count.
    pub event_count: i64,
    /// Message count (message.user + message.assistant).
    pub message_count: i64,
    /// Turn count.
    pub turn_count: i64,
    /// Total input tokens.
    pub total_input_tokens: i64,
    /// Total output tokens.
    pub total_output_tokens: i64,
    /// Total cache read tokens.
    pub total_cache_read_tokens: i64,
    /// Total cache creation tokens.
    pub total_cache_creation_tokens: i64,
    /// Context-window occupancy of the last turn. A snapshot — summing it
    /// across rows or over time is meaningless.
    pub last_turn_input_tokens: i64,
    /// Total cost in USD.
    pub total_cost: f64,
    /// Tags as a JSON array string.
    pub tags: String,
}

/// Raw row from the `workspaces` table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkspaceRow {
    /// Workspace ID.
    pub id: WorkspaceId,
    /// Absolute path (unique).
    pub path: String,
    /// Display name.
    pub name: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last activity timestamp.
    pub last_activity_at: String,
    /// Session count (computed via subquery on reads).
    pub session_count: Option<i64>,
}

/// Raw row from the `branches` table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BranchRow {
    /// Branch ID.
    pub id: BranchId,
    /// Session ID.
    pub session_id: SessionId,
    /// Branch name.
    pub name: String,
    /// Root event ID.
    pub root_event_id: EventId,
    /// Current head event ID.
    pub head_event_id: EventId,
    /// Whether this is the default branch.
    pub is_default: bool,
    /// Creation timestamp.
    pub created_at: String,
    /// Last activity timestamp.
    pub last_activity_at: String,
}

/// Raw row from the `blobs` table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlobRow {
    /// Blob ID.
    pub id: BlobId,
    /// SHA-256 content hash (unique).
    pub hash: String,
    /// Content bytes.
    pub content: Vec<u8>,
    /// MIME type.
    pub mime_type: String,
    /// Original size in bytes.
    pub size_original: i64,
    /// Compressed size in bytes.
    pub size_compressed: i64,
    /// Compression scheme.
    pub compression: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Reference count.
    pub ref_count: i64,
}
