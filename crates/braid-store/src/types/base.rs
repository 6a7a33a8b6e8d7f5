//! The [`SessionEvent`] struct — the persisted unit of truth.
//!
//! Events are a flat record with base fields at the top level and the
//! type-specific `payload` carried as opaque [`serde_json::Value`]. Typed
//! access is opt-in via [`SessionEvent::typed_payload()`], which dispatches
//! on [`EventType`] and deserializes into the matching payload struct.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use braid_core::ids::{EventId, SessionId, WorkspaceId};

use super::event_type::EventType;
use super::payloads;

/// A persisted session event in canonical wire shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEvent {
    /// Unique event ID (UUID v7).
    pub id: EventId,
    /// Parent event ID (`null` only for `session.start` roots).
    pub parent_id: Option<EventId>,
    /// Session this event belongs to.
    pub session_id: SessionId,
    /// Workspace this event belongs to.
    pub workspace_id: WorkspaceId,
    /// ISO 8601 timestamp, millisecond precision.
    pub timestamp: String,
    /// Event type discriminator.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Monotonic sequence number within the session.
    pub sequence: i64,
    /// Integrity checksum over (parent id + payload).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Event-specific data (opaque JSON).
    pub payload: Value,
}

/// Typed payload for compile-time-safe access.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEventPayload {
    /// `session.start`
    SessionStart(payloads::session::SessionStartPayload),
    /// `session.end`
    SessionEnd(payloads::session::SessionEndPayload),
    /// `session.fork`
    SessionFork(payloads::session::SessionForkPayload),
    /// `session.branch`
    SessionBranch(payloads::session::SessionBranchPayload),
    /// `message.user`
    MessageUser(payloads::message::UserMessagePayload),
    /// `message.assistant`
    MessageAssistant(payloads::message::AssistantMessagePayload),
    /// `message.system`
    MessageSystem(payloads::message::SystemMessagePayload),
    /// `message.deleted`
    MessageDeleted(payloads::message::MessageDeletedPayload),
    /// `tool.call`
    ToolCall(payloads::tool::ToolCallPayload),
    /// `tool.result`
    ToolResult(payloads::tool::ToolResultPayload),
    /// `stream.turn_start`
    StreamTurnStart(payloads::streaming::StreamTurnStartPayload),
    /// `stream.turn_end`
    StreamTurnEnd(payloads::streaming::StreamTurnEndPayload),
    /// `stream.text_delta`
    StreamTextDelta(payloads::streaming::StreamTextDeltaPayload),
    /// `stream.thinking_delta`
    StreamThinkingDelta(payloads::streaming::StreamThinkingDeltaPayload),
    /// `config.model_switch`
    ConfigModelSwitch(payloads::config::ConfigModelSwitchPayload),
    /// `config.prompt_update`
    ConfigPromptUpdate(payloads::config::ConfigPromptUpdatePayload),
    /// `config.reasoning_level`
    ConfigReasoningLevel(payloads::config::ConfigReasoningLevelPayload),
    /// `compact.boundary`
    CompactBoundary(payloads::compact::CompactBoundaryPayload),
    /// `compact.summary`
    CompactSummary(payloads::compact::CompactSummaryPayload),
    /// `context.cleared`
    ContextCleared(payloads::context::ContextClearedPayload),
    /// `metadata.update`
    MetadataUpdate(payloads::metadata::MetadataUpdatePayload),
    /// `metadata.tag`
    MetadataTag(payloads::metadata::MetadataTagPayload),
    /// `file.read`
    FileRead(payloads::file::FileReadPayload),
    /// `file.write`
    FileWrite(payloads::file::FileWritePayload),
    /// `file.edit`
    FileEdit(payloads::file::FileEditPayload),
    /// `worktree.acquired`
    WorktreeAcquired(payloads::worktree::WorktreeAcquiredPayload),
    /// `worktree.commit`
    WorktreeCommit(payloads::worktree::WorktreeCommitPayload),
    /// `worktree.released`
    WorktreeReleased(payloads::worktree::WorktreeReleasedPayload),
    /// `worktree.merged`
    WorktreeMerged(payloads::worktree::WorktreeMergedPayload),
    /// `rules.loaded`
    RulesLoaded(payloads::rules::RulesLoadedPayload),
    /// `skill.added`
    SkillAdded(payloads::skill::SkillAddedPayload),
    /// `skill.removed`
    SkillRemoved(payloads::skill::SkillRemovedPayload),
    /// `error.agent`
    ErrorAgent(payloads::error::ErrorAgentPayload),
    /// `error.tool`
    ErrorTool(payloads::error::ErrorToolPayload),
    /// `error.provider`
    ErrorProvider(payloads::error::ErrorProviderPayload),
}

impl SessionEvent {
    /// Deserialize the payload into the typed variant matching
    /// [`event_type`](Self::event_type).
    ///
    /// Returns `Err` when the payload JSON does not match the expected shape.
    #[allow(clippy::too_many_lines)]
    pub fn typed_payload(&self) -> std::result::Result<SessionEventPayload, serde_json::Error> {
        let p = self.payload.clone();
        Ok(match self.event_type {
            EventType::SessionStart => {
                SessionEventPayload::SessionStart(serde_json::from_value(p)?)
            }
            EventType::SessionEnd => SessionEventPayload::SessionEnd(serde_json::from_value(p)?),
            EventType::SessionFork => SessionEventPayload::SessionFork(serde_json::from_value(p)?),
            EventType::SessionBranch => {
                SessionEventPayload::SessionBranch(serde_json::from_value(p)?)
            }
            EventType::MessageUser => SessionEventPayload::MessageUser(serde_json::from_value(p)?),
            EventType::MessageAssistant => {
                SessionEventPayload::MessageAssistant(serde_json::from_value(p)?)
            }
            EventType::MessageSystem => {
                SessionEventPayload::MessageSystem(serde_json::from_value(p)?)
            }
            EventType::MessageDeleted => {
                SessionEventPayload::MessageDeleted(serde_json::from_value(p)?)
            }
            EventType::ToolCall => SessionEventPayload::ToolCall(serde_json::from_value(p)?),
            EventType::ToolResult => SessionEventPayload::ToolResult(serde_json::from_value(p)?),
            EventType::StreamTurnStart => {
                SessionEventPayload::StreamTurnStart(serde_json::from_value(p)?)
            }
            EventType::StreamTurnEnd => {
                SessionEventPayload::StreamTurnEnd(serde_json::from_value(p)?)
            }
            EventType::StreamTextDelta => {
                SessionEventPayload::StreamTextDelta(serde_json::from_value(p)?)
            }
            EventType::StreamThinkingDelta => {
                SessionEventPayload::StreamThinkingDelta(serde_json::from_value(p)?)
            }
            EventType::ConfigModelSwitch => {
                SessionEventPayload::ConfigModelSwitch(serde_json::from_value(p)?)
            }
            EventType::ConfigPromptUpdate => {
                SessionEventPayload::ConfigPromptUpdate(serde_json::from_value(p)?)
            }
            EventType::ConfigReasoningLevel => {
                SessionEventPayload::ConfigReasoningLevel(serde_json::from_value(p)?)
            }
            EventType::CompactBoundary => {
                SessionEventPayload::CompactBoundary(serde_json::from_value(p)?)
            }
            EventType::CompactSummary => {
                SessionEventPayload::CompactSummary(serde_json::from_value(p)?)
            }
            EventType::ContextCleared => {
                SessionEventPayload::ContextCleared(serde_json::from_value(p)?)
            }
            EventType::MetadataUpdate => {
                SessionEventPayload::MetadataUpdate(serde_json::from_value(p)?)
            }
            EventType::MetadataTag => SessionEventPayload::MetadataTag(serde_json::from_value(p)?),
            EventType::FileRead => SessionEventPayload::FileRead(serde_json::from_value(p)?),
            EventType::FileWrite => SessionEventPayload::FileWrite(serde_json::from_value(p)?),
            EventType::FileEdit => SessionEventPayload::FileEdit(serde_json::from_value(p)?),
            EventType::WorktreeAcquired => {
                SessionEventPayload::WorktreeAcquired(serde_json::from_value(p)?)
            }
            EventType::WorktreeCommit => {
                SessionEventPayload::WorktreeCommit(serde_json::from_value(p)?)
            }
            EventType::WorktreeReleased => {
                SessionEventPayload::WorktreeReleased(serde_json::from_value(p)?)
            }
            EventType::WorktreeMerged => {
                SessionEventPayload::WorktreeMerged(serde_json::from_value(p)?)
            }
            EventType::RulesLoaded => SessionEventPayload::RulesLoaded(serde_json::from_value(p)?),
            EventType::SkillAdded => SessionEventPayload::SkillAdded(serde_json::from_value(p)?),
            EventType::SkillRemoved => {
                SessionEventPayload::SkillRemoved(serde_json::from_value(p)?)
            }
            EventType::ErrorAgent => SessionEventPayload::ErrorAgent(serde_json::from_value(p)?),
            EventType::ErrorTool => SessionEventPayload::ErrorTool(serde_json::from_value(p)?),
            EventType::ErrorProvider => {
                SessionEventPayload::ErrorProvider(serde_json::from_value(p)?)
            }
        })
    }
}
