//! The [`EventType`] enum — every persisted session event discriminator.
//!
//! Each variant has an exact `#[serde(rename)]` matching the dot-separated
//! wire string (e.g. `"session.start"`). The set is closed: unknown strings
//! fail `FromStr`, and payloads for future types round-trip as opaque JSON
//! without a variant here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// All persisted session event types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    // -- Session lifecycle --
    /// New session started (root event).
    #[serde(rename = "session.start")]
    SessionStart,
    /// Session ended.
    #[serde(rename = "session.end")]
    SessionEnd,
    /// Session forked from another (root event).
    #[serde(rename = "session.fork")]
    SessionFork,
    /// Named branch created within a session.
    #[serde(rename = "session.branch")]
    SessionBranch,

    // -- Messages --
    /// User message.
    #[serde(rename = "message.user")]
    MessageUser,
    /// Assistant (model) message.
    #[serde(rename = "message.assistant")]
    MessageAssistant,
    /// System-injected message.
    #[serde(rename = "message.system")]
    MessageSystem,
    /// Logical deletion of a prior message event.
    #[serde(rename = "message.deleted")]
    MessageDeleted,

    // -- Tools --
    /// Tool call issued by the model.
    #[serde(rename = "tool.call")]
    ToolCall,
    /// Tool execution result.
    #[serde(rename = "tool.result")]
    ToolResult,

    // -- Streaming boundary records --
    /// Turn started streaming.
    #[serde(rename = "stream.turn_start")]
    StreamTurnStart,
    /// Turn finished streaming.
    #[serde(rename = "stream.turn_end")]
    StreamTurnEnd,
    /// Text delta boundary record.
    #[serde(rename = "stream.text_delta")]
    StreamTextDelta,
    /// Thinking delta boundary record.
    #[serde(rename = "stream.thinking_delta")]
    StreamThinkingDelta,

    // -- Config --
    /// Model switched.
    #[serde(rename = "config.model_switch")]
    ConfigModelSwitch,
    /// System prompt updated.
    #[serde(rename = "config.prompt_update")]
    ConfigPromptUpdate,
    /// Reasoning level changed.
    #[serde(rename = "config.reasoning_level")]
    ConfigReasoningLevel,

    // -- Compaction / context --
    /// Compaction boundary marker.
    #[serde(rename = "compact.boundary")]
    CompactBoundary,
    /// Compaction summary.
    #[serde(rename = "compact.summary")]
    CompactSummary,
    /// Context cleared.
    #[serde(rename = "context.cleared")]
    ContextCleared,

    // -- Metadata --
    /// Session metadata updated.
    #[serde(rename = "metadata.update")]
    MetadataUpdate,
    /// Session tag added or removed.
    #[serde(rename = "metadata.tag")]
    MetadataTag,

    // -- Files --
    /// File read by the agent.
    #[serde(rename = "file.read")]
    FileRead,
    /// File written by the agent.
    #[serde(rename = "file.write")]
    FileWrite,
    /// File edited by the agent.
    #[serde(rename = "file.edit")]
    FileEdit,

    // -- Worktree / git --
    /// Git worktree acquired.
    #[serde(rename = "worktree.acquired")]
    WorktreeAcquired,
    /// Commit made in the worktree.
    #[serde(rename = "worktree.commit")]
    WorktreeCommit,
    /// Worktree released.
    #[serde(rename = "worktree.released")]
    WorktreeReleased,
    /// Worktree merged back.
    #[serde(rename = "worktree.merged")]
    WorktreeMerged,

    // -- Rules / skills --
    /// Rules files loaded.
    #[serde(rename = "rules.loaded")]
    RulesLoaded,
    /// Skill added to the session.
    #[serde(rename = "skill.added")]
    SkillAdded,
    /// Skill removed from the session.
    #[serde(rename = "skill.removed")]
    SkillRemoved,

    // -- Errors --
    /// Agent-level error.
    #[serde(rename = "error.agent")]
    ErrorAgent,
    /// Tool execution error.
    #[serde(rename = "error.tool")]
    ErrorTool,
    /// Provider (LLM) error.
    #[serde(rename = "error.provider")]
    ErrorProvider,
}

/// All variants in definition order, for iteration in tests.
pub const ALL_EVENT_TYPES: [EventType; 35] = [
    EventType::SessionStart,
    EventType::SessionEnd,
    EventType::SessionFork,
    EventType::SessionBranch,
    EventType::MessageUser,
    EventType::MessageAssistant,
    EventType::MessageSystem,
    EventType::MessageDeleted,
    EventType::ToolCall,
    EventType::ToolResult,
    EventType::StreamTurnStart,
    EventType::StreamTurnEnd,
    EventType::StreamTextDelta,
    EventType::StreamThinkingDelta,
    EventType::ConfigModelSwitch,
    EventType::ConfigPromptUpdate,
    EventType::ConfigReasoningLevel,
    EventType::CompactBoundary,
    EventType::CompactSummary,
    EventType::ContextCleared,
    EventType::MetadataUpdate,
    EventType::MetadataTag,
    EventType::FileRead,
    EventType::FileWrite,
    EventType::FileEdit,
    EventType::WorktreeAcquired,
    EventType::WorktreeCommit,
    EventType::WorktreeReleased,
    EventType::WorktreeMerged,
    EventType::RulesLoaded,
    EventType::SkillAdded,
    EventType::SkillRemoved,
    EventType::ErrorAgent,
    EventType::ErrorTool,
    EventType::ErrorProvider,
];

impl EventType {
    /// Canonical wire string (e.g. `"session.start"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SessionStart => "session.start",
            Self::SessionEnd => "session.end",
            Self::SessionFork => "session.fork",
            Self::SessionBranch => "session.branch",
            Self::MessageUser => "message.user",
            Self::MessageAssistant => "message.assistant",
            Self::MessageSystem => "message.system",
            Self::MessageDeleted => "message.deleted",
            Self::ToolCall => "tool.call",
            Self::ToolResult => "tool.result",
            Self::StreamTurnStart => "stream.turn_start",
            Self::StreamTurnEnd => "stream.turn_end",
            Self::StreamTextDelta => "stream.text_delta",
            Self::StreamThinkingDelta => "stream.thinking_delta",
            Self::ConfigModelSwitch => "config.model_switch",
            Self::ConfigPromptUpdate => "config.prompt_update",
            Self::ConfigReasoningLevel => "config.reasoning_level",
            Self::CompactBoundary => "compact.boundary",
            Self::CompactSummary => "compact.summary",
            Self::ContextCleared => "context.cleared",
            Self::MetadataUpdate => "metadata.update",
            Self::MetadataTag => "metadata.tag",
            Self::FileRead => "file.read",
            Self::FileWrite => "file.write",
            Self::FileEdit => "file.edit",
            Self::WorktreeAcquired => "worktree.acquired",
            Self::WorktreeCommit => "worktree.commit",
            Self::WorktreeReleased => "worktree.released",
            Self::WorktreeMerged => "worktree.merged",
            Self::RulesLoaded => "rules.loaded",
            Self::SkillAdded => "skill.added",
            Self::SkillRemoved => "skill.removed",
            Self::ErrorAgent => "error.agent",
            Self::ErrorTool => "error.tool",
            Self::ErrorProvider => "error.provider",
        }
    }

    /// Domain prefix (e.g. `"session"`, `"message"`).
    #[must_use]
    pub fn domain(self) -> &'static str {
        let s = self.as_str();
        match s.find('.') {
            Some(i) => &s[..i],
            None => s,
        }
    }

    /// Message-domain events.
    #[must_use]
    pub fn is_message(self) -> bool {
        matches!(
            self,
            Self::MessageUser | Self::MessageAssistant | Self::MessageSystem | Self::MessageDeleted
        )
    }

    /// Events counted in the session `message_count`.
    #[must_use]
    pub fn counts_as_message(self) -> bool {
        matches!(self, Self::MessageUser | Self::MessageAssistant)
    }

    /// Events a `message.deleted` may target.
    #[must_use]
    pub fn is_deletable(self) -> bool {
        matches!(
            self,
            Self::MessageUser | Self::MessageAssistant | Self::ToolResult
        )
    }

    /// Events that contribute messages to the projection: real user and
    /// assistant messages, buffered tool results, and the synthetic pair a
    /// compaction summary injects. Not the same set as [`is_message`]:
    /// `message.system` and `message.deleted` never reach the output.
    ///
    /// [`is_message`]: Self::is_message
    #[must_use]
    pub fn produces_messages(self) -> bool {
        matches!(
            self,
            Self::MessageUser | Self::MessageAssistant | Self::ToolResult | Self::CompactSummary
        )
    }

    /// Valid root event types (sequence 0, null parent — except fork roots).
    #[must_use]
    pub fn is_root(self) -> bool {
        matches!(self, Self::SessionStart | Self::SessionFork)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ALL_EVENT_TYPES
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown event type: {s}"))
    }
}
