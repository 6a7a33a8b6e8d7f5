//! Session lifecycle payloads: start, end, fork, branch.

use serde::{Deserialize, Serialize};

use super::TokenUsage;

/// Payload for `session.start` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartPayload {
    /// Absolute path to the working directory.
    pub working_directory: String,
    /// LLM model ID.
    pub model: String,
    /// Provider name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// System prompt content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Session title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Session tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Payload for `session.end` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEndPayload {
    /// End reason.
    pub reason: String,
    /// Optional closing summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Aggregate token usage at end.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_token_usage: Option<TokenUsage>,
    /// Session duration in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
}

/// Payload for `session.fork` events (root of a forked session).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionForkPayload {
    /// Session being forked from.
    pub source_session_id: String,
    /// Event ID at the fork point.
    pub source_event_id: String,
    /// Fork name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Payload for `session.branch` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBranchPayload {
    /// Branch ID.
    pub branch_id: String,
    /// Branch name.
    pub name: String,
    /// Event the branch head points at when created.
    pub head_event_id: String,
}
