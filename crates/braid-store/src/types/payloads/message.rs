//! Message payloads: user, assistant, system, deleted.
//!
//! `content` stays a raw [`Value`] on user and assistant messages: user
//! content may be a plain string or an array of content blocks, assistant
//! content is always a block array (text, `tool_use`, thinking). The
//! projection engine inspects the blocks without deserializing them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TokenUsage;

/// Payload for `message.user` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMessagePayload {
    /// Plain string or array of content blocks.
    pub content: Value,
    /// Turn number this message opens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn: Option<i64>,
    /// Number of images attached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_count: Option<i64>,
}

/// Payload for `message.assistant` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantMessagePayload {
    /// Content blocks (text, `tool_use`, thinking).
    pub content: Value,
    /// Turn number.
    pub turn: i64,
    /// Token usage for this response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    /// Pre-computed cost in USD.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    /// Provider stop reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    /// Model that produced the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Whether the response included thinking blocks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_thinking: Option<bool>,
}

/// Payload for `message.system` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMessagePayload {
    /// System message content.
    pub content: String,
    /// Where the message came from.
    pub source: String,
}

/// Payload for `message.deleted` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDeletedPayload {
    /// Event ID of the message being deleted.
    pub target_event_id: String,
    /// Type of the target event.
    pub target_type: String,
    /// Reason for deletion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
