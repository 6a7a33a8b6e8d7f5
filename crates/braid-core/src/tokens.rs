//! Token usage reported by LLM providers.
//!
//! Fields serialize in camelCase to match the wire format stored inside
//! event payloads (`payload.tokenUsage`). Optional cache fields are omitted
//! from JSON when `None`.

use serde::{Deserialize, Serialize};

/// Per-response token usage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    /// Input tokens consumed.
    pub input_tokens: i64,
    /// Output tokens generated.
    pub output_tokens: i64,
    /// Tokens read from prompt cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_read_tokens: Option<i64>,
    /// Tokens written to prompt cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_creation_tokens: Option<i64>,
    /// 5-minute-TTL cache creation tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_creation_5m_tokens: Option<i64>,
    /// 1-hour-TTL cache creation tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_creation_1h_tokens: Option<i64>,
}

impl TokenUsage {
    /// Context-window occupancy for this response: input plus whatever the
    /// cache served or stored. This is a snapshot, not a summable quantity.
    pub fn context_window_tokens(&self) -> i64 {
        self.input_tokens
            + self.cache_read_tokens.unwrap_or(0)
            + self.cache_creation_tokens.unwrap_or(0)
    }
}
