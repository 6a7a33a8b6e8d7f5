//! Compaction payloads: boundary, summary.

use serde::{Deserialize, Serialize};

/// Payload for `compact.boundary` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactBoundaryPayload {
    /// Token count of the compacted range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_tokens: Option<i64>,
    /// Token count after compaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compacted_tokens: Option<i64>,
    /// Why compaction ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Payload for `compact.summary` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactSummaryPayload {
    /// Summary text injected as the synthetic context message.
    pub summary: String,
    /// Event ID of the matching boundary event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boundary_event_id: Option<String>,
}
