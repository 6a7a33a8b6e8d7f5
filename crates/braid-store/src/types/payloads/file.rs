//! File-tracking payloads: read, write, edit.

use serde::{Deserialize, Serialize};

/// Payload for `file.read` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReadPayload {
    /// File path.
    pub path: String,
    /// 1-based line range, when partial.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<LineRange>,
}

/// Inclusive line range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: i64,
    pub end: i64,
}

/// Payload for `file.write` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileWritePayload {
    /// File path.
    pub path: String,
    /// Bytes written.
    pub size: i64,
    /// Content hash.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

/// Payload for `file.edit` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEditPayload {
    /// File path.
    pub path: String,
    /// Replaced text.
    pub old_string: String,
    /// Inserted text.
    pub new_string: String,
}
