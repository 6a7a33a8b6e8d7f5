//! Rules payloads.

use serde::{Deserialize, Serialize};

/// Payload for `rules.loaded` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesLoadedPayload {
    /// Loaded rules files.
    pub files: Vec<RulesFileInfo>,
    /// Total files loaded.
    pub total_files: i64,
    /// Merged token count.
    pub merged_tokens: i64,
}

/// One loaded rules file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesFileInfo {
    /// Absolute path.
    pub path: String,
    /// Rules level: global, project, directory.
    pub level: String,
    /// File size in bytes.
    pub size_bytes: i64,
}
