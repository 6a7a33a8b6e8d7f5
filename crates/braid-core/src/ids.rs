//! Branded identifier types.
//!
//! Every entity kind carries its own newtype over a prefixed UUID v7 string
//! (`sess_…`, `evt_…`). The v7 timestamp prefix makes freshly minted IDs
//! sort in creation order, which the event log relies on for stable
//! tie-breaking across sessions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! branded_id {
    ($name:ident, $prefix:expr) => {
        #[derive(Clone, Debug, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Mint a fresh ID (`{prefix}_{uuid-v7}`).
            pub fn new() -> Self {
                Self(format!("{}_{}", $prefix, Uuid::now_v7()))
            }

            /// Wrap an existing raw string without validation.
            pub fn from_raw(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_owned()))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

branded_id!(SessionId, "sess");
branded_id!(EventId, "evt");
branded_id!(WorkspaceId, "ws");
branded_id!(BranchId, "br");
branded_id!(BlobId, "blob");
branded_id!(ToolCallId, "toolu");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes() {
        assert!(SessionId::new().as_str().starts_with("sess_"));
        assert!(EventId::new().as_str().starts_with("evt_"));
        assert!(WorkspaceId::new().as_str().starts_with("ws_"));
        assert!(BranchId::new().as_str().starts_with("br_"));
        assert!(BlobId::new().as_str().starts_with("blob_"));
        assert!(ToolCallId::new().as_str().starts_with("toolu_"));
    }

    #[test]
    fn ids_are_unique() {
        let a = EventId::new();
        let b = EventId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn freshly_minted_ids_sort_in_creation_order() {
        let ids: Vec<EventId> = (0..64).map(|_| EventId::new()).collect();
        for w in ids.windows(2) {
            assert!(w[0] < w[1], "not monotonic: {} >= {}", w[0], w[1]);
        }
    }

    #[test]
    fn display_and_from_str_roundtrip() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn serde_is_transparent() {
        let id = EventId::from_raw("evt_fixed");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""evt_fixed""#);
        let back: EventId = serde_json::from_str(r#""evt_fixed""#).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn from_raw_preserves_value() {
        let id = WorkspaceId::from_raw("custom-id");
        assert_eq!(id.as_str(), "custom-id");
    }
}
