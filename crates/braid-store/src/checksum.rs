//! Event integrity checksums.
//!
//! The checksum covers `(parent id, payload JSON)` so a row whose payload or
//! parent pointer was tampered with after commit fails verification. It is
//! computed by the append engine and verified on single-event reads.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::errors::{EventStoreError, Result};
use crate::types::SessionEvent;

/// Compute the hex SHA-256 checksum over a parent id and payload.
pub fn event_checksum(parent_id: Option<&str>, payload: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(parent_id.unwrap_or(""));
    hasher.update(b"|");
    hasher.update(payload.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Verify a stored event against its checksum.
///
/// Events without a checksum pass (older writers did not fill the column).
pub fn verify_event(event: &SessionEvent) -> Result<()> {
    let Some(stored) = event.checksum.as_deref() else {
        return Ok(());
    };
    let computed = event_checksum(
        event.parent_id.as_ref().map(|p| p.as_str()),
        &event.payload,
    );
    if computed == stored {
        Ok(())
    } else {
        Err(EventStoreError::Integrity(format!(
            "checksum mismatch for event {}",
            event.id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use braid_core::ids::{EventId, SessionId, WorkspaceId};
    use crate::types::EventType;
    use serde_json::json;

    fn event_with(parent: Option<&str>, payload: Value, checksum: Option<String>) -> SessionEvent {
        SessionEvent {
            id: EventId::from_raw("evt_1"),
            parent_id: parent.map(EventId::from_raw),
            session_id: SessionId::from_raw("sess_1"),
            workspace_id: WorkspaceId::from_raw("ws_1"),
            timestamp: "2026-01-01T00:00:00.000Z".into(),
            event_type: EventType::MessageUser,
            sequence: 1,
            checksum,
            payload,
        }
    }

    #[test]
    fn checksum_is_deterministic() {
        let payload = json!({"content": "hello"});
        assert_eq!(
            event_checksum(Some("evt_p"), &payload),
            event_checksum(Some("evt_p"), &payload)
        );
    }

    #[test]
    fn checksum_depends_on_parent_and_payload() {
        let payload = json!({"content": "hello"});
        assert_ne!(
            event_checksum(Some("evt_a"), &payload),
            event_checksum(Some("evt_b"), &payload)
        );
        assert_ne!(
            event_checksum(None, &payload),
            event_checksum(None, &json!({"content": "bye"}))
        );
    }

    #[test]
    fn verify_passes_on_match() {
        let payload = json!({"content": "hi"});
        let sum = event_checksum(Some("evt_p"), &payload);
        let evt = event_with(Some("evt_p"), payload, Some(sum));
        assert!(verify_event(&evt).is_ok());
    }

    #[test]
    fn verify_fails_on_tampered_payload() {
        let sum = event_checksum(Some("evt_p"), &json!({"content": "hi"}));
        let evt = event_with(Some("evt_p"), json!({"content": "tampered"}), Some(sum));
        assert!(matches!(
            verify_event(&evt),
            Err(EventStoreError::Integrity(_))
        ));
    }

    #[test]
    fn verify_skips_missing_checksum() {
        let evt = event_with(None, json!({"content": "hi"}), None);
        assert!(verify_event(&evt).is_ok());
    }
}
