//! Event creation utilities.
//!
//! [`EventChainBuilder`] wraps an [`EventStore`] and threads `parent_id`
//! across sequential appends, so callers replaying or importing a
//! conversation never track the head manually.

use serde_json::Value;
use std::sync::Arc;

use braid_core::ids::{EventId, SessionId};

use crate::errors::Result;
use crate::sqlite::row_types::EventRow;
use crate::store::{AppendOptions, EventStore};
use crate::types::EventType;

/// Appends events chained one after another from a starting head.
pub struct EventChainBuilder {
    store: Arc<EventStore>,
    session_id: SessionId,
    head: EventId,
}

impl EventChainBuilder {
    /// Start a chain at the given head event.
    pub fn new(store: Arc<EventStore>, session_id: SessionId, initial_head: EventId) -> Self {
        Self {
            store,
            session_id,
            head: initial_head,
        }
    }

    /// Current head event ID.
    pub fn head_event_id(&self) -> &EventId {
        &self.head
    }

    /// Append an event chained from the current head, then advance the head.
    pub fn append(&mut self, event_type: EventType, payload: Value) -> Result<EventRow> {
        let event = self.store.append(&AppendOptions {
            session_id: &self.session_id,
            event_type,
            payload,
            parent_id: Some(&self.head),
        })?;
        self.head = event.id.clone();
        Ok(event)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
