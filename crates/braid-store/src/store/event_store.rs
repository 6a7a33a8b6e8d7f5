//! High-level transactional [`EventStore`] API.
//!
//! Composes the repositories into atomic, session-centric operations. Every
//! write runs inside a single immediate transaction; callers never observe
//! partial state. Session writes are serialized by per-session in-process
//! locks (the cooperative-transaction discipline), global mutations by one
//! global lock, and SQLITE_BUSY surfaces as [`EventStoreError::Busy`] after
//! a bounded retry loop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use braid_core::ids::{BlobId, BranchId, EventId, SessionId, WorkspaceId};
use braid_core::tokens::TokenUsage;

use crate::checksum::{event_checksum, verify_event};
use crate::errors::{EventStoreError, Result};
use crate::reconstruct::{reconstruct_from_events, ReconstructionResult};
use crate::sqlite::connection::{ConnectionPool, PooledConnection};
use crate::sqlite::repositories::blob::BlobRepo;
use crate::sqlite::repositories::branch::{BranchRepo, CreateBranchOptions};
use crate::sqlite::repositories::event::{EventRepo, ListEventsOptions, TokenUsageSummary};
use crate::sqlite::repositories::search::{SearchOptions, SearchRepo};
use crate::sqlite::repositories::session::{
    CreateSessionOptions, IncrementCounters, ListSessionsOptions, MessagePreview, SessionRepo,
};
use crate::sqlite::repositories::workspace::WorkspaceRepo;
use crate::sqlite::row_types::{BlobRow, BranchRow, EventRow, SessionRow, WorkspaceRow};
use crate::types::state::{SearchResult, SessionState};
use crate::types::{EventType, SessionEvent};

/// Cost function supplied by the pricing collaborator.
pub type PricingFn = Arc<dyn Fn(&str, &TokenUsage) -> Option<f64> + Send + Sync>;

/// Result of creating a new session.
#[derive(Debug)]
pub struct CreateSessionResult {
    /// The created session.
    pub session: SessionRow,
    /// The root `session.start` event.
    pub root_event: EventRow,
}

/// Result of forking a session.
#[derive(Debug)]
pub struct ForkResult {
    /// The newly created session.
    pub session: SessionRow,
    /// The root `session.fork` event.
    pub fork_event: EventRow,
}

/// Options for creating a session.
#[derive(Default)]
pub struct SessionOptions<'a> {
    /// Session title.
    pub title: Option<&'a str>,
    /// Provider; inferred from the model ID when omitted.
    pub provider: Option<&'a str>,
    /// System prompt recorded on the root event.
    pub system_prompt: Option<&'a str>,
    /// Initial tags.
    pub tags: Option<&'a [String]>,
}

/// Options for appending an event.
pub struct AppendOptions<'a> {
    /// Session to append to.
    pub session_id: &'a SessionId,
    /// Event type.
    pub event_type: EventType,
    /// Event payload.
    pub payload: Value,
    /// Explicit parent; chains from the session head when `None`.
    pub parent_id: Option<&'a EventId>,
}

/// Options for forking a session.
#[derive(Default)]
pub struct ForkOptions<'a> {
    /// Model override; the source session's latest model when omitted.
    pub model: Option<&'a str>,
    /// Name (becomes the forked session's title).
    pub name: Option<&'a str>,
}

/// The operations facade over one database.
///
/// One instance owns the pool for its database file; sessions are rows, not
/// resources. Cheap to share behind an `Arc`.
pub struct EventStore {
    pool: ConnectionPool,
    global_write_lock: Mutex<()>,
    session_write_locks: Mutex<HashMap<SessionId, Weak<Mutex<()>>>>,
    pricing: Option<PricingFn>,
}

impl EventStore {
    const BUSY_MAX_RETRIES: u32 = 16;

    /// Create a store over an initialized (migrated) pool.
    pub fn new(pool: ConnectionPool) -> Self {
        Self {
            pool,
            global_write_lock: Mutex::new(()),
            session_write_locks: Mutex::new(HashMap::new()),
            pricing: None,
        }
    }

    /// Attach a pricing function used to compute costs for appends whose
    /// payload carries token usage but no pre-computed cost.
    #[must_use]
    pub fn with_pricing(mut self, pricing: PricingFn) -> Self {
        self.pricing = Some(pricing);
        self
    }

    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    fn lock_global(&self) -> Result<MutexGuard<'_, ()>> {
        self.global_write_lock
            .lock()
            .map_err(|_| EventStoreError::Internal("global write lock poisoned".into()))
    }

    fn session_lock(&self, session_id: &SessionId) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .session_write_locks
            .lock()
            .map_err(|_| EventStoreError::Internal("session lock map poisoned".into()))?;

        if locks.len() > 128 {
            locks.retain(|_, weak| weak.strong_count() > 0);
        }

        if let Some(existing) = locks.get(session_id).and_then(Weak::upgrade) {
            return Ok(existing);
        }
        let lock = Arc::new(Mutex::new(()));
        let _ = locks.insert(session_id.clone(), Arc::downgrade(&lock));
        Ok(lock)
    }

    fn with_session_write_lock<T>(
        &self,
        session_id: &SessionId,
        f: impl FnMut() -> Result<T>,
    ) -> Result<T> {
        let lock = self.session_lock(session_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| EventStoreError::Internal("session write lock poisoned".into()))?;
        Self::retry_on_busy(f)
    }

    fn with_global_write_lock<T>(&self, f: impl FnMut() -> Result<T>) -> Result<T> {
        let _guard = self.lock_global()?;
        Self::retry_on_busy(f)
    }

    /// Retry on `Busy` with linear backoff and jitter; surface `Busy` to the
    /// caller once retries are exhausted.
    fn retry_on_busy<T>(mut f: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempts = 0;
        loop {
            match f() {
                Err(EventStoreError::Busy) if attempts < Self::BUSY_MAX_RETRIES => {
                    attempts += 1;
                    let base_ms = u64::from(attempts).saturating_mul(10).min(250);
                    let jitter = rand::random::<u64>() % (base_ms / 2 + 1);
                    std::thread::sleep(Duration::from_millis(base_ms / 2 + jitter));
                }
                other => return other,
            }
        }
    }

    fn now() -> String {
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Session lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Create a session with its root `session.start` event.
    ///
    /// Workspace get-or-create, session insert, root event insert, pointer
    /// updates, and counter increments happen in one transaction.
    #[instrument(skip(self, opts), fields(model, workspace_path))]
    pub fn create_session(
        &self,
        model: &str,
        workspace_path: &str,
        opts: &SessionOptions<'_>,
    ) -> Result<CreateSessionResult> {
        self.with_global_write_lock(|| {
            let conn = self.conn()?;
            let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;

            let ws = WorkspaceRepo::get_or_create(&tx, workspace_path, None)?;
            let provider = opts.provider.unwrap_or_else(|| infer_provider(model));

            let session = SessionRepo::create(
                &tx,
                &CreateSessionOptions {
                    workspace_id: &ws.id,
                    model,
                    provider: Some(provider),
                    working_directory: workspace_path,
                    title: opts.title,
                    tags: opts.tags,
                    parent_session_id: None,
                    fork_from_event_id: None,
                },
            )?;

            let mut payload = serde_json::json!({
                "workingDirectory": workspace_path,
                "model": model,
                "provider": provider,
            });
            if let Some(prompt) = opts.system_prompt {
                payload["systemPrompt"] = Value::String(prompt.to_string());
            }
            if let Some(title) = opts.title {
                payload["title"] = Value::String(title.to_string());
            }

            let event = SessionEvent {
                id: EventId::new(),
                parent_id: None,
                session_id: session.id.clone(),
                workspace_id: ws.id.clone(),
                timestamp: Self::now(),
                event_type: EventType::SessionStart,
                sequence: 0,
                checksum: Some(event_checksum(None, &payload)),
                payload,
            };
            EventRepo::insert(&tx, &event)?;

            let _ = SessionRepo::update_root(&tx, &session.id, &event.id)?;
            let _ = SessionRepo::update_head(&tx, &session.id, &event.id)?;
            let _ = SessionRepo::increment_counters(
                &tx,
                &session.id,
                &IncrementCounters {
                    event_count: Some(1),
                    ..Default::default()
                },
            )?;
            let _ = WorkspaceRepo::update_last_activity(&tx, &ws.id)?;

            tx.commit()?;

            let updated = SessionRepo::get_by_id(&conn, &session.id)?
                .ok_or_else(|| EventStoreError::SessionNotFound(session.id.to_string()))?;
            let root_event = EventRepo::get_by_id(&conn, &event.id)?
                .ok_or_else(|| EventStoreError::EventNotFound(event.id.to_string()))?;

            debug!(session_id = %updated.id, "session created");
            Ok(CreateSessionResult {
                session: updated,
                root_event,
            })
        })
    }

    /// Append one event to a session's head.
    ///
    /// Sequence assignment, event insert, head advance, and counter rollup
    /// happen in one transaction under the session write lock.
    #[instrument(skip(self, opts), fields(session_id = %opts.session_id, event_type = %opts.event_type))]
    pub fn append(&self, opts: &AppendOptions<'_>) -> Result<EventRow> {
        self.with_session_write_lock(opts.session_id, || {
            let conn = self.conn()?;
            let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
            let event_id = self.append_in_tx(
                &tx,
                opts.session_id,
                opts.event_type,
                &opts.payload,
                opts.parent_id,
            )?;
            tx.commit()?;

            EventRepo::get_by_id(&conn, &event_id)?
                .ok_or_else(|| EventStoreError::EventNotFound(event_id.to_string()))
        })
    }

    /// The append protocol body, to be run inside an open transaction.
    fn append_in_tx(
        &self,
        tx: &Connection,
        session_id: &SessionId,
        event_type: EventType,
        payload: &Value,
        parent_id: Option<&EventId>,
    ) -> Result<EventId> {
        let session = SessionRepo::get_by_id(tx, session_id)?
            .ok_or_else(|| EventStoreError::SessionNotFound(session_id.to_string()))?;

        let parent = match parent_id {
            Some(pid) => Some(pid.clone()),
            None => session.head_event_id.clone(),
        };
        let Some(parent) = parent else {
            return Err(EventStoreError::NoParent(session_id.to_string()));
        };

        let sequence = EventRepo::get_next_sequence(tx, session_id)?;
        let event = SessionEvent {
            id: EventId::new(),
            parent_id: Some(parent.clone()),
            session_id: session_id.clone(),
            workspace_id: session.workspace_id.clone(),
            timestamp: Self::now(),
            event_type,
            sequence,
            checksum: Some(event_checksum(Some(parent.as_str()), payload)),
            payload: payload.clone(),
        };
        EventRepo::insert(tx, &event)?;
        let _ = SessionRepo::update_head(tx, session_id, &event.id)?;

        let mut counters = IncrementCounters {
            event_count: Some(1),
            ..Default::default()
        };
        if event_type.counts_as_message() {
            counters.message_count = Some(1);
        }
        if event_type == EventType::MessageAssistant {
            counters.turn_count = Some(1);
        }

        let usage = payload
            .get("tokenUsage")
            .and_then(|tu| serde_json::from_value::<TokenUsage>(tu.clone()).ok());
        if let Some(usage) = &usage {
            counters.input_tokens = Some(usage.input_tokens);
            counters.output_tokens = Some(usage.output_tokens);
            counters.cache_read_tokens = usage.cache_read_tokens;
            counters.cache_creation_tokens = usage.cache_creation_tokens;
            if event_type == EventType::MessageAssistant {
                // Snapshot of current context-window occupancy, not a sum.
                counters.last_turn_input_tokens = Some(usage.context_window_tokens());
            }
        }

        // A caller-supplied cost wins; otherwise ask the pricing function.
        // Without either, the cost counter is left unchanged.
        if let Some(cost) = payload.get("cost").and_then(Value::as_f64) {
            counters.cost = Some(cost);
        } else if let (Some(pricing), Some(usage)) = (&self.pricing, &usage) {
            let model = payload
                .get("model")
                .and_then(Value::as_str)
                .unwrap_or(&session.latest_model);
            counters.cost = pricing(model, usage);
        }

        let _ = SessionRepo::increment_counters(tx, session_id, &counters)?;
        Ok(event.id)
    }

    /// Fork a session at an arbitrary historical event.
    ///
    /// The new session's root `session.fork` event has its parent pointing
    /// into the source session — the only place a cross-session edge exists.
    /// History is shared, not copied.
    #[instrument(skip(self, opts), fields(from_event_id = %from_event_id))]
    pub fn fork(&self, from_event_id: &EventId, opts: &ForkOptions<'_>) -> Result<ForkResult> {
        self.with_global_write_lock(|| {
            let conn = self.conn()?;
            let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;

            let source_event = EventRepo::get_by_id(&tx, from_event_id)?
                .ok_or_else(|| EventStoreError::EventNotFound(from_event_id.to_string()))?;
            let source_session = SessionRepo::get_by_id(&tx, &source_event.session_id)?
                .ok_or_else(|| {
                    EventStoreError::SessionNotFound(source_event.session_id.to_string())
                })?;

            let model = opts.model.unwrap_or(&source_session.latest_model);
            let session = SessionRepo::create(
                &tx,
                &CreateSessionOptions {
                    workspace_id: &source_session.workspace_id,
                    model,
                    provider: source_session.provider.as_deref(),
                    working_directory: &source_session.working_directory,
                    title: opts.name,
                    tags: None,
                    parent_session_id: Some(&source_session.id),
                    fork_from_event_id: Some(from_event_id),
                },
            )?;

            let mut payload = serde_json::json!({
                "sourceSessionId": source_session.id,
                "sourceEventId": from_event_id,
            });
            if let Some(name) = opts.name {
                payload["name"] = Value::String(name.to_string());
            }

            let fork_event = SessionEvent {
                id: EventId::new(),
                parent_id: Some(from_event_id.clone()),
                session_id: session.id.clone(),
                workspace_id: source_session.workspace_id.clone(),
                timestamp: Self::now(),
                event_type: EventType::SessionFork,
                sequence: 0,
                checksum: Some(event_checksum(Some(from_event_id.as_str()), &payload)),
                payload,
            };
            EventRepo::insert(&tx, &fork_event)?;

            let _ = SessionRepo::update_root(&tx, &session.id, &fork_event.id)?;
            let _ = SessionRepo::update_head(&tx, &session.id, &fork_event.id)?;
            let _ = SessionRepo::increment_counters(
                &tx,
                &session.id,
                &IncrementCounters {
                    event_count: Some(1),
                    ..Default::default()
                },
            )?;

            tx.commit()?;

            let updated = SessionRepo::get_by_id(&conn, &session.id)?
                .ok_or_else(|| EventStoreError::SessionNotFound(session.id.to_string()))?;
            let fork_event_row = EventRepo::get_by_id(&conn, &fork_event.id)?
                .ok_or_else(|| EventStoreError::EventNotFound(fork_event.id.to_string()))?;

            debug!(
                new_session_id = %updated.id,
                source_session_id = %source_session.id,
                "session forked"
            );
            Ok(ForkResult {
                session: updated,
                fork_event: fork_event_row,
            })
        })
    }

    /// Logically delete a message by appending a `message.deleted` event.
    ///
    /// Deletable types: `message.user`, `message.assistant`, `tool.result`.
    /// The target row is never touched; the projection honors the marker.
    /// Deleting an assistant leaves any orphaned `tool.result` in the log —
    /// the projection drops it when no `tool_use` precedes it.
    #[instrument(skip(self), fields(session_id = %session_id, target = %target_event_id))]
    pub fn delete_message(
        &self,
        session_id: &SessionId,
        target_event_id: &EventId,
        reason: Option<&str>,
    ) -> Result<EventRow> {
        self.with_session_write_lock(session_id, || {
            let conn = self.conn()?;
            let target = EventRepo::get_by_id(&conn, target_event_id)?
                .ok_or_else(|| EventStoreError::EventNotFound(target_event_id.to_string()))?;

            let deletable = target
                .event_type
                .parse::<EventType>()
                .map(EventType::is_deletable)
                .unwrap_or(false);
            if !deletable {
                return Err(EventStoreError::InvalidDelete(format!(
                    "cannot delete event of type '{}'",
                    target.event_type
                )));
            }

            let payload = serde_json::json!({
                "targetEventId": target_event_id,
                "targetType": target.event_type,
                "reason": reason.unwrap_or("user_request"),
            });

            let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
            let event_id =
                self.append_in_tx(&tx, session_id, EventType::MessageDeleted, &payload, None)?;
            tx.commit()?;

            EventRepo::get_by_id(&conn, &event_id)?
                .ok_or_else(|| EventStoreError::EventNotFound(event_id.to_string()))
        })
    }

    /// Mark a session ended.
    pub fn end_session(&self, session_id: &SessionId) -> Result<bool> {
        let conn = self.conn()?;
        SessionRepo::mark_ended(&conn, session_id)
    }

    /// Reactivate an ended session.
    pub fn clear_session_ended(&self, session_id: &SessionId) -> Result<bool> {
        let conn = self.conn()?;
        SessionRepo::clear_ended(&conn, session_id)
    }

    /// Refresh the session's latest-model cache. The `config.model_switch`
    /// event appended by the caller remains the source of truth.
    pub fn update_latest_model(&self, session_id: &SessionId, model: &str) -> Result<bool> {
        let conn = self.conn()?;
        SessionRepo::update_latest_model(&conn, session_id, model)
    }

    /// Update the session title.
    pub fn update_session_title(
        &self,
        session_id: &SessionId,
        title: Option<&str>,
    ) -> Result<bool> {
        let conn = self.conn()?;
        SessionRepo::update_title(&conn, session_id, title)
    }

    /// Hard-delete a session with its events, FTS rows, and branches.
    pub fn delete_session(&self, session_id: &SessionId) -> Result<bool> {
        self.with_session_write_lock(session_id, || {
            let conn = self.conn()?;
            let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
            let _ = EventRepo::delete_by_session(&tx, session_id)?;
            let _ = BranchRepo::delete_by_session(&tx, session_id)?;
            let deleted = SessionRepo::delete(&tx, session_id)?;
            tx.commit()?;
            Ok(deleted)
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────

    /// Get a single event, verifying its checksum.
    pub fn get_event(&self, event_id: &EventId) -> Result<Option<EventRow>> {
        let conn = self.conn()?;
        let Some(row) = EventRepo::get_by_id(&conn, event_id)? else {
            return Ok(None);
        };
        if let Some(event) = row_to_session_event(&row) {
            verify_event(&event)?;
        }
        Ok(Some(row))
    }

    /// All events of a session, ordered by sequence.
    pub fn get_events_by_session(
        &self,
        session_id: &SessionId,
        opts: &ListEventsOptions,
    ) -> Result<Vec<EventRow>> {
        let conn = self.conn()?;
        EventRepo::get_by_session(&conn, session_id, opts)
    }

    /// Ancestor chain (root → event, oldest first).
    pub fn get_ancestors(&self, event_id: &EventId) -> Result<Vec<EventRow>> {
        let conn = self.conn()?;
        EventRepo::get_ancestors(&conn, event_id)
    }

    /// Direct children of an event.
    pub fn get_children(&self, event_id: &EventId) -> Result<Vec<EventRow>> {
        let conn = self.conn()?;
        EventRepo::get_children(&conn, event_id)
    }

    /// All descendants of an event.
    pub fn get_descendants(&self, event_id: &EventId) -> Result<Vec<EventRow>> {
        let conn = self.conn()?;
        EventRepo::get_descendants(&conn, event_id)
    }

    /// Events after a sequence number (incremental sync).
    pub fn get_events_since(
        &self,
        session_id: &SessionId,
        after_sequence: i64,
    ) -> Result<Vec<EventRow>> {
        let conn = self.conn()?;
        EventRepo::get_since(&conn, session_id, after_sequence)
    }

    /// Batch-fetch events by ID.
    pub fn get_events_by_ids(
        &self,
        event_ids: &[&EventId],
    ) -> Result<HashMap<EventId, EventRow>> {
        let conn = self.conn()?;
        EventRepo::get_by_ids(&conn, event_ids)
    }

    /// Token usage summed from the event log (repair source for the session
    /// counters).
    pub fn get_token_usage_summary(&self, session_id: &SessionId) -> Result<TokenUsageSummary> {
        let conn = self.conn()?;
        EventRepo::get_token_usage_summary(&conn, session_id)
    }

    /// Get a session row.
    pub fn get_session(&self, session_id: &SessionId) -> Result<Option<SessionRow>> {
        let conn = self.conn()?;
        SessionRepo::get_by_id(&conn, session_id)
    }

    /// List sessions with filters.
    pub fn list_sessions(&self, opts: &ListSessionsOptions<'_>) -> Result<Vec<SessionRow>> {
        let conn = self.conn()?;
        SessionRepo::list(&conn, opts)
    }

    /// Batch-fetch sessions by ID.
    pub fn get_sessions_by_ids(
        &self,
        session_ids: &[&SessionId],
    ) -> Result<HashMap<SessionId, SessionRow>> {
        let conn = self.conn()?;
        SessionRepo::get_by_ids(&conn, session_ids)
    }

    /// Last user prompt / assistant response per session, for list views.
    pub fn get_session_message_previews(
        &self,
        session_ids: &[&SessionId],
    ) -> Result<HashMap<SessionId, MessagePreview>> {
        let conn = self.conn()?;
        SessionRepo::get_message_previews(&conn, session_ids)
    }

    /// Whether the session's last turn never completed: its last assistant
    /// message has a higher sequence than its last `stream.turn_end`.
    pub fn was_session_interrupted(&self, session_id: &SessionId) -> Result<bool> {
        use rusqlite::OptionalExtension;
        let conn = self.conn()?;
        let last_assistant: Option<i64> = conn
            .query_row(
                "SELECT MAX(sequence) FROM events WHERE session_id = ?1 AND type = 'message.assistant'",
                rusqlite::params![session_id.as_str()],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        let last_turn_end: Option<i64> = conn
            .query_row(
                "SELECT MAX(sequence) FROM events WHERE session_id = ?1 AND type = 'stream.turn_end'",
                rusqlite::params![session_id.as_str()],
                |row| row.get(0),
            )
            .optional()?
            .flatten();

        Ok(match (last_assistant, last_turn_end) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(a), Some(t)) => a > t,
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Projections
    // ─────────────────────────────────────────────────────────────────────

    /// Reconstruct messages at a specific event.
    pub fn get_messages_at(&self, event_id: &EventId) -> Result<ReconstructionResult> {
        let conn = self.conn()?;
        let ancestors = EventRepo::get_ancestors(&conn, event_id)?;
        if ancestors.is_empty() {
            return Err(EventStoreError::EventNotFound(event_id.to_string()));
        }
        Ok(reconstruct_from_events(&rows_to_session_events(&ancestors)))
    }

    /// Reconstruct messages at the session head.
    pub fn get_messages_at_head(&self, session_id: &SessionId) -> Result<ReconstructionResult> {
        let conn = self.conn()?;
        let session = SessionRepo::get_by_id(&conn, session_id)?
            .ok_or_else(|| EventStoreError::SessionNotFound(session_id.to_string()))?;
        let head = session
            .head_event_id
            .ok_or_else(|| EventStoreError::SessionHasNoHead(session_id.to_string()))?;
        let ancestors = EventRepo::get_ancestors(&conn, &head)?;
        Ok(reconstruct_from_events(&rows_to_session_events(&ancestors)))
    }

    /// Full session state at a specific event.
    pub fn get_state_at(&self, session_id: &SessionId, event_id: &EventId) -> Result<SessionState> {
        let conn = self.conn()?;
        let session = SessionRepo::get_by_id(&conn, session_id)?
            .ok_or_else(|| EventStoreError::SessionNotFound(session_id.to_string()))?;
        let ancestors = EventRepo::get_ancestors(&conn, event_id)?;
        if ancestors.is_empty() {
            return Err(EventStoreError::EventNotFound(event_id.to_string()));
        }
        let reconstruction = reconstruct_from_events(&rows_to_session_events(&ancestors));
        Ok(build_session_state(&session, event_id, reconstruction))
    }

    /// Full session state at the head.
    pub fn get_state_at_head(&self, session_id: &SessionId) -> Result<SessionState> {
        let conn = self.conn()?;
        let session = SessionRepo::get_by_id(&conn, session_id)?
            .ok_or_else(|| EventStoreError::SessionNotFound(session_id.to_string()))?;
        let head = session
            .head_event_id
            .clone()
            .ok_or_else(|| EventStoreError::SessionHasNoHead(session_id.to_string()))?;
        let ancestors = EventRepo::get_ancestors(&conn, &head)?;
        let reconstruction = reconstruct_from_events(&rows_to_session_events(&ancestors));
        Ok(build_session_state(&session, &head, reconstruction))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Workspaces
    // ─────────────────────────────────────────────────────────────────────

    /// Workspace by path.
    pub fn get_workspace_by_path(&self, path: &str) -> Result<Option<WorkspaceRow>> {
        let conn = self.conn()?;
        WorkspaceRepo::get_by_path(&conn, path)
    }

    /// Workspace by ID.
    pub fn get_workspace(&self, workspace_id: &WorkspaceId) -> Result<Option<WorkspaceRow>> {
        let conn = self.conn()?;
        WorkspaceRepo::get_by_id(&conn, workspace_id)
    }

    /// Get or create the workspace for a path.
    pub fn get_or_create_workspace(
        &self,
        path: &str,
        name: Option<&str>,
    ) -> Result<WorkspaceRow> {
        let conn = self.conn()?;
        WorkspaceRepo::get_or_create(&conn, path, name)
    }

    /// All workspaces, most recently active first.
    pub fn list_workspaces(&self) -> Result<Vec<WorkspaceRow>> {
        let conn = self.conn()?;
        WorkspaceRepo::list(&conn)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Blobs
    // ─────────────────────────────────────────────────────────────────────

    /// Store blob content (SHA-256 deduplicated).
    pub fn store_blob(&self, content: &[u8], mime_type: &str) -> Result<BlobId> {
        let conn = self.conn()?;
        BlobRepo::store(&conn, content, mime_type)
    }

    /// Blob content by ID.
    pub fn get_blob_content(&self, blob_id: &BlobId) -> Result<Option<Vec<u8>>> {
        let conn = self.conn()?;
        BlobRepo::get_content(&conn, blob_id)
    }

    /// Full blob record by ID.
    pub fn get_blob(&self, blob_id: &BlobId) -> Result<Option<BlobRow>> {
        let conn = self.conn()?;
        BlobRepo::get_by_id(&conn, blob_id)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Search
    // ─────────────────────────────────────────────────────────────────────

    /// Full-text search across indexed events.
    pub fn search(&self, query: &str, opts: &SearchOptions<'_>) -> Result<Vec<SearchResult>> {
        let conn = self.conn()?;
        SearchRepo::search(&conn, query, opts)
    }

    /// Full-text search scoped to one session.
    pub fn search_in_session(
        &self,
        session_id: &SessionId,
        query: &str,
        limit: Option<i64>,
    ) -> Result<Vec<SearchResult>> {
        let conn = self.conn()?;
        SearchRepo::search(
            &conn,
            query,
            &SearchOptions {
                session_id: Some(session_id),
                limit,
                ..Default::default()
            },
        )
    }

    // ─────────────────────────────────────────────────────────────────────
    // Branches
    // ─────────────────────────────────────────────────────────────────────

    /// Create a named branch at the session's current head and record a
    /// `session.branch` event, atomically.
    pub fn create_branch(
        &self,
        session_id: &SessionId,
        name: &str,
        is_default: bool,
    ) -> Result<BranchRow> {
        self.with_session_write_lock(session_id, || {
            let conn = self.conn()?;
            let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;

            let session = SessionRepo::get_by_id(&tx, session_id)?
                .ok_or_else(|| EventStoreError::SessionNotFound(session_id.to_string()))?;
            let head = session
                .head_event_id
                .clone()
                .ok_or_else(|| EventStoreError::SessionHasNoHead(session_id.to_string()))?;
            let root = session.root_event_id.clone().unwrap_or_else(|| head.clone());

            let branch = BranchRepo::create(
                &tx,
                &CreateBranchOptions {
                    session_id,
                    name,
                    root_event_id: &root,
                    head_event_id: &head,
                    is_default,
                },
            )?;

            let payload = serde_json::json!({
                "branchId": branch.id,
                "name": name,
                "headEventId": head,
            });
            let _ =
                self.append_in_tx(&tx, session_id, EventType::SessionBranch, &payload, None)?;

            tx.commit()?;
            Ok(branch)
        })
    }

    /// Branch by ID.
    pub fn get_branch(&self, branch_id: &BranchId) -> Result<BranchRow> {
        let conn = self.conn()?;
        BranchRepo::get_by_id(&conn, branch_id)?
            .ok_or_else(|| EventStoreError::BranchNotFound(branch_id.to_string()))
    }

    /// Branches of a session.
    pub fn get_branches(&self, session_id: &SessionId) -> Result<Vec<BranchRow>> {
        let conn = self.conn()?;
        BranchRepo::get_by_session(&conn, session_id)
    }

    /// Advance a branch head.
    pub fn update_branch_head(
        &self,
        branch_id: &BranchId,
        head_event_id: &EventId,
    ) -> Result<bool> {
        let conn = self.conn()?;
        BranchRepo::update_head(&conn, branch_id, head_event_id)
    }

    /// Make a branch the session default.
    pub fn set_default_branch(&self, branch_id: &BranchId) -> Result<bool> {
        let conn = self.conn()?;
        BranchRepo::set_default(&conn, branch_id)
    }

    /// The underlying pool (for the telemetry subsystem's log transport
    /// initialization only — no external mutation).
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }
}

/// Infer a provider from the model ID family.
fn infer_provider(model: &str) -> &'static str {
    if model.starts_with("gpt-") || model.starts_with("o1") || model.starts_with("o3") {
        "openai"
    } else if model.starts_with("gemini-") {
        "google"
    } else {
        "anthropic"
    }
}

/// Convert a stored row to the wire event struct.
///
/// Returns `None` for rows whose type string this version does not know;
/// such events stay in storage untouched and are invisible to projection.
fn row_to_session_event(row: &EventRow) -> Option<SessionEvent> {
    let Ok(event_type) = row.event_type.parse::<EventType>() else {
        warn!(event_id = %row.id, event_type = %row.event_type, "unknown event type, skipping");
        return None;
    };
    let payload = serde_json::from_str(&row.payload).unwrap_or_else(|e| {
        warn!(event_id = %row.id, error = %e, "corrupt event payload, defaulting to null");
        Value::Null
    });
    Some(SessionEvent {
        id: row.id.clone(),
        parent_id: row.parent_id.clone(),
        session_id: row.session_id.clone(),
        workspace_id: row.workspace_id.clone(),
        timestamp: row.timestamp.clone(),
        event_type,
        sequence: row.sequence,
        checksum: row.checksum.clone(),
        payload,
    })
}

fn rows_to_session_events(rows: &[EventRow]) -> Vec<SessionEvent> {
    rows.iter().filter_map(row_to_session_event).collect()
}

/// Assemble `SessionState` from the session row and a reconstruction.
///
/// Correctness-critical values (messages, token totals, turn count, config)
/// come from the events; the row contributes the cached model, working
/// directory, and lifecycle flags.
fn build_session_state(
    session: &SessionRow,
    head_event_id: &EventId,
    reconstruction: ReconstructionResult,
) -> SessionState {
    SessionState {
        session_id: session.id.clone(),
        workspace_id: session.workspace_id.clone(),
        head_event_id: head_event_id.clone(),
        model: session.latest_model.clone(),
        working_directory: session.working_directory.clone(),
        messages_with_event_ids: reconstruction.messages_with_event_ids,
        token_usage: TokenUsage {
            input_tokens: reconstruction.token_usage.input_tokens,
            output_tokens: reconstruction.token_usage.output_tokens,
            cache_read_tokens: Some(reconstruction.token_usage.cache_read_tokens),
            cache_creation_tokens: Some(reconstruction.token_usage.cache_creation_tokens),
            ..Default::default()
        },
        turn_count: reconstruction.turn_count,
        provider: session.provider.clone(),
        system_prompt: reconstruction.system_prompt,
        reasoning_level: reconstruction.reasoning_level,
        is_ended: session.ended_at.is_some(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::sqlite::{self, run_migrations};
    use serde_json::json;

    fn setup() -> EventStore {
        let pool = sqlite::new_in_memory().unwrap();
        {
            let conn = pool.get().unwrap();
            run_migrations(&conn).unwrap();
        }
        EventStore::new(pool)
    }

    fn append_user(store: &EventStore, session_id: &SessionId, text: &str) -> EventRow {
        store
            .append(&AppendOptions {
                session_id,
                event_type: EventType::MessageUser,
                payload: json!({"content": text}),
                parent_id: None,
            })
            .unwrap()
    }

    fn append_assistant(store: &EventStore, session_id: &SessionId, text: &str, turn: i64) -> EventRow {
        store
            .append(&AppendOptions {
                session_id,
                event_type: EventType::MessageAssistant,
                payload: json!({"content": [{"type": "text", "text": text}], "turn": turn}),
                parent_id: None,
            })
            .unwrap()
    }

    // ── Session creation ──────────────────────────────────────────────

    #[test]
    fn create_session_basic() {
        let store = setup();
        let cr = store
            .create_session(
                "claude-sonnet-4-5",
                "/w",
                &SessionOptions {
                    title: Some("Test"),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(cr.session.id.as_str().starts_with("sess_"));
        assert_eq!(cr.session.latest_model, "claude-sonnet-4-5");
        assert_eq!(cr.session.provider.as_deref(), Some("anthropic"));
        assert_eq!(cr.session.event_count, 1);
        assert_eq!(cr.session.head_event_id.as_ref(), Some(&cr.root_event.id));
        assert_eq!(cr.session.root_event_id.as_ref(), Some(&cr.root_event.id));
        assert_eq!(cr.root_event.sequence, 0);
        assert!(cr.root_event.parent_id.is_none());
        assert_eq!(cr.root_event.event_type, "session.start");
        assert!(cr.root_event.checksum.is_some());
    }

    #[test]
    fn create_session_reuses_workspace() {
        let store = setup();
        let a = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();
        let b = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();
        assert_eq!(a.session.workspace_id, b.session.workspace_id);
        assert_ne!(a.session.id, b.session.id);

        let ws = store.get_workspace_by_path("/w").unwrap().unwrap();
        assert_eq!(ws.session_count, Some(2));
    }

    #[test]
    fn provider_inference() {
        let store = setup();
        let gpt = store
            .create_session("gpt-5-turbo", "/w", &SessionOptions::default())
            .unwrap();
        assert_eq!(gpt.session.provider.as_deref(), Some("openai"));

        let gemini = store
            .create_session("gemini-3-pro", "/w", &SessionOptions::default())
            .unwrap();
        assert_eq!(gemini.session.provider.as_deref(), Some("google"));
    }

    // ── Append ────────────────────────────────────────────────────────

    #[test]
    fn append_chains_from_head() {
        let store = setup();
        let cr = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();

        let e1 = append_user(&store, &cr.session.id, "one");
        let e2 = append_assistant(&store, &cr.session.id, "two", 1);

        assert_eq!(e1.parent_id.as_ref(), Some(&cr.root_event.id));
        assert_eq!(e2.parent_id.as_ref(), Some(&e1.id));
        assert_eq!(e1.sequence, 1);
        assert_eq!(e2.sequence, 2);

        let session = store.get_session(&cr.session.id).unwrap().unwrap();
        assert_eq!(session.head_event_id.as_ref(), Some(&e2.id));
        assert_eq!(session.event_count, 3);
        assert_eq!(session.message_count, 2);
        assert_eq!(session.turn_count, 1);
    }

    #[test]
    fn append_with_explicit_parent() {
        let store = setup();
        let cr = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();
        append_user(&store, &cr.session.id, "head path");

        let branched = store
            .append(&AppendOptions {
                session_id: &cr.session.id,
                event_type: EventType::MessageUser,
                payload: json!({"content": "side path"}),
                parent_id: Some(&cr.root_event.id),
            })
            .unwrap();
        assert_eq!(branched.parent_id.as_ref(), Some(&cr.root_event.id));
        // Sequence keeps growing even on a side branch.
        assert_eq!(branched.sequence, 2);
    }

    #[test]
    fn append_to_missing_session_fails() {
        let store = setup();
        let err = store
            .append(&AppendOptions {
                session_id: &SessionId::from_raw("sess_missing"),
                event_type: EventType::MessageUser,
                payload: json!({"content": "x"}),
                parent_id: None,
            })
            .unwrap_err();
        assert!(matches!(err, EventStoreError::SessionNotFound(_)));
    }

    #[test]
    fn append_without_parent_fails() {
        // A session row with no root can only come from outside the facade,
        // but the protocol still guards it.
        let store = setup();
        let conn = store.pool().get().unwrap();
        let ws = WorkspaceRepo::get_or_create(&conn, "/w", None).unwrap();
        let session = SessionRepo::create(
            &conn,
            &CreateSessionOptions {
                workspace_id: &ws.id,
                model: "claude-sonnet-4-5",
                provider: None,
                working_directory: "/w",
                title: None,
                tags: None,
                parent_session_id: None,
                fork_from_event_id: None,
            },
        )
        .unwrap();
        drop(conn);

        let err = store
            .append(&AppendOptions {
                session_id: &session.id,
                event_type: EventType::MessageUser,
                payload: json!({"content": "x"}),
                parent_id: None,
            })
            .unwrap_err();
        assert!(matches!(err, EventStoreError::NoParent(_)));
    }

    #[test]
    fn append_accumulates_tokens_and_snapshot() {
        let store = setup();
        let cr = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();

        store
            .append(&AppendOptions {
                session_id: &cr.session.id,
                event_type: EventType::MessageAssistant,
                payload: json!({
                    "content": [{"type": "text", "text": "a"}], "turn": 1,
                    "tokenUsage": {"inputTokens": 100, "outputTokens": 40, "cacheReadTokens": 10}
                }),
                parent_id: None,
            })
            .unwrap();
        store
            .append(&AppendOptions {
                session_id: &cr.session.id,
                event_type: EventType::MessageAssistant,
                payload: json!({
                    "content": [{"type": "text", "text": "b"}], "turn": 2,
                    "tokenUsage": {"inputTokens": 200, "outputTokens": 60}
                }),
                parent_id: None,
            })
            .unwrap();

        let session = store.get_session(&cr.session.id).unwrap().unwrap();
        assert_eq!(session.total_input_tokens, 300);
        assert_eq!(session.total_output_tokens, 100);
        assert_eq!(session.total_cache_read_tokens, 10);
        // Snapshot of the latest turn, not a running sum.
        assert_eq!(session.last_turn_input_tokens, 200);
        assert_eq!(session.turn_count, 2);
    }

    #[test]
    fn append_prefers_caller_supplied_cost() {
        let store = setup().with_pricing(Arc::new(|_, _| Some(100.0)));
        let cr = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();

        store
            .append(&AppendOptions {
                session_id: &cr.session.id,
                event_type: EventType::MessageAssistant,
                payload: json!({
                    "content": [], "turn": 1, "cost": 0.25,
                    "tokenUsage": {"inputTokens": 1, "outputTokens": 1}
                }),
                parent_id: None,
            })
            .unwrap();

        let session = store.get_session(&cr.session.id).unwrap().unwrap();
        assert!((session.total_cost - 0.25).abs() < 1e-9);
    }

    #[test]
    fn append_computes_cost_via_pricing() {
        let store = setup().with_pricing(Arc::new(braid_core::pricing::calculate_cost));
        let cr = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();

        store
            .append(&AppendOptions {
                session_id: &cr.session.id,
                event_type: EventType::MessageAssistant,
                payload: json!({
                    "content": [], "turn": 1,
                    "tokenUsage": {"inputTokens": 1_000_000, "outputTokens": 0}
                }),
                parent_id: None,
            })
            .unwrap();

        let session = store.get_session(&cr.session.id).unwrap().unwrap();
        assert!((session.total_cost - 3.0).abs() < 1e-9);
    }

    #[test]
    fn append_tolerates_missing_price() {
        // Unknown model and no caller cost: counter unchanged.
        let store = setup().with_pricing(Arc::new(braid_core::pricing::calculate_cost));
        let cr = store
            .create_session("mystery-model", "/w", &SessionOptions::default())
            .unwrap();

        store
            .append(&AppendOptions {
                session_id: &cr.session.id,
                event_type: EventType::MessageAssistant,
                payload: json!({
                    "content": [], "turn": 1,
                    "tokenUsage": {"inputTokens": 1000, "outputTokens": 1000}
                }),
                parent_id: None,
            })
            .unwrap();

        let session = store.get_session(&cr.session.id).unwrap().unwrap();
        assert_eq!(session.total_cost, 0.0);
    }

    #[test]
    fn concurrent_appends_keep_sequences_dense() {
        let store = Arc::new(setup());
        let cr = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..10 {
            let store = store.clone();
            let sid = cr.session.id.clone();
            handles.push(std::thread::spawn(move || {
                store
                    .append(&AppendOptions {
                        session_id: &sid,
                        event_type: EventType::MessageUser,
                        payload: json!({"content": format!("thread {i}")}),
                        parent_id: None,
                    })
                    .unwrap()
            }));
        }
        let events: Vec<EventRow> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let mut seqs: Vec<i64> = events.iter().map(|e| e.sequence).collect();
        seqs.sort_unstable();
        assert_eq!(seqs, (1..=10).collect::<Vec<i64>>());

        // Parent chain is intact: every appended event's parent is the event
        // with the previous sequence.
        let all = store
            .get_events_by_session(&cr.session.id, &ListEventsOptions::default())
            .unwrap();
        for pair in all.windows(2) {
            assert_eq!(pair[1].parent_id.as_ref(), Some(&pair[0].id));
        }

        let session = store.get_session(&cr.session.id).unwrap().unwrap();
        assert_eq!(session.event_count, 11);
    }

    // ── Fork ──────────────────────────────────────────────────────────

    #[test]
    fn fork_shares_history() {
        let store = setup();
        let cr = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();
        append_user(&store, &cr.session.id, "one");
        let fork_point = append_assistant(&store, &cr.session.id, "two", 1);
        append_user(&store, &cr.session.id, "three");

        let fork = store
            .fork(
                &fork_point.id,
                &ForkOptions {
                    name: Some("alt"),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(fork.session.parent_session_id.as_ref(), Some(&cr.session.id));
        assert_eq!(fork.session.fork_from_event_id.as_ref(), Some(&fork_point.id));
        assert_eq!(fork.session.title.as_deref(), Some("alt"));
        assert_eq!(fork.session.event_count, 1);
        assert_eq!(fork.fork_event.sequence, 0);
        assert_eq!(fork.fork_event.event_type, "session.fork");
        // The only cross-session edge: fork root → source event.
        assert_eq!(fork.fork_event.parent_id.as_ref(), Some(&fork_point.id));

        // Ancestors of the fork root traverse into the source session.
        let ancestors = store.get_ancestors(&fork.fork_event.id).unwrap();
        assert_eq!(ancestors.len(), 4); // start, one, two, fork root
        assert_eq!(ancestors[0].session_id, cr.session.id);
        assert_eq!(ancestors[3].session_id, fork.session.id);
    }

    #[test]
    fn fork_missing_event_fails() {
        let store = setup();
        let err = store
            .fork(&EventId::from_raw("evt_missing"), &ForkOptions::default())
            .unwrap_err();
        assert!(matches!(err, EventStoreError::EventNotFound(_)));
    }

    #[test]
    fn fork_model_defaults_to_source() {
        let store = setup();
        let cr = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();
        let fork = store
            .fork(&cr.root_event.id, &ForkOptions::default())
            .unwrap();
        assert_eq!(fork.session.latest_model, "claude-sonnet-4-5");

        let forced = store
            .fork(
                &cr.root_event.id,
                &ForkOptions {
                    model: Some("claude-opus-4-6"),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(forced.session.latest_model, "claude-opus-4-6");
    }

    #[test]
    fn fork_leaves_source_unmodified() {
        let store = setup();
        let cr = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();
        append_user(&store, &cr.session.id, "one");
        let before = store.get_session(&cr.session.id).unwrap().unwrap();

        store
            .fork(&before.head_event_id.clone().unwrap(), &ForkOptions::default())
            .unwrap();

        let after = store.get_session(&cr.session.id).unwrap().unwrap();
        assert_eq!(after.event_count, before.event_count);
        assert_eq!(after.head_event_id, before.head_event_id);
    }

    // ── Deletion ──────────────────────────────────────────────────────

    #[test]
    fn delete_message_appends_marker() {
        let store = setup();
        let cr = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();
        let target = append_user(&store, &cr.session.id, "delete me");

        let marker = store
            .delete_message(&cr.session.id, &target.id, Some("user_request"))
            .unwrap();
        assert_eq!(marker.event_type, "message.deleted");

        // Target row is untouched.
        let still_there = store.get_event(&target.id).unwrap().unwrap();
        assert!(still_there.payload.contains("delete me"));

        // Projection drops it.
        let result = store.get_messages_at_head(&cr.session.id).unwrap();
        assert!(result.messages_with_event_ids.is_empty());
    }

    #[test]
    fn delete_non_deletable_type_fails() {
        let store = setup();
        let cr = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();
        let err = store
            .delete_message(&cr.session.id, &cr.root_event.id, None)
            .unwrap_err();
        assert!(matches!(err, EventStoreError::InvalidDelete(_)));
    }

    #[test]
    fn delete_missing_target_fails() {
        let store = setup();
        let cr = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();
        let err = store
            .delete_message(&cr.session.id, &EventId::from_raw("evt_missing"), None)
            .unwrap_err();
        assert!(matches!(err, EventStoreError::EventNotFound(_)));
    }

    #[test]
    fn double_delete_leaves_projection_unchanged() {
        let store = setup();
        let cr = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();
        let target = append_user(&store, &cr.session.id, "x");

        store.delete_message(&cr.session.id, &target.id, None).unwrap();
        let first = store.get_messages_at_head(&cr.session.id).unwrap();
        store.delete_message(&cr.session.id, &target.id, None).unwrap();
        let second = store.get_messages_at_head(&cr.session.id).unwrap();

        assert_eq!(
            first.messages_with_event_ids.len(),
            second.messages_with_event_ids.len()
        );
        // Two marker events exist in the log.
        let session = store.get_session(&cr.session.id).unwrap().unwrap();
        assert_eq!(session.event_count, 4);
    }

    // ── Projections ───────────────────────────────────────────────────

    #[test]
    fn messages_at_head_basic() {
        let store = setup();
        let cr = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();
        append_user(&store, &cr.session.id, "hi");
        append_assistant(&store, &cr.session.id, "hello", 1);

        let result = store.get_messages_at_head(&cr.session.id).unwrap();
        assert_eq!(result.messages_with_event_ids.len(), 2);
        assert_eq!(result.messages_with_event_ids[0].message.role, "user");
        assert_eq!(result.messages_with_event_ids[1].message.role, "assistant");
    }

    #[test]
    fn messages_at_historical_event() {
        let store = setup();
        let cr = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();
        let e1 = append_user(&store, &cr.session.id, "hi");
        append_assistant(&store, &cr.session.id, "hello", 1);

        let result = store.get_messages_at(&e1.id).unwrap();
        assert_eq!(result.messages_with_event_ids.len(), 1);
    }

    #[test]
    fn messages_at_missing_event_fails() {
        let store = setup();
        let err = store
            .get_messages_at(&EventId::from_raw("evt_missing"))
            .unwrap_err();
        assert!(matches!(err, EventStoreError::EventNotFound(_)));
    }

    #[test]
    fn state_at_head_uses_event_truth() {
        let store = setup();
        let cr = store
            .create_session(
                "claude-sonnet-4-5",
                "/w",
                &SessionOptions {
                    system_prompt: Some("Be terse."),
                    ..Default::default()
                },
            )
            .unwrap();
        store
            .append(&AppendOptions {
                session_id: &cr.session.id,
                event_type: EventType::MessageAssistant,
                payload: json!({
                    "content": [{"type": "text", "text": "a"}], "turn": 3,
                    "tokenUsage": {"inputTokens": 10, "outputTokens": 5}
                }),
                parent_id: None,
            })
            .unwrap();

        let state = store.get_state_at_head(&cr.session.id).unwrap();
        assert_eq!(state.model, "claude-sonnet-4-5");
        assert_eq!(state.working_directory, "/w");
        assert_eq!(state.system_prompt.as_deref(), Some("Be terse."));
        assert_eq!(state.turn_count, 3);
        assert_eq!(state.token_usage.input_tokens, 10);
        assert!(!state.is_ended);
    }

    #[test]
    fn state_on_headless_session_fails() {
        let store = setup();
        let conn = store.pool().get().unwrap();
        let ws = WorkspaceRepo::get_or_create(&conn, "/w", None).unwrap();
        let session = SessionRepo::create(
            &conn,
            &CreateSessionOptions {
                workspace_id: &ws.id,
                model: "claude-sonnet-4-5",
                provider: None,
                working_directory: "/w",
                title: None,
                tags: None,
                parent_session_id: None,
                fork_from_event_id: None,
            },
        )
        .unwrap();
        drop(conn);

        let err = store.get_state_at_head(&session.id).unwrap_err();
        assert!(matches!(err, EventStoreError::SessionHasNoHead(_)));
    }

    // ── Lifecycle / misc ──────────────────────────────────────────────

    #[test]
    fn end_and_reactivate_session() {
        let store = setup();
        let cr = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();

        store.end_session(&cr.session.id).unwrap();
        assert!(store.get_state_at_head(&cr.session.id).unwrap().is_ended);

        store.clear_session_ended(&cr.session.id).unwrap();
        assert!(!store.get_state_at_head(&cr.session.id).unwrap().is_ended);
    }

    #[test]
    fn delete_session_removes_everything() {
        let store = setup();
        let cr = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();
        append_user(&store, &cr.session.id, "searchable content here");
        store.create_branch(&cr.session.id, "main", true).unwrap();

        assert!(store.delete_session(&cr.session.id).unwrap());
        assert!(store.get_session(&cr.session.id).unwrap().is_none());
        assert!(store.get_branches(&cr.session.id).unwrap().is_empty());
        assert!(store
            .search("searchable", &SearchOptions::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn was_session_interrupted() {
        let store = setup();
        let cr = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();
        assert!(!store.was_session_interrupted(&cr.session.id).unwrap());

        append_assistant(&store, &cr.session.id, "partial", 1);
        assert!(store.was_session_interrupted(&cr.session.id).unwrap());

        store
            .append(&AppendOptions {
                session_id: &cr.session.id,
                event_type: EventType::StreamTurnEnd,
                payload: json!({"turn": 1}),
                parent_id: None,
            })
            .unwrap();
        assert!(!store.was_session_interrupted(&cr.session.id).unwrap());
    }

    #[test]
    fn checksum_verified_on_get_event() {
        let store = setup();
        let cr = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();
        let evt = append_user(&store, &cr.session.id, "original");

        // Tamper with the stored payload behind the facade's back.
        let conn = store.pool().get().unwrap();
        conn.execute(
            "UPDATE events SET payload = '{\"content\": \"tampered\"}' WHERE id = ?1",
            rusqlite::params![evt.id.as_str()],
        )
        .unwrap();
        drop(conn);

        let err = store.get_event(&evt.id).unwrap_err();
        assert!(matches!(err, EventStoreError::Integrity(_)));
    }

    // ── Branches ──────────────────────────────────────────────────────

    #[test]
    fn create_branch_records_event() {
        let store = setup();
        let cr = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();
        append_user(&store, &cr.session.id, "hi");

        let branch = store.create_branch(&cr.session.id, "main", true).unwrap();
        assert!(branch.is_default);

        let session = store.get_session(&cr.session.id).unwrap().unwrap();
        let head = store
            .get_event(session.head_event_id.as_ref().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(head.event_type, "session.branch");

        // Branch bookkeeping has no effect on the projection.
        let result = store.get_messages_at_head(&cr.session.id).unwrap();
        assert_eq!(result.messages_with_event_ids.len(), 1);
    }

    #[test]
    fn branch_head_moves_independently() {
        let store = setup();
        let cr = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();
        append_user(&store, &cr.session.id, "hi");
        let branch = store.create_branch(&cr.session.id, "alt", false).unwrap();

        let later = append_user(&store, &cr.session.id, "more");
        store.update_branch_head(&branch.id, &later.id).unwrap();

        let fetched = store.get_branch(&branch.id).unwrap();
        assert_eq!(fetched.head_event_id, later.id);
    }

    #[test]
    fn get_missing_branch_fails() {
        let store = setup();
        let err = store
            .get_branch(&BranchId::from_raw("br_missing"))
            .unwrap_err();
        assert!(matches!(err, EventStoreError::BranchNotFound(_)));
    }

    // ── Search ────────────────────────────────────────────────────────

    #[test]
    fn search_returns_appended_content() {
        let store = setup();
        let cr = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();
        let evt = append_user(&store, &cr.session.id, "a very distinctive phrase");

        let results = store.search("distinctive", &SearchOptions::default()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].event_id, evt.id);
        assert!(results[0].score > 0.0);
    }

    #[test]
    fn search_in_session_scopes() {
        let store = setup();
        let a = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();
        let b = store
            .create_session("claude-sonnet-4-5", "/w", &SessionOptions::default())
            .unwrap();
        append_user(&store, &a.session.id, "shared needle");
        append_user(&store, &b.session.id, "shared needle");

        let scoped = store
            .search_in_session(&a.session.id, "needle", None)
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].session_id, a.session.id);
    }

    // ── Blobs ─────────────────────────────────────────────────────────

    #[test]
    fn blob_roundtrip_via_facade() {
        let store = setup();
        let id = store.store_blob(b"large tool output", "text/plain").unwrap();
        let content = store.get_blob_content(&id).unwrap().unwrap();
        assert_eq!(content, b"large tool output");
        let row = store.get_blob(&id).unwrap().unwrap();
        assert_eq!(row.ref_count, 1);
    }
}
