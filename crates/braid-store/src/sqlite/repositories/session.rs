//! Session repository — session rows and their denormalized counters.
//!
//! Sessions are pointer heads into the event tree. The counters are a
//! write-through cache over the event log; a full recompute from events is
//! always a valid repair.

use rusqlite::{params, Connection, OptionalExtension};

use braid_core::ids::{EventId, SessionId, WorkspaceId};

use crate::errors::Result;
use crate::sqlite::row_types::SessionRow;

/// Options for creating a session row.
pub struct CreateSessionOptions<'a> {
    /// Workspace this session belongs to.
    pub workspace_id: &'a WorkspaceId,
    /// LLM model ID.
    pub model: &'a str,
    /// Provider name.
    pub provider: Option<&'a str>,
    /// Working directory.
    pub working_directory: &'a str,
    /// Optional title.
    pub title: Option<&'a str>,
    /// Optional tags.
    pub tags: Option<&'a [String]>,
    /// Parent session (fork lineage).
    pub parent_session_id: Option<&'a SessionId>,
    /// Fork point event (fork lineage).
    pub fork_from_event_id: Option<&'a EventId>,
}

/// Options for listing sessions.
#[derive(Default)]
pub struct ListSessionsOptions<'a> {
    /// Filter by workspace.
    pub workspace_id: Option<&'a WorkspaceId>,
    /// Filter by ended state.
    pub ended: Option<bool>,
    /// Maximum results.
    pub limit: Option<i64>,
    /// Skip results.
    pub offset: Option<i64>,
}

/// Counter deltas applied in one UPDATE.
///
/// All fields are increments except `last_turn_input_tokens`, which is a
/// snapshot of the latest turn's context-window occupancy and is SET.
#[derive(Default)]
pub struct IncrementCounters {
    pub event_count: Option<i64>,
    pub message_count: Option<i64>,
    pub turn_count: Option<i64>,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub cache_read_tokens: Option<i64>,
    pub cache_creation_tokens: Option<i64>,
    pub last_turn_input_tokens: Option<i64>,
    pub cost: Option<f64>,
}

/// Last user prompt / assistant response text for list views.
#[derive(Clone, Debug, Default)]
pub struct MessagePreview {
    pub last_user_prompt: Option<String>,
    pub last_assistant_response: Option<String>,
}

/// Session repository — stateless, every method takes `&Connection`.
pub struct SessionRepo;

impl SessionRepo {
    /// Create a session row (no root event yet; the facade inserts it in the
    /// same transaction).
    pub fn create(conn: &Connection, opts: &CreateSessionOptions<'_>) -> Result<SessionRow> {
        let id = SessionId::new();
        let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let tags_json = opts.tags.map_or_else(
            || "[]".to_string(),
            |t| serde_json::to_string(t).unwrap_or_else(|_| "[]".to_string()),
        );

        let _ = conn.execute(
            "INSERT INTO sessions (id, workspace_id, title, latest_model, provider,
             working_directory, parent_session_id, fork_from_event_id,
             created_at, last_activity_at, tags)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                id.as_str(),
                opts.workspace_id.as_str(),
                opts.title,
                opts.model,
                opts.provider,
                opts.working_directory,
                opts.parent_session_id.map(|s| s.as_str()),
                opts.fork_from_event_id.map(|e| e.as_str()),
                now,
                now,
                tags_json,
            ],
        )?;

        Ok(SessionRow {
            id,
            workspace_id: opts.workspace_id.clone(),
            head_event_id: None,
            root_event_id: None,
            title: opts.title.map(String::from),
            latest_model: opts.model.to_string(),
            provider: opts.provider.map(String::from),
            working_directory: opts.working_directory.to_string(),
            parent_session_id: opts.parent_session_id.cloned(),
            fork_from_event_id: opts.fork_from_event_id.cloned(),
            created_at: now.clone(),
            last_activity_at: now,
            ended_at: None,
            event_count: 0,
            message_count: 0,
            turn_count: 0,
            total_input_tokens: 0,
            total_output_tokens: 0,
            total_cache_read_tokens: 0,
            total_cache_creation_tokens: 0,
            last_turn_input_tokens: 0,
            total_cost: 0.0,
            tags: tags_json,
        })
    }

    /// Get session by ID.
    pub fn get_by_id(conn: &Connection, session_id: &SessionId) -> Result<Option<SessionRow>> {
        let row = conn
            .query_row(
                "SELECT * FROM sessions WHERE id = ?1",
                params![session_id.as_str()],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Batch-fetch sessions by IDs. Missing IDs are silently omitted.
    pub fn get_by_ids(
        conn: &Connection,
        session_ids: &[&SessionId],
    ) -> Result<std::collections::HashMap<SessionId, SessionRow>> {
        let mut result = std::collections::HashMap::new();
        if session_ids.is_empty() {
            return Ok(result);
        }

        let placeholders: Vec<String> = (1..=session_ids.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "SELECT * FROM sessions WHERE id IN ({})",
            placeholders.join(", ")
        );
        let mut stmt = conn.prepare(&sql)?;
        let id_strs: Vec<&str> = session_ids.iter().map(|id| id.as_str()).collect();
        let params: Vec<&dyn rusqlite::types::ToSql> = id_strs
            .iter()
            .map(|s| s as &dyn rusqlite::types::ToSql)
            .collect();
        let rows = stmt
            .query_map(params.as_slice(), Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for row in rows {
            let _ = result.insert(row.id.clone(), row);
        }
        Ok(result)
    }

    /// List sessions, most recently active first.
    pub fn list(conn: &Connection, opts: &ListSessionsOptions<'_>) -> Result<Vec<SessionRow>> {
        use std::fmt::Write;
        let mut sql = String::from("SELECT * FROM sessions WHERE 1=1");
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ws_id) = opts.workspace_id {
            let _ = write!(sql, " AND workspace_id = ?{}", values.len() + 1);
            values.push(Box::new(ws_id.as_str().to_string()));
        }
        match opts.ended {
            Some(true) => sql.push_str(" AND ended_at IS NOT NULL"),
            Some(false) => sql.push_str(" AND ended_at IS NULL"),
            None => {}
        }
        sql.push_str(" ORDER BY last_activity_at DESC");
        if let Some(limit) = opts.limit {
            let _ = write!(sql, " LIMIT {limit}");
        }
        if let Some(offset) = opts.offset {
            let _ = write!(sql, " OFFSET {offset}");
        }

        let mut stmt = conn.prepare(&sql)?;
        let value_refs: Vec<&dyn rusqlite::types::ToSql> =
            values.iter().map(Box::as_ref).collect();
        let rows = stmt
            .query_map(value_refs.as_slice(), Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Advance the head pointer and touch last activity.
    pub fn update_head(
        conn: &Connection,
        session_id: &SessionId,
        head_event_id: &EventId,
    ) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let changed = conn.execute(
            "UPDATE sessions SET head_event_id = ?1, last_activity_at = ?2 WHERE id = ?3",
            params![head_event_id.as_str(), now, session_id.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Set the root event pointer.
    pub fn update_root(
        conn: &Connection,
        session_id: &SessionId,
        root_event_id: &EventId,
    ) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE sessions SET root_event_id = ?1 WHERE id = ?2",
            params![root_event_id.as_str(), session_id.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Mark the session ended.
    pub fn mark_ended(conn: &Connection, session_id: &SessionId) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let changed = conn.execute(
            "UPDATE sessions SET ended_at = ?1, last_activity_at = ?2 WHERE id = ?3",
            params![now, now, session_id.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Reactivate an ended session.
    pub fn clear_ended(conn: &Connection, session_id: &SessionId) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let changed = conn.execute(
            "UPDATE sessions SET ended_at = NULL, last_activity_at = ?1 WHERE id = ?2",
            params![now, session_id.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Refresh the latest-model cache.
    pub fn update_latest_model(
        conn: &Connection,
        session_id: &SessionId,
        model: &str,
    ) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE sessions SET latest_model = ?1 WHERE id = ?2",
            params![model, session_id.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Update the title.
    pub fn update_title(
        conn: &Connection,
        session_id: &SessionId,
        title: Option<&str>,
    ) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE sessions SET title = ?1 WHERE id = ?2",
            params![title, session_id.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Apply counter deltas in one UPDATE.
    pub fn increment_counters(
        conn: &Connection,
        session_id: &SessionId,
        counters: &IncrementCounters,
    ) -> Result<bool> {
        let mut updates = Vec::new();

        if let Some(v) = counters.event_count {
            updates.push(format!("event_count = event_count + {v}"));
        }
        if let Some(v) = counters.message_count {
            updates.push(format!("message_count = message_count + {v}"));
        }
        if let Some(v) = counters.turn_count {
            updates.push(format!("turn_count = turn_count + {v}"));
        }
        if let Some(v) = counters.input_tokens {
            updates.push(format!("total_input_tokens = total_input_tokens + {v}"));
        }
        if let Some(v) = counters.output_tokens {
            updates.push(format!("total_output_tokens = total_output_tokens + {v}"));
        }
        if let Some(v) = counters.cache_read_tokens {
            updates.push(format!(
                "total_cache_read_tokens = total_cache_read_tokens + {v}"
            ));
        }
        if let Some(v) = counters.cache_creation_tokens {
            updates.push(format!(
                "total_cache_creation_tokens = total_cache_creation_tokens + {v}"
            ));
        }
        if let Some(v) = counters.last_turn_input_tokens {
            // Snapshot, not a sum.
            updates.push(format!("last_turn_input_tokens = {v}"));
        }
        if let Some(v) = counters.cost {
            updates.push(format!("total_cost = total_cost + {v}"));
        }

        if updates.is_empty() {
            return Ok(false);
        }

        let sql = format!("UPDATE sessions SET {} WHERE id = ?1", updates.join(", "));
        let changed = conn.execute(&sql, params![session_id.as_str()])?;
        Ok(changed > 0)
    }

    /// Whether a session exists.
    pub fn exists(conn: &Connection, session_id: &SessionId) -> Result<bool> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sessions WHERE id = ?1)",
            params![session_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Delete a session row.
    pub fn delete(conn: &Connection, session_id: &SessionId) -> Result<bool> {
        let changed = conn.execute(
            "DELETE FROM sessions WHERE id = ?1",
            params![session_id.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Last user prompt and assistant response per session, via a window
    /// query over message events.
    pub fn get_message_previews(
        conn: &Connection,
        session_ids: &[&SessionId],
    ) -> Result<std::collections::HashMap<SessionId, MessagePreview>> {
        let mut result = std::collections::HashMap::new();
        if session_ids.is_empty() {
            return Ok(result);
        }
        for &sid in session_ids {
            let _ = result.insert(sid.clone(), MessagePreview::default());
        }

        let placeholders: Vec<String> = (1..=session_ids.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "WITH ranked AS (
               SELECT session_id, type, payload,
                      ROW_NUMBER() OVER (PARTITION BY session_id, type ORDER BY sequence DESC) AS rn
               FROM events
               WHERE session_id IN ({})
                 AND type IN ('message.user', 'message.assistant')
             )
             SELECT session_id, type, payload FROM ranked WHERE rn = 1",
            placeholders.join(", ")
        );
        let mut stmt = conn.prepare(&sql)?;
        let id_strs: Vec<&str> = session_ids.iter().map(|id| id.as_str()).collect();
        let params: Vec<&dyn rusqlite::types::ToSql> = id_strs
            .iter()
            .map(|s| s as &dyn rusqlite::types::ToSql)
            .collect();
        let rows = stmt
            .query_map(params.as_slice(), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for (session_id, event_type, payload_str) in rows {
            let text = serde_json::from_str::<serde_json::Value>(&payload_str)
                .map(|p| super::event::extract_content(&p))
                .unwrap_or_default();
            if let Some(preview) = result.get_mut(&SessionId::from_raw(session_id)) {
                match event_type.as_str() {
                    "message.user" => preview.last_user_prompt = Some(text),
                    "message.assistant" => preview.last_assistant_response = Some(text),
                    _ => {}
                }
            }
        }

        Ok(result)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRow> {
        Ok(SessionRow {
            id: SessionId::from_raw(row.get::<_, String>("id")?),
            workspace_id: WorkspaceId::from_raw(row.get::<_, String>("workspace_id")?),
            head_event_id: row
                .get::<_, Option<String>>("head_event_id")?
                .map(EventId::from_raw),
            root_event_id: row
                .get::<_, Option<String>>("root_event_id")?
                .map(EventId::from_raw),
            title: row.get("title")?,
            latest_model: row.get("latest_model")?,
            provider: row.get("provider")?,
            working_directory: row.get("working_directory")?,
            parent_session_id: row
                .get::<_, Option<String>>("parent_session_id")?
                .map(SessionId::from_raw),
            fork_from_event_id: row
                .get::<_, Option<String>>("fork_from_event_id")?
                .map(EventId::from_raw),
            created_at: row.get("created_at")?,
            last_activity_at: row.get("last_activity_at")?,
            ended_at: row.get("ended_at")?,
            event_count: row.get("event_count")?,
            message_count: row.get("message_count")?,
            turn_count: row.get("turn_count")?,
            total_input_tokens: row.get("total_input_tokens")?,
            total_output_tokens: row.get("total_output_tokens")?,
            total_cache_read_tokens: row.get("total_cache_read_tokens")?,
            total_cache_creation_tokens: row.get("total_cache_creation_tokens")?,
            last_turn_input_tokens: row.get("last_turn_input_tokens")?,
            total_cost: row.get("total_cost")?,
            tags: row.get("tags")?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
