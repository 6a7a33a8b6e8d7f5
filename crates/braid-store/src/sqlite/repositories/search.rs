//! Search repository — FTS5 full-text search over events.
//!
//! The `events_fts` table is populated by the event insert path. Queries use
//! FTS5 `MATCH` with BM25 ranking: raw BM25 ascending puts the best match
//! first, and results surface the absolute value as a positive score.

use rusqlite::{params, Connection};

use braid_core::ids::{EventId, SessionId, WorkspaceId};

use crate::errors::Result;
use crate::types::state::SearchResult;
use crate::types::EventType;

/// Scope filters and pagination for search queries.
#[derive(Default)]
pub struct SearchOptions<'a> {
    /// Restrict to one workspace.
    pub workspace_id: Option<&'a WorkspaceId>,
    /// Restrict to one session.
    pub session_id: Option<&'a SessionId>,
    /// Restrict to specific event types.
    pub types: Option<&'a [EventType]>,
    /// Maximum results.
    pub limit: Option<i64>,
    /// Skip results.
    pub offset: Option<i64>,
}

/// Search repository — stateless, every method takes `&Connection`.
pub struct SearchRepo;

impl SearchRepo {
    /// Full-text search with optional scope filters.
    ///
    /// `query` uses FTS5 syntax (`"exact phrase"`, `alpha OR beta`, …).
    pub fn search(
        conn: &Connection,
        query: &str,
        opts: &SearchOptions<'_>,
    ) -> Result<Vec<SearchResult>> {
        use std::fmt::Write;
        let mut sql = String::from(
            "SELECT
               events_fts.id,
               events_fts.session_id,
               events_fts.type,
               snippet(events_fts, 3, '<mark>', '</mark>', '…', 64) AS snippet,
               bm25(events_fts) AS score,
               e.timestamp
             FROM events_fts
             JOIN events e ON events_fts.id = e.id
             WHERE events_fts MATCH ?1",
        );
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        values.push(Box::new(query.to_string()));

        if let Some(ws_id) = opts.workspace_id {
            let _ = write!(sql, " AND e.workspace_id = ?{}", values.len() + 1);
            values.push(Box::new(ws_id.as_str().to_string()));
        }
        if let Some(sess_id) = opts.session_id {
            let _ = write!(sql, " AND events_fts.session_id = ?{}", values.len() + 1);
            values.push(Box::new(sess_id.as_str().to_string()));
        }
        if let Some(types) = opts.types {
            if !types.is_empty() {
                let placeholders: Vec<String> = types
                    .iter()
                    .enumerate()
                    .map(|(i, _)| format!("?{}", values.len() + i + 1))
                    .collect();
                let _ = write!(sql, " AND events_fts.type IN ({})", placeholders.join(", "));
                for t in types {
                    values.push(Box::new(t.as_str().to_string()));
                }
            }
        }

        sql.push_str(" ORDER BY score");
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
        Ok(rows.into_iter().flatten().collect())
    }

    /// Rebuild the FTS rows for one session from the events table.
    ///
    /// Counters and index can always be repaired from the log; this is the
    /// index half of that repair. Returns the number of events re-indexed.
    pub fn rebuild_session_index(conn: &Connection, session_id: &SessionId) -> Result<usize> {
        let _ = conn.execute(
            "DELETE FROM events_fts WHERE session_id = ?1",
            params![session_id.as_str()],
        )?;

        let mut stmt = conn.prepare(
            "SELECT id, type, payload, tool_name FROM events
             WHERE session_id = ?1 ORDER BY sequence ASC",
        )?;
        let events: Vec<(String, String, String, Option<String>)> = stmt
            .query_map(params![session_id.as_str()], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let count = events.len();
        for (id, event_type, payload_str, tool_name) in &events {
            let content = serde_json::from_str::<serde_json::Value>(payload_str)
                .map(|p| super::event::extract_content(&p))
                .unwrap_or_default();
            let _ = conn.execute(
                "INSERT INTO events_fts (id, session_id, type, content, tool_name)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    session_id.as_str(),
                    event_type,
                    content,
                    tool_name.clone().unwrap_or_default()
                ],
            )?;
        }

        Ok(count)
    }

    /// Count indexed events for a session.
    pub fn count_by_session(conn: &Connection, session_id: &SessionId) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM events_fts WHERE session_id = ?1",
            params![session_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Option<SearchResult>> {
        let event_type_str: String = row.get(2)?;
        // Rows written by newer versions may carry unknown types; skip them.
        let Ok(event_type) = event_type_str.parse::<EventType>() else {
            return Ok(None);
        };
        let raw_score: f64 = row.get(4)?;
        Ok(Some(SearchResult {
            event_id: EventId::from_raw(row.get::<_, String>(0)?),
            session_id: SessionId::from_raw(row.get::<_, String>(1)?),
            event_type,
            snippet: row.get(3)?,
            score: raw_score.abs(),
            timestamp: row.get(5)?,
        }))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
