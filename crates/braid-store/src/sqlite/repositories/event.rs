//! Event repository — append-only event log primitives.
//!
//! Events are immutable rows forming a parent-pointing tree. This module
//! provides insert (with denormalized-column extraction and FTS indexing),
//! tree traversal via recursive CTEs, and the query primitives the facade
//! composes into transactions.

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use braid_core::ids::{EventId, SessionId, WorkspaceId};

use crate::errors::Result;
use crate::sqlite::row_types::EventRow;
use crate::types::SessionEvent;

/// Column list shared by every event SELECT.
const EVENT_COLUMNS: &str = "id, session_id, parent_id, sequence, depth, type, timestamp, payload, \
     content_blob_id, workspace_id, role, tool_name, tool_call_id, turn, \
     input_tokens, output_tokens, cache_read_tokens, cache_creation_tokens, checksum";

/// Options for listing events.
#[derive(Default)]
pub struct ListEventsOptions {
    /// Maximum number of events to return.
    pub limit: Option<i64>,
    /// Number of events to skip.
    pub offset: Option<i64>,
}

/// Aggregate token usage over a session's events.
#[derive(Clone, Debug, Default)]
pub struct TokenUsageSummary {
    /// Total input tokens.
    pub input_tokens: i64,
    /// Total output tokens.
    pub output_tokens: i64,
    /// Total cache read tokens.
    pub cache_read_tokens: i64,
    /// Total cache creation tokens.
    pub cache_creation_tokens: i64,
}

/// Event repository — stateless, every method takes `&Connection`.
pub struct EventRepo;

impl EventRepo {
    /// Insert one event and its full-text index row.
    ///
    /// Denormalized columns (role, tool name, turn, token counters) and the
    /// searchable text are extracted from the payload here so every write
    /// path indexes identically.
    pub fn insert(conn: &Connection, event: &SessionEvent) -> Result<()> {
        let role = extract_role(event.event_type.as_str());
        let tool_name = extract_str(&event.payload, "toolName")
            .or_else(|| extract_str(&event.payload, "name"));
        let tool_call_id = extract_str(&event.payload, "toolCallId");
        let turn = event.payload.get("turn").and_then(Value::as_i64);
        let depth = Self::compute_depth(conn, event.parent_id.as_ref())?;
        let (input_tokens, output_tokens, cache_read, cache_create) =
            extract_tokens(&event.payload);

        let payload_str = serde_json::to_string(&event.payload)?;

        let _ = conn.execute(
            "INSERT INTO events (id, session_id, parent_id, sequence, depth, type, timestamp, payload,
             content_blob_id, workspace_id, role, tool_name, tool_call_id, turn,
             input_tokens, output_tokens, cache_read_tokens, cache_creation_tokens, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
            params![
                event.id.as_str(),
                event.session_id.as_str(),
                event.parent_id.as_ref().map(|p| p.as_str()),
                event.sequence,
                depth,
                event.event_type.as_str(),
                event.timestamp,
                payload_str,
                Option::<String>::None,
                event.workspace_id.as_str(),
                role,
                tool_name,
                tool_call_id,
                turn,
                input_tokens,
                output_tokens,
                cache_read,
                cache_create,
                event.checksum,
            ],
        )?;

        let _ = conn.execute(
            "INSERT INTO events_fts (id, session_id, type, content, tool_name)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.id.as_str(),
                event.session_id.as_str(),
                event.event_type.as_str(),
                extract_content(&event.payload),
                extract_str(&event.payload, "toolName")
                    .or_else(|| extract_str(&event.payload, "name"))
                    .unwrap_or_default(),
            ],
        )?;

        Ok(())
    }

    /// Get a single event by ID.
    pub fn get_by_id(conn: &Connection, event_id: &EventId) -> Result<Option<EventRow>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1");
        let row = conn
            .query_row(&sql, params![event_id.as_str()], Self::map_row)
            .optional()?;
        Ok(row)
    }

    /// Batch-fetch events by IDs. Missing IDs are silently omitted.
    pub fn get_by_ids(
        conn: &Connection,
        event_ids: &[&EventId],
    ) -> Result<std::collections::HashMap<EventId, EventRow>> {
        let mut result = std::collections::HashMap::new();
        if event_ids.is_empty() {
            return Ok(result);
        }

        let placeholders: Vec<String> = (1..=event_ids.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id IN ({})",
            placeholders.join(", ")
        );
        let mut stmt = conn.prepare(&sql)?;
        let id_strs: Vec<&str> = event_ids.iter().map(|id| id.as_str()).collect();
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

    /// List a session's events ordered by sequence.
    pub fn get_by_session(
        conn: &Connection,
        session_id: &SessionId,
        opts: &ListEventsOptions,
    ) -> Result<Vec<EventRow>> {
        use std::fmt::Write;
        let mut sql =
            format!("SELECT {EVENT_COLUMNS} FROM events WHERE session_id = ?1 ORDER BY sequence ASC");
        if let Some(limit) = opts.limit {
            let _ = write!(sql, " LIMIT {limit}");
        }
        if let Some(offset) = opts.offset {
            let _ = write!(sql, " OFFSET {offset}");
        }

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![session_id.as_str()], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Next sequence number for a session: `max + 1`, 0 when empty.
    pub fn get_next_sequence(conn: &Connection, session_id: &SessionId) -> Result<i64> {
        let max: Option<i64> = conn.query_row(
            "SELECT MAX(sequence) FROM events WHERE session_id = ?1",
            params![session_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(max.map_or(0, |m| m + 1))
    }

    /// Ancestor chain from the root to the given event (inclusive),
    /// oldest first. Crosses fork boundaries into the source session.
    pub fn get_ancestors(conn: &Connection, event_id: &EventId) -> Result<Vec<EventRow>> {
        let sql = format!(
            "WITH RECURSIVE chain(cid, cparent, lvl) AS (
               SELECT id, parent_id, 0 FROM events WHERE id = ?1
               UNION ALL
               SELECT e.id, e.parent_id, c.lvl + 1
               FROM events e JOIN chain c ON e.id = c.cparent
               WHERE c.lvl < 100000
             )
             SELECT {EVENT_COLUMNS} FROM events
             JOIN chain ON events.id = chain.cid
             ORDER BY chain.lvl DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![event_id.as_str()], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Direct children of an event.
    pub fn get_children(conn: &Connection, event_id: &EventId) -> Result<Vec<EventRow>> {
        let sql =
            format!("SELECT {EVENT_COLUMNS} FROM events WHERE parent_id = ?1 ORDER BY sequence ASC");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![event_id.as_str()], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// All descendants of an event (recursive, excludes the event itself).
    pub fn get_descendants(conn: &Connection, event_id: &EventId) -> Result<Vec<EventRow>> {
        let sql = format!(
            "WITH RECURSIVE sub(did, lvl) AS (
               SELECT id, 0 FROM events WHERE parent_id = ?1
               UNION ALL
               SELECT e.id, s.lvl + 1
               FROM events e JOIN sub s ON e.parent_id = s.did
               WHERE s.lvl < 100000
             )
             SELECT {EVENT_COLUMNS} FROM events
             JOIN sub ON events.id = sub.did
             ORDER BY events.sequence ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![event_id.as_str()], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Events after a given sequence number (for incremental sync).
    pub fn get_since(
        conn: &Connection,
        session_id: &SessionId,
        after_sequence: i64,
    ) -> Result<Vec<EventRow>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE session_id = ?1 AND sequence > ?2 ORDER BY sequence ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![session_id.as_str(), after_sequence], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Events of specific types within a session.
    pub fn get_by_types(
        conn: &Connection,
        session_id: &SessionId,
        types: &[&str],
        limit: Option<i64>,
    ) -> Result<Vec<EventRow>> {
        use std::fmt::Write;
        if types.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders: Vec<String> = (2..=types.len() + 1).map(|i| format!("?{i}")).collect();
        let mut sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE session_id = ?1 AND type IN ({}) ORDER BY sequence ASC",
            placeholders.join(", ")
        );
        if let Some(limit) = limit {
            let _ = write!(sql, " LIMIT {limit}");
        }

        let mut stmt = conn.prepare(&sql)?;
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        values.push(Box::new(session_id.as_str().to_string()));
        for t in types {
            values.push(Box::new((*t).to_string()));
        }
        let value_refs: Vec<&dyn rusqlite::types::ToSql> =
            values.iter().map(Box::as_ref).collect();
        let rows = stmt
            .query_map(value_refs.as_slice(), Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Latest event in a session by sequence.
    pub fn get_latest(conn: &Connection, session_id: &SessionId) -> Result<Option<EventRow>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE session_id = ?1 ORDER BY sequence DESC LIMIT 1"
        );
        let row = conn
            .query_row(&sql, params![session_id.as_str()], Self::map_row)
            .optional()?;
        Ok(row)
    }

    /// Count events in a session.
    pub fn count_by_session(conn: &Connection, session_id: &SessionId) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM events WHERE session_id = ?1",
            params![session_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Count events of one type in a session.
    pub fn count_by_type(
        conn: &Connection,
        session_id: &SessionId,
        event_type: &str,
    ) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM events WHERE session_id = ?1 AND type = ?2",
            params![session_id.as_str(), event_type],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Whether an event exists.
    pub fn exists(conn: &Connection, event_id: &EventId) -> Result<bool> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM events WHERE id = ?1)",
            params![event_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Delete all events for a session (with their FTS rows). Returns the
    /// number of event rows removed.
    pub fn delete_by_session(conn: &Connection, session_id: &SessionId) -> Result<usize> {
        let _ = conn.execute(
            "DELETE FROM events_fts WHERE session_id = ?1",
            params![session_id.as_str()],
        )?;
        let changed = conn.execute(
            "DELETE FROM events WHERE session_id = ?1",
            params![session_id.as_str()],
        )?;
        Ok(changed)
    }

    /// Sum the denormalized token columns over a session's events.
    pub fn get_token_usage_summary(
        conn: &Connection,
        session_id: &SessionId,
    ) -> Result<TokenUsageSummary> {
        let summary = conn.query_row(
            "SELECT COALESCE(SUM(input_tokens), 0),
                    COALESCE(SUM(output_tokens), 0),
                    COALESCE(SUM(cache_read_tokens), 0),
                    COALESCE(SUM(cache_creation_tokens), 0)
             FROM events WHERE session_id = ?1",
            params![session_id.as_str()],
            |row| {
                Ok(TokenUsageSummary {
                    input_tokens: row.get(0)?,
                    output_tokens: row.get(1)?,
                    cache_read_tokens: row.get(2)?,
                    cache_creation_tokens: row.get(3)?,
                })
            },
        )?;
        Ok(summary)
    }

    fn compute_depth(conn: &Connection, parent_id: Option<&EventId>) -> Result<i64> {
        match parent_id {
            None => Ok(0),
            Some(pid) => {
                let depth: Option<i64> = conn
                    .query_row(
                        "SELECT depth FROM events WHERE id = ?1",
                        params![pid.as_str()],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(depth.unwrap_or(0) + 1)
            }
        }
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRow> {
        Ok(EventRow {
            id: EventId::from_raw(row.get::<_, String>(0)?),
            session_id: SessionId::from_raw(row.get::<_, String>(1)?),
            parent_id: row.get::<_, Option<String>>(2)?.map(EventId::from_raw),
            sequence: row.get(3)?,
            depth: row.get(4)?,
            event_type: row.get(5)?,
            timestamp: row.get(6)?,
            payload: row.get(7)?,
            content_blob_id: row
                .get::<_, Option<String>>(8)?
                .map(braid_core::ids::BlobId::from_raw),
            workspace_id: WorkspaceId::from_raw(row.get::<_, String>(9)?),
            role: row.get(10)?,
            tool_name: row.get(11)?,
            tool_call_id: row.get(12)?,
            turn: row.get(13)?,
            input_tokens: row.get(14)?,
            output_tokens: row.get(15)?,
            cache_read_tokens: row.get(16)?,
            cache_creation_tokens: row.get(17)?,
            checksum: row.get(18)?,
        })
    }
}

/// Extract the searchable text from a payload: a string `content` directly,
/// or the `text` fields of text blocks joined with spaces.
pub(crate) fn extract_content(payload: &Value) -> String {
    match payload.get("content") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(blocks)) => blocks
            .iter()
            .filter_map(|b| {
                if b.get("type").and_then(Value::as_str) == Some("text") {
                    b.get("text").and_then(Value::as_str).map(String::from)
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

fn extract_role(event_type: &str) -> Option<&'static str> {
    match event_type {
        "message.user" => Some("user"),
        "message.assistant" => Some("assistant"),
        "message.system" => Some("system"),
        "tool.result" => Some("tool"),
        _ => None,
    }
}

fn extract_str(payload: &Value, key: &str) -> Option<String> {
    payload.get(key)?.as_str().map(String::from)
}

fn extract_tokens(payload: &Value) -> (Option<i64>, Option<i64>, Option<i64>, Option<i64>) {
    match payload.get("tokenUsage") {
        Some(tu) => (
            tu.get("inputTokens").and_then(Value::as_i64),
            tu.get("outputTokens").and_then(Value::as_i64),
            tu.get("cacheReadTokens").and_then(Value::as_i64),
            tu.get("cacheCreationTokens").and_then(Value::as_i64),
        ),
        None => (None, None, None, None),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::sqlite::migrations::run_migrations;
    use crate::types::EventType;
    use serde_json::json;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO workspaces (id, path, created_at, last_activity_at)
             VALUES ('ws_1', '/w', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO sessions (id, workspace_id, latest_model, working_directory, created_at, last_activity_at)
             VALUES ('sess_1', 'ws_1', 'claude-sonnet-4-5', '/w', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        conn
    }

    fn make_event(
        id: &str,
        seq: i64,
        event_type: EventType,
        parent_id: Option<&str>,
        payload: serde_json::Value,
    ) -> SessionEvent {
        SessionEvent {
            id: EventId::from_raw(id),
            parent_id: parent_id.map(EventId::from_raw),
            session_id: SessionId::from_raw("sess_1"),
            workspace_id: WorkspaceId::from_raw("ws_1"),
            timestamp: "2026-01-01T00:00:00.000Z".to_string(),
            event_type,
            sequence: seq,
            checksum: None,
            payload,
        }
    }

    fn insert_chain(conn: &Connection, n: i64) {
        for i in 0..n {
            let parent = format!("evt_{}", i - 1);
            let event = make_event(
                &format!("evt_{i}"),
                i,
                EventType::MessageUser,
                if i == 0 { None } else { Some(parent.as_str()) },
                json!({"content": format!("msg {i}")}),
            );
            EventRepo::insert(conn, &event).unwrap();
        }
    }

    #[test]
    fn insert_and_get() {
        let conn = setup();
        let event = make_event("evt_1", 0, EventType::SessionStart, None, json!({}));
        EventRepo::insert(&conn, &event).unwrap();

        let row = EventRepo::get_by_id(&conn, &EventId::from_raw("evt_1"))
            .unwrap()
            .unwrap();
        assert_eq!(row.id.as_str(), "evt_1");
        assert_eq!(row.sequence, 0);
        assert_eq!(row.depth, 0);
        assert_eq!(row.event_type, "session.start");
    }

    #[test]
    fn duplicate_id_conflicts_and_leaves_original() {
        let conn = setup();
        let event = make_event("evt_1", 0, EventType::SessionStart, None, json!({"v": 1}));
        EventRepo::insert(&conn, &event).unwrap();

        let dup = make_event("evt_1", 1, EventType::MessageUser, None, json!({"v": 2}));
        let err = EventRepo::insert(&conn, &dup).unwrap_err();
        assert!(matches!(err, crate::errors::EventStoreError::Conflict(_)));

        let row = EventRepo::get_by_id(&conn, &EventId::from_raw("evt_1"))
            .unwrap()
            .unwrap();
        assert!(row.payload.contains("\"v\":1"));
    }

    #[test]
    fn insert_extracts_denormalized_columns() {
        let conn = setup();
        let event = make_event(
            "evt_1",
            0,
            EventType::MessageAssistant,
            None,
            json!({
                "content": [{"type": "text", "text": "hi"}],
                "turn": 3,
                "tokenUsage": {"inputTokens": 100, "outputTokens": 50, "cacheReadTokens": 25}
            }),
        );
        EventRepo::insert(&conn, &event).unwrap();

        let row = EventRepo::get_by_id(&conn, &EventId::from_raw("evt_1"))
            .unwrap()
            .unwrap();
        assert_eq!(row.role.as_deref(), Some("assistant"));
        assert_eq!(row.turn, Some(3));
        assert_eq!(row.input_tokens, Some(100));
        assert_eq!(row.output_tokens, Some(50));
        assert_eq!(row.cache_read_tokens, Some(25));
        assert_eq!(row.cache_creation_tokens, None);
    }

    #[test]
    fn insert_extracts_tool_columns() {
        let conn = setup();
        let event = make_event(
            "evt_1",
            0,
            EventType::ToolCall,
            None,
            json!({"toolCallId": "toolu_1", "name": "Bash", "arguments": {}}),
        );
        EventRepo::insert(&conn, &event).unwrap();

        let row = EventRepo::get_by_id(&conn, &EventId::from_raw("evt_1"))
            .unwrap()
            .unwrap();
        assert_eq!(row.tool_name.as_deref(), Some("Bash"));
        assert_eq!(row.tool_call_id.as_deref(), Some("toolu_1"));
    }

    #[test]
    fn insert_computes_depth() {
        let conn = setup();
        insert_chain(&conn, 3);
        for i in 0..3 {
            let row = EventRepo::get_by_id(&conn, &EventId::from_raw(format!("evt_{i}")))
                .unwrap()
                .unwrap();
            assert_eq!(row.depth, i);
        }
    }

    #[test]
    fn insert_writes_fts_row() {
        let conn = setup();
        let event = make_event(
            "evt_1",
            0,
            EventType::MessageUser,
            None,
            json!({"content": "search for this phrase"}),
        );
        EventRepo::insert(&conn, &event).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM events_fts WHERE events_fts MATCH 'phrase'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn fts_indexes_text_blocks() {
        let conn = setup();
        let event = make_event(
            "evt_1",
            0,
            EventType::MessageAssistant,
            None,
            json!({"content": [
                {"type": "text", "text": "alpha"},
                {"type": "tool_use", "id": "toolu_1", "name": "Bash", "input": {"command": "zebra"}},
                {"type": "text", "text": "bravo"}
            ]}),
        );
        EventRepo::insert(&conn, &event).unwrap();

        let hits = |q: &str| -> i64 {
            conn.query_row(
                &format!("SELECT COUNT(*) FROM events_fts WHERE events_fts MATCH 'content: {q}'"),
                [],
                |row| row.get(0),
            )
            .unwrap()
        };
        assert_eq!(hits("alpha"), 1);
        assert_eq!(hits("bravo"), 1);
        // Non-text blocks are not indexed as content.
        assert_eq!(hits("zebra"), 0);
    }

    #[test]
    fn next_sequence_starts_at_zero() {
        let conn = setup();
        assert_eq!(
            EventRepo::get_next_sequence(&conn, &SessionId::from_raw("sess_1")).unwrap(),
            0
        );
        insert_chain(&conn, 3);
        assert_eq!(
            EventRepo::get_next_sequence(&conn, &SessionId::from_raw("sess_1")).unwrap(),
            3
        );
    }

    #[test]
    fn ancestors_chain_oldest_first() {
        let conn = setup();
        insert_chain(&conn, 5);

        let ancestors = EventRepo::get_ancestors(&conn, &EventId::from_raw("evt_4")).unwrap();
        assert_eq!(ancestors.len(), 5);
        assert_eq!(ancestors[0].id.as_str(), "evt_0");
        assert_eq!(ancestors[4].id.as_str(), "evt_4");
    }

    #[test]
    fn ancestors_of_root_is_itself() {
        let conn = setup();
        insert_chain(&conn, 1);
        let ancestors = EventRepo::get_ancestors(&conn, &EventId::from_raw("evt_0")).unwrap();
        assert_eq!(ancestors.len(), 1);
    }

    #[test]
    fn ancestors_of_missing_event_is_empty() {
        let conn = setup();
        let ancestors = EventRepo::get_ancestors(&conn, &EventId::from_raw("evt_none")).unwrap();
        assert!(ancestors.is_empty());
    }

    #[test]
    fn children_and_descendants() {
        let conn = setup();
        let root = make_event("evt_r", 0, EventType::SessionStart, None, json!({}));
        let a = make_event("evt_a", 1, EventType::MessageUser, Some("evt_r"), json!({}));
        let b = make_event("evt_b", 2, EventType::MessageUser, Some("evt_r"), json!({}));
        let c = make_event(
            "evt_c",
            3,
            EventType::MessageAssistant,
            Some("evt_a"),
            json!({}),
        );
        for e in [&root, &a, &b, &c] {
            EventRepo::insert(&conn, e).unwrap();
        }

        let children = EventRepo::get_children(&conn, &EventId::from_raw("evt_r")).unwrap();
        assert_eq!(children.len(), 2);

        let descendants = EventRepo::get_descendants(&conn, &EventId::from_raw("evt_r")).unwrap();
        assert_eq!(descendants.len(), 3);
    }

    #[test]
    fn get_since_sequence() {
        let conn = setup();
        insert_chain(&conn, 5);
        let tail = EventRepo::get_since(&conn, &SessionId::from_raw("sess_1"), 2).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].sequence, 3);
    }

    #[test]
    fn get_by_ids_batch() {
        let conn = setup();
        insert_chain(&conn, 3);
        let id0 = EventId::from_raw("evt_0");
        let id2 = EventId::from_raw("evt_2");
        let missing = EventId::from_raw("evt_9");
        let map = EventRepo::get_by_ids(&conn, &[&id0, &id2, &missing]).unwrap();
        assert_eq!(map.len(), 2);
        assert!(map.contains_key(&id0));
        assert!(!map.contains_key(&missing));
    }

    #[test]
    fn get_by_types_filters() {
        let conn = setup();
        EventRepo::insert(
            &conn,
            &make_event("evt_0", 0, EventType::MessageUser, None, json!({})),
        )
        .unwrap();
        EventRepo::insert(
            &conn,
            &make_event("evt_1", 1, EventType::ToolCall, None, json!({})),
        )
        .unwrap();
        EventRepo::insert(
            &conn,
            &make_event("evt_2", 2, EventType::MessageAssistant, None, json!({})),
        )
        .unwrap();

        let rows = EventRepo::get_by_types(
            &conn,
            &SessionId::from_raw("sess_1"),
            &["message.user", "message.assistant"],
            None,
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn delete_by_session_clears_fts() {
        let conn = setup();
        insert_chain(&conn, 3);
        let deleted = EventRepo::delete_by_session(&conn, &SessionId::from_raw("sess_1")).unwrap();
        assert_eq!(deleted, 3);

        let fts_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM events_fts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fts_count, 0);
    }

    #[test]
    fn token_usage_summary_sums() {
        let conn = setup();
        EventRepo::insert(
            &conn,
            &make_event(
                "evt_0",
                0,
                EventType::MessageAssistant,
                None,
                json!({"content": [], "tokenUsage": {"inputTokens": 100, "outputTokens": 50}}),
            ),
        )
        .unwrap();
        EventRepo::insert(
            &conn,
            &make_event(
                "evt_1",
                1,
                EventType::MessageAssistant,
                None,
                json!({"content": [], "tokenUsage": {"inputTokens": 200, "outputTokens": 100, "cacheReadTokens": 30}}),
            ),
        )
        .unwrap();

        let summary =
            EventRepo::get_token_usage_summary(&conn, &SessionId::from_raw("sess_1")).unwrap();
        assert_eq!(summary.input_tokens, 300);
        assert_eq!(summary.output_tokens, 150);
        assert_eq!(summary.cache_read_tokens, 30);
    }

    #[test]
    fn latest_event() {
        let conn = setup();
        assert!(
            EventRepo::get_latest(&conn, &SessionId::from_raw("sess_1"))
                .unwrap()
                .is_none()
        );
        insert_chain(&conn, 3);
        let latest = EventRepo::get_latest(&conn, &SessionId::from_raw("sess_1"))
            .unwrap()
            .unwrap();
        assert_eq!(latest.sequence, 2);
    }
}
