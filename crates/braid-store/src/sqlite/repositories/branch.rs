//! Branch repository — named head pointers within a session.
//!
//! Branches never influence projection; they are bookmarks into the event
//! tree with one optional default per session.

use rusqlite::{params, Connection, OptionalExtension};

use braid_core::ids::{BranchId, EventId, SessionId};

use crate::errors::Result;
use crate::sqlite::row_types::BranchRow;

/// Options for creating a branch.
pub struct CreateBranchOptions<'a> {
    /// Session this branch belongs to.
    pub session_id: &'a SessionId,
    /// Branch name.
    pub name: &'a str,
    /// Root event of the branch.
    pub root_event_id: &'a EventId,
    /// Initial head event.
    pub head_event_id: &'a EventId,
    /// Whether this is the default branch.
    pub is_default: bool,
}

/// Branch repository — stateless, every method takes `&Connection`.
pub struct BranchRepo;

impl BranchRepo {
    /// Create a new branch.
    pub fn create(conn: &Connection, opts: &CreateBranchOptions<'_>) -> Result<BranchRow> {
        let id = BranchId::new();
        let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let _ = conn.execute(
            "INSERT INTO branches (id, session_id, name, root_event_id, head_event_id, is_default, created_at, last_activity_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id.as_str(),
                opts.session_id.as_str(),
                opts.name,
                opts.root_event_id.as_str(),
                opts.head_event_id.as_str(),
                opts.is_default,
                now,
                now
            ],
        )?;
        Ok(BranchRow {
            id,
            session_id: opts.session_id.clone(),
            name: opts.name.to_string(),
            root_event_id: opts.root_event_id.clone(),
            head_event_id: opts.head_event_id.clone(),
            is_default: opts.is_default,
            created_at: now.clone(),
            last_activity_at: now,
        })
    }

    /// Get branch by ID.
    pub fn get_by_id(conn: &Connection, branch_id: &BranchId) -> Result<Option<BranchRow>> {
        let row = conn
            .query_row(
                "SELECT id, session_id, name, root_event_id, head_event_id, is_default, created_at, last_activity_at
                 FROM branches WHERE id = ?1",
                params![branch_id.as_str()],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// All branches for a session, oldest first.
    pub fn get_by_session(conn: &Connection, session_id: &SessionId) -> Result<Vec<BranchRow>> {
        let mut stmt = conn.prepare(
            "SELECT id, session_id, name, root_event_id, head_event_id, is_default, created_at, last_activity_at
             FROM branches WHERE session_id = ?1 ORDER BY created_at ASC",
        )?;
        let rows = stmt
            .query_map(params![session_id.as_str()], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Advance a branch head.
    pub fn update_head(
        conn: &Connection,
        branch_id: &BranchId,
        head_event_id: &EventId,
    ) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let changed = conn.execute(
            "UPDATE branches SET head_event_id = ?1, last_activity_at = ?2 WHERE id = ?3",
            params![head_event_id.as_str(), now, branch_id.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Make a branch the default, unsetting the rest of its session.
    pub fn set_default(conn: &Connection, branch_id: &BranchId) -> Result<bool> {
        let session_id: Option<String> = conn
            .query_row(
                "SELECT session_id FROM branches WHERE id = ?1",
                params![branch_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(session_id) = session_id else {
            return Ok(false);
        };

        let _ = conn.execute(
            "UPDATE branches SET is_default = 0 WHERE session_id = ?1",
            params![session_id],
        )?;
        let changed = conn.execute(
            "UPDATE branches SET is_default = 1 WHERE id = ?1",
            params![branch_id.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Delete all branches for a session. Returns count deleted.
    pub fn delete_by_session(conn: &Connection, session_id: &SessionId) -> Result<usize> {
        let changed = conn.execute(
            "DELETE FROM branches WHERE session_id = ?1",
            params![session_id.as_str()],
        )?;
        Ok(changed)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BranchRow> {
        Ok(BranchRow {
            id: BranchId::from_raw(row.get::<_, String>(0)?),
            session_id: SessionId::from_raw(row.get::<_, String>(1)?),
            name: row.get(2)?,
            root_event_id: EventId::from_raw(row.get::<_, String>(3)?),
            head_event_id: EventId::from_raw(row.get::<_, String>(4)?),
            is_default: row.get(5)?,
            created_at: row.get(6)?,
            last_activity_at: row.get(7)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
