//! Workspace repository — directory-scoped session grouping.
//!
//! Workspace paths are unique; two sessions opened in the same directory
//! share one workspace. Workspaces are created on demand and never deleted
//! by the core.

use rusqlite::{params, Connection, OptionalExtension};

use braid_core::ids::WorkspaceId;

use crate::errors::Result;
use crate::sqlite::row_types::WorkspaceRow;

/// Options for creating a workspace.
pub struct CreateWorkspaceOptions<'a> {
    /// Absolute filesystem path (must be unique).
    pub path: &'a str,
    /// Optional display name.
    pub name: Option<&'a str>,
}

/// Workspace repository — stateless, every method takes `&Connection`.
pub struct WorkspaceRepo;

impl WorkspaceRepo {
    /// Create a new workspace.
    pub fn create(conn: &Connection, opts: &CreateWorkspaceOptions<'_>) -> Result<WorkspaceRow> {
        let id = WorkspaceId::new();
        let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let _ = conn.execute(
            "INSERT INTO workspaces (id, path, name, created_at, last_activity_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id.as_str(), opts.path, opts.name, now, now],
        )?;
        Ok(WorkspaceRow {
            id,
            path: opts.path.to_string(),
            name: opts.name.map(String::from),
            created_at: now.clone(),
            last_activity_at: now,
            session_count: Some(0),
        })
    }

    /// Get workspace by ID, with session count.
    pub fn get_by_id(conn: &Connection, workspace_id: &WorkspaceId) -> Result<Option<WorkspaceRow>> {
        let row = conn
            .query_row(
                "SELECT w.id, w.path, w.name, w.created_at, w.last_activity_at,
                        (SELECT COUNT(*) FROM sessions WHERE workspace_id = w.id) AS session_count
                 FROM workspaces w WHERE w.id = ?1",
                params![workspace_id.as_str()],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Get workspace by path, with session count.
    pub fn get_by_path(conn: &Connection, path: &str) -> Result<Option<WorkspaceRow>> {
        let row = conn
            .query_row(
                "SELECT w.id, w.path, w.name, w.created_at, w.last_activity_at,
                        (SELECT COUNT(*) FROM sessions WHERE workspace_id = w.id) AS session_count
                 FROM workspaces w WHERE w.path = ?1",
                params![path],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Get the workspace for a path, creating it on first use.
    pub fn get_or_create(
        conn: &Connection,
        path: &str,
        name: Option<&str>,
    ) -> Result<WorkspaceRow> {
        if let Some(ws) = Self::get_by_path(conn, path)? {
            return Ok(ws);
        }
        Self::create(conn, &CreateWorkspaceOptions { path, name })
    }

    /// List all workspaces, most recently active first.
    pub fn list(conn: &Connection) -> Result<Vec<WorkspaceRow>> {
        let mut stmt = conn.prepare(
            "SELECT w.id, w.path, w.name, w.created_at, w.last_activity_at,
                    (SELECT COUNT(*) FROM sessions WHERE workspace_id = w.id) AS session_count
             FROM workspaces w ORDER BY w.last_activity_at DESC",
        )?;
        let rows = stmt
            .query_map([], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Touch last activity.
    pub fn update_last_activity(conn: &Connection, workspace_id: &WorkspaceId) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let changed = conn.execute(
            "UPDATE workspaces SET last_activity_at = ?1 WHERE id = ?2",
            params![now, workspace_id.as_str()],
        )?;
        Ok(changed > 0)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<WorkspaceRow> {
        Ok(WorkspaceRow {
            id: WorkspaceId::from_raw(row.get::<_, String>(0)?),
            path: row.get(1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
            last_activity_at: row.get(4)?,
            session_count: row.get(5)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::errors::EventStoreError;
    use crate::sqlite::migrations::run_migrations;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn create_workspace() {
        let conn = setup();
        let ws = WorkspaceRepo::create(
            &conn,
            &CreateWorkspaceOptions {
                path: "/home/user/project",
                name: Some("project"),
            },
        )
        .unwrap();
        assert!(ws.id.as_str().starts_with("ws_"));
        assert_eq!(ws.path, "/home/user/project");
        assert_eq!(ws.session_count, Some(0));
    }

    #[test]
    fn duplicate_path_is_conflict() {
        let conn = setup();
        WorkspaceRepo::create(
            &conn,
            &CreateWorkspaceOptions {
                path: "/p",
                name: None,
            },
        )
        .unwrap();
        let err = WorkspaceRepo::create(
            &conn,
            &CreateWorkspaceOptions {
                path: "/p",
                name: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, EventStoreError::Conflict(_)));
    }

    #[test]
    fn get_or_create_returns_existing() {
        let conn = setup();
        let a = WorkspaceRepo::get_or_create(&conn, "/p", Some("p")).unwrap();
        let b = WorkspaceRepo::get_or_create(&conn, "/p", None).unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn get_by_path_and_id() {
        let conn = setup();
        let ws = WorkspaceRepo::get_or_create(&conn, "/p", None).unwrap();
        assert_eq!(
            WorkspaceRepo::get_by_path(&conn, "/p").unwrap().unwrap().id,
            ws.id
        );
        assert_eq!(
            WorkspaceRepo::get_by_id(&conn, &ws.id).unwrap().unwrap().path,
            "/p"
        );
        assert!(WorkspaceRepo::get_by_path(&conn, "/missing")
            .unwrap()
            .is_none());
    }

    #[test]
    fn list_workspaces() {
        let conn = setup();
        WorkspaceRepo::get_or_create(&conn, "/a", None).unwrap();
        WorkspaceRepo::get_or_create(&conn, "/b", None).unwrap();
        assert_eq!(WorkspaceRepo::list(&conn).unwrap().len(), 2);
    }
}
