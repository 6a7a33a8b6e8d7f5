//! Blob repository — content-addressed large-content storage.
//!
//! Content is hashed with SHA-256; storing identical bytes twice increments
//! the reference count instead of creating a second row. Garbage collection
//! beyond `delete_unreferenced` is out of scope.

use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use braid_core::ids::BlobId;

use crate::errors::Result;
use crate::sqlite::row_types::BlobRow;

/// Blob repository — stateless, every method takes `&Connection`.
pub struct BlobRepo;

impl BlobRepo {
    /// Store content, deduplicating by hash. Returns the blob ID.
    pub fn store(conn: &Connection, content: &[u8], mime_type: &str) -> Result<BlobId> {
        let hash = hex_sha256(content);

        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM blobs WHERE hash = ?1",
                params![hash],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            let _ = conn.execute(
                "UPDATE blobs SET ref_count = ref_count + 1 WHERE id = ?1",
                params![id],
            )?;
            return Ok(BlobId::from_raw(id));
        }

        let id = BlobId::new();
        let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let size = i64::try_from(content.len()).unwrap_or(i64::MAX);

        let _ = conn.execute(
            "INSERT INTO blobs (id, hash, content, mime_type, size_original, size_compressed, compression, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'none', ?7)",
            params![id.as_str(), hash, content, mime_type, size, size, now],
        )?;
        Ok(id)
    }

    /// Get blob content by ID.
    pub fn get_content(conn: &Connection, blob_id: &BlobId) -> Result<Option<Vec<u8>>> {
        let content: Option<Vec<u8>> = conn
            .query_row(
                "SELECT content FROM blobs WHERE id = ?1",
                params![blob_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(content)
    }

    /// Get the full blob record by ID.
    pub fn get_by_id(conn: &Connection, blob_id: &BlobId) -> Result<Option<BlobRow>> {
        let row = conn
            .query_row(
                "SELECT id, hash, content, mime_type, size_original, size_compressed, compression, created_at, ref_count
                 FROM blobs WHERE id = ?1",
                params![blob_id.as_str()],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Get blob by content hash.
    pub fn get_by_hash(conn: &Connection, hash: &str) -> Result<Option<BlobRow>> {
        let row = conn
            .query_row(
                "SELECT id, hash, content, mime_type, size_original, size_compressed, compression, created_at, ref_count
                 FROM blobs WHERE hash = ?1",
                params![hash],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Reference count for a blob.
    pub fn get_ref_count(conn: &Connection, blob_id: &BlobId) -> Result<Option<i64>> {
        let count: Option<i64> = conn
            .query_row(
                "SELECT ref_count FROM blobs WHERE id = ?1",
                params![blob_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count)
    }

    /// Decrement a blob's reference count, flooring at zero.
    pub fn decrement_ref_count(conn: &Connection, blob_id: &BlobId) -> Result<Option<i64>> {
        let _ = conn.execute(
            "UPDATE blobs SET ref_count = ref_count - 1 WHERE id = ?1 AND ref_count > 0",
            params![blob_id.as_str()],
        )?;
        Self::get_ref_count(conn, blob_id)
    }

    /// Delete blobs with zero references. Returns count deleted.
    pub fn delete_unreferenced(conn: &Connection) -> Result<usize> {
        let changed = conn.execute("DELETE FROM blobs WHERE ref_count <= 0", [])?;
        Ok(changed)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BlobRow> {
        Ok(BlobRow {
            id: BlobId::from_raw(row.get::<_, String>(0)?),
            hash: row.get(1)?,
            content: row.get(2)?,
            mime_type: row.get(3)?,
            size_original: row.get(4)?,
            size_compressed: row.get(5)?,
            compression: row.get(6)?,
            created_at: row.get(7)?,
            ref_count: row.get(8)?,
        })
    }
}

fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
