//! `SQLite` connection pool with WAL mode and foreign keys enabled.
//!
//! `r2d2` pooling over `r2d2_sqlite`; [`PragmaCustomizer`] runs on each new
//! connection. The `":memory:"` path sentinel opens a named shared-cache
//! in-memory database so every pooled connection sees the same data.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::errors::{EventStoreError, Result};

/// Path sentinel selecting an in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// Alias for the connection pool type.
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// Alias for a pooled connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Pool configuration.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Database file path, or [`MEMORY_PATH`] for in-memory.
    pub db_path: String,
    /// Whether to enable write-ahead logging (default: true).
    pub enable_wal: bool,
    /// Busy timeout in milliseconds (default: 5000).
    pub busy_timeout_ms: u32,
    /// Maximum pool size (default: 16).
    pub pool_size: u32,
    /// Page cache size in KiB (default: 65536 = 64 MiB).
    pub cache_size_kib: i64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            db_path: MEMORY_PATH.to_string(),
            enable_wal: true,
            busy_timeout_ms: 5_000,
            pool_size: 16,
            cache_size_kib: 65_536,
        }
    }
}

#[derive(Debug)]
struct PragmaCustomizer {
    enable_wal: bool,
    busy_timeout_ms: u32,
    cache_size_kib: i64,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for PragmaCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        let journal = if self.enable_wal { "WAL" } else { "DELETE" };
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = {journal};\
             PRAGMA busy_timeout = {};\
             PRAGMA foreign_keys = ON;\
             PRAGMA cache_size = -{};\
             PRAGMA synchronous = NORMAL;",
            self.busy_timeout_ms, self.cache_size_kib
        ))?;
        Ok(())
    }
}

/// Open a connection pool per the config.
///
/// In-memory databases live as long as the pool keeps at least one
/// connection open; each pool gets its own private database.
pub fn new_pool(config: &ConnectionConfig) -> Result<ConnectionPool> {
    let manager = if config.db_path == MEMORY_PATH {
        // Named shared-cache URI: all pooled connections share one database.
        SqliteConnectionManager::file(format!(
            "file:braid-{}?mode=memory&cache=shared",
            uuid::Uuid::now_v7()
        ))
    } else {
        if let Some(parent) = std::path::Path::new(&config.db_path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| EventStoreError::Internal(format!("create db dir: {e}")))?;
        }
        SqliteConnectionManager::file(&config.db_path)
    };

    let pool = Pool::builder()
        .max_size(config.pool_size)
        .connection_timeout(std::time::Duration::from_secs(5))
        .connection_customizer(Box::new(PragmaCustomizer {
            enable_wal: config.enable_wal,
            busy_timeout_ms: config.busy_timeout_ms,
            cache_size_kib: config.cache_size_kib,
        }))
        .build(manager)?;
    Ok(pool)
}

/// Open an in-memory pool with default settings (for tests).
pub fn new_in_memory() -> Result<ConnectionPool> {
    new_pool(&ConnectionConfig::default())
}

/// Open a file-backed pool at the given path with default settings.
pub fn new_file(path: &str) -> Result<ConnectionPool> {
    new_pool(&ConnectionConfig {
        db_path: path.to_string(),
        ..Default::default()
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
