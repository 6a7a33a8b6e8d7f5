//! SQLite backend: connection pool, migrations, row types, repositories.

pub mod connection;
pub mod migrations;
pub mod repositories;
pub mod row_types;

pub use connection::{
    new_file, new_in_memory, new_pool, ConnectionConfig, ConnectionPool, PooledConnection,
    MEMORY_PATH,
};
pub use migrations::run_migrations;
