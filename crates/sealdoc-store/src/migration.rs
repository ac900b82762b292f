//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL batch
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::session::now_millis;

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current = current_version(conn)?;
    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema v{current} is newer than supported v{CURRENT_VERSION}"
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

/// Highest applied migration, 0 for a fresh database.
pub fn current_version(conn: &Connection) -> Result<u32> {
    Ok(conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?)
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: documents and their commit log.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per document
        CREATE TABLE documents (
            handle TEXT PRIMARY KEY,
            metadata TEXT NOT NULL,            -- JSON DocumentMetadata
            head_version INTEGER NOT NULL,     -- version of the latest commit
            created_at INTEGER NOT NULL        -- Unix ms
        );

        -- Every version of every document
        CREATE TABLE commits (
            handle TEXT NOT NULL REFERENCES documents(handle),
            version INTEGER NOT NULL,
            content TEXT NOT NULL,             -- JSON WireBundle, exactly as signed
            content_digest BLOB NOT NULL,      -- 32 bytes, Blake3 of content
            author TEXT NOT NULL,              -- controller id of the writer
            signature BLOB NOT NULL,           -- 64 bytes, Ed25519
            timestamp INTEGER NOT NULL,        -- Unix ms
            PRIMARY KEY (handle, version)
        );
        "#,
    )?;
    Ok(())
}
