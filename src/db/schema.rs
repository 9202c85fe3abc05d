//! Database schema definitions

use rusqlite::Connection;
use tracing::info;

use crate::error::MintError;

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<(), MintError> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating new binding schema v{}", SCHEMA_VERSION);
        conn.execute_batch(BINDINGS_SCHEMA)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!(
            "Migrating binding schema from v{} to v{}",
            current_version, SCHEMA_VERSION
        );
        migrate_schema(conn, current_version)?;
    }

    Ok(())
}

/// Get current schema version (0 if not initialized)
fn get_schema_version(conn: &Connection) -> Result<i32, MintError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

/// Set schema version
fn set_schema_version(conn: &Connection, version: i32) -> Result<(), MintError> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?)",
        [version],
    )?;
    Ok(())
}

/// Migrate schema from older version
fn migrate_schema(conn: &Connection, from_version: i32) -> Result<(), MintError> {
    match from_version {
        // Migration steps go here as the schema evolves
        _ => {}
    }

    set_schema_version(conn, SCHEMA_VERSION)?;
    Ok(())
}

/// Handle binding table schema
///
/// A row is inserted first to allocate its sequence id, then updated with
/// the composed local part; `local_part` stays NULL only inside that
/// transaction. The UNIQUE constraint backstops duplicate composition.
const BINDINGS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS handle_bindings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    local_part TEXT UNIQUE,
    target_uri TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_bindings_target ON handle_bindings(target_uri);
"#;
