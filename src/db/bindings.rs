//! Handle binding row operations

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::MintError;

/// Look up the local part already bound to a target URI.
pub fn find_by_target(conn: &Connection, target: &str) -> Result<Option<String>, MintError> {
    let local_part = conn
        .query_row(
            "SELECT local_part FROM handle_bindings
             WHERE target_uri = ?1 AND local_part IS NOT NULL
             ORDER BY id LIMIT 1",
            params![target],
            |row| row.get(0),
        )
        .optional()?;
    Ok(local_part)
}

/// Insert a fresh sequence row for a target URI and return its id. The row
/// carries no local part yet; [`bind`] completes it within the same
/// transaction.
pub fn allocate(conn: &Connection, target: &str) -> Result<i64, MintError> {
    conn.query_row(
        "INSERT INTO handle_bindings (target_uri) VALUES (?1) RETURNING id",
        params![target],
        |row| row.get(0),
    )
    .map_err(MintError::Allocation)
}

/// Write the composed local part into an allocated row.
pub fn bind(conn: &Connection, id: i64, local_part: &str) -> Result<(), MintError> {
    let affected = conn.execute(
        "UPDATE handle_bindings SET local_part = ?1 WHERE id = ?2",
        params![local_part, id],
    )?;
    if affected == 0 {
        return Err(MintError::Internal(format!(
            "allocated binding row {id} vanished before bind"
        )));
    }
    Ok(())
}

/// Point an existing local part at a new target URI, returning the number of
/// rows affected. Zero means the local part is unknown; the caller must not
/// treat that as success.
pub fn repoint(conn: &Connection, local_part: &str, target: &str) -> Result<usize, MintError> {
    let affected = conn.execute(
        "UPDATE handle_bindings SET target_uri = ?1 WHERE local_part = ?2",
        params![target, local_part],
    )?;
    Ok(affected)
}

/// Number of fully bound rows.
pub fn count(conn: &Connection) -> Result<i64, MintError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM handle_bindings WHERE local_part IS NOT NULL",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
