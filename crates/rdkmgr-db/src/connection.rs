//! Database connection management.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::instrument;

use super::migrations::{drop_tables, run_migrations};

/// Database file name inside the data directory.
const DB_FILE_NAME: &str = "rdkmgr.db";

/// Resolves the data directory holding the database and the enabled list.
///
/// - If `dir` is `Some`, returns it unchanged.
/// - Otherwise returns `~/.local/share/rdkmgr`.
///
/// # Errors
///
/// Returns an error if `HOME` is not set (when `dir` is `None`).
pub fn resolve_data_dir(dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(d) = dir {
        return Ok(d.to_path_buf());
    }

    let home = std::env::var("HOME").context("HOME environment variable is not set")?;
    Ok(PathBuf::from(home)
        .join(".local")
        .join("share")
        .join("rdkmgr"))
}

/// Opens (or creates) the database and runs migrations.
///
/// - If `dir` is `Some`, uses `{dir}/rdkmgr.db`.
/// - Otherwise uses `~/.local/share/rdkmgr/rdkmgr.db`.
///
/// Missing tables are created on open, so every command can assume the
/// schema exists.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or migrations fail.
pub fn open_db(dir: Option<&Path>) -> Result<Connection> {
    let db_path = resolve_data_dir(dir)?.join(DB_FILE_NAME);

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;

    run_migrations(&conn).context("database migration failed")?;

    tracing::debug!(path = %db_path.display(), "Database opened");
    Ok(conn)
}

/// Drops the `stations` and `programs` tables and recreates them empty.
///
/// # Errors
///
/// Returns an error if any SQL statement fails.
#[instrument(skip_all)]
pub fn reset_db(conn: &Connection) -> Result<()> {
    drop_tables(conn).context("failed to drop tables")?;
    run_migrations(conn).context("failed to recreate tables")?;
    tracing::info!("Database reset: stations and programs recreated");
    Ok(())
}
