//! Schema version management using `PRAGMA user_version`.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Current schema version.
const CURRENT_VERSION: u32 = 1;

/// Runs database migrations up to `CURRENT_VERSION`.
///
/// # Errors
///
/// Returns an error if any SQL statement fails.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let version: u32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version")?;

    if version < 1 {
        migrate_v1(conn).context("migration to v1 failed")?;
    }

    conn.pragma_update(None, "user_version", CURRENT_VERSION)
        .context("failed to update user_version")?;

    Ok(())
}

/// Drops every catalog table and rewinds `user_version` to 0.
///
/// # Errors
///
/// Returns an error if any SQL statement fails.
pub fn drop_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS programs;
         DROP TABLE IF EXISTS stations;",
    )
    .context("failed to drop tables")?;

    conn.pragma_update(None, "user_version", 0u32)
        .context("failed to reset user_version")?;

    Ok(())
}

/// Migration to v1: create `stations` and `programs` tables.
///
/// `programs.station_id` is a soft reference: no foreign key, rows without a
/// matching station are dropped by the joins at query time.
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS stations (
            station_id  TEXT PRIMARY KEY,
            service     TEXT NOT NULL,
            name        TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS programs (
            station_id   TEXT NOT NULL,
            prog_id      TEXT NOT NULL,
            date         TEXT NOT NULL,
            weekday      TEXT NOT NULL DEFAULT '',
            start_time   TEXT NOT NULL,
            duration     INTEGER NOT NULL,
            title        TEXT NOT NULL DEFAULT '',
            url          TEXT,
            personality  TEXT NOT NULL DEFAULT '',
            info         TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (station_id, prog_id)
        );

        CREATE INDEX IF NOT EXISTS idx_programs_date ON programs(date);
        CREATE INDEX IF NOT EXISTS idx_programs_station_id ON programs(station_id);
        CREATE INDEX IF NOT EXISTS idx_stations_service ON stations(service);",
    )
    .context("failed to create stations/programs tables")?;

    Ok(())
}
