//! Station catalog CRUD operations.

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

use crate::UpsertReport;

/// A broadcast station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    /// Station ID (e.g. `TBS`, `QRR`).
    pub station_id: String,
    /// Service the station belongs to (e.g. `radiko`).
    pub service: String,
    /// Display name.
    pub name: String,
}

/// Inserts or replaces stations keyed by `station_id`.
///
/// Each row is written independently: a failing row is logged and counted
/// in [`UpsertReport::failed`], the rest are still committed.
///
/// # Errors
///
/// Returns an error if the transaction cannot be started, the statement
/// cannot be prepared, or the commit fails.
#[allow(clippy::module_name_repetitions)]
pub fn upsert_stations(conn: &Connection, stations: &[Station]) -> Result<UpsertReport> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to begin transaction")?;

    let mut stmt = tx
        .prepare(
            "INSERT OR REPLACE INTO stations (station_id, service, name)
             VALUES (?1, ?2, ?3)",
        )
        .context("failed to prepare stations upsert")?;

    let mut report = UpsertReport::default();
    for s in stations {
        match stmt.execute(rusqlite::params![s.station_id, s.service, s.name]) {
            Ok(_) => report.upserted = report.upserted.saturating_add(1),
            Err(e) => {
                tracing::warn!(station_id = %s.station_id, "Failed to upsert station: {e}");
                report.failed = report.failed.saturating_add(1);
            }
        }
    }

    drop(stmt);
    tx.commit().context("failed to commit stations upsert")?;
    Ok(report)
}

/// Loads stations ordered by `station_id`, optionally restricted to one service.
///
/// # Errors
///
/// Returns an error if the database query fails.
#[allow(clippy::module_name_repetitions)]
pub fn load_stations(conn: &Connection, service: Option<&str>) -> Result<Vec<Station>> {
    let mut stmt = conn
        .prepare(
            "SELECT station_id, service, name
             FROM stations
             WHERE ?1 IS NULL OR service = ?1
             ORDER BY station_id",
        )
        .context("failed to prepare stations query")?;

    let rows = stmt
        .query_map([service], map_station_row)
        .context("failed to query stations")?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to read stations rows")
}

/// Loads a single station by ID.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn load_station(conn: &Connection, station_id: &str) -> Result<Option<Station>> {
    conn.query_row(
        "SELECT station_id, service, name FROM stations WHERE station_id = ?1",
        [station_id],
        map_station_row,
    )
    .optional()
    .with_context(|| format!("failed to query station {station_id}"))
}

/// Maps a database row to a `Station`.
fn map_station_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Station> {
    Ok(Station {
        station_id: row.get(0)?,
        service: row.get(1)?,
        name: row.get(2)?,
    })
}
