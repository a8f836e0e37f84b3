//! Program catalog CRUD operations and schedule queries.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use rusqlite::Connection;

use crate::UpsertReport;

/// Column list shared by every `programs` query (joined as `p`, stations as `s`).
const LISTING_COLUMNS: &str = "p.station_id, p.prog_id, p.date, p.weekday, p.start_time,
     p.duration, p.title, p.url, p.personality, p.info, s.name";

/// One scheduled broadcast slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    /// Station ID (soft reference to `stations.station_id`).
    pub station_id: String,
    /// Program ID, unique per station.
    pub prog_id: String,
    /// Broadcast date (`YYYYMMDD`).
    pub date: String,
    /// Weekday label as emitted by the schedule tool.
    pub weekday: String,
    /// Start time (`HHMM`, hours may exceed 23 for late-night slots).
    pub start_time: String,
    /// Duration in minutes.
    pub duration_min: u32,
    /// Program title.
    pub title: String,
    /// Program homepage (nullable).
    pub url: Option<String>,
    /// Personality / host names.
    pub personality: String,
    /// Free-form description.
    pub info: String,
}

impl Program {
    /// Returns the `[start, end)` air window in local wall-clock time.
    ///
    /// The start is `date` midnight plus the `HHMM` offset, so `2530` on
    /// `20240101` means 01:30 on 2024-01-02. Returns `None` when the date or
    /// start time is malformed.
    #[must_use]
    pub fn air_window(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let day = NaiveDate::parse_from_str(&self.date, "%Y%m%d").ok()?;
        let offset = parse_hhmm_minutes(&self.start_time)?;
        let start = day
            .and_time(NaiveTime::MIN)
            .checked_add_signed(TimeDelta::minutes(offset))?;
        let end = start.checked_add_signed(TimeDelta::minutes(i64::from(self.duration_min)))?;
        Some((start, end))
    }

    /// Whether the program is on air at `now` (inclusive start, exclusive end).
    #[must_use]
    pub fn is_airing_at(&self, now: NaiveDateTime) -> bool {
        self.air_window()
            .is_some_and(|(start, end)| start <= now && now < end)
    }

    /// Formats the start time as `HH:MM`.
    #[must_use]
    pub fn start_label(&self) -> String {
        match (self.start_time.get(..2), self.start_time.get(2..)) {
            (Some(hh), Some(mm)) if !mm.is_empty() => format!("{hh}:{mm}"),
            _ => self.start_time.clone(),
        }
    }

    /// Formats the date as `YYYY/MM/DD`.
    #[must_use]
    pub fn date_label(&self) -> String {
        NaiveDate::parse_from_str(&self.date, "%Y%m%d").map_or_else(
            |_| self.date.clone(),
            |d| d.format("%Y/%m/%d").to_string(),
        )
    }
}

/// A program joined with its station name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramListing {
    /// The program row.
    pub program: Program,
    /// Name of the owning station.
    pub station_name: String,
}

/// Parses `HHMM` into minutes past midnight. Hours are not capped at 23.
fn parse_hhmm_minutes(hhmm: &str) -> Option<i64> {
    if hhmm.len() != 4 || !hhmm.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i64 = hhmm.get(..2)?.parse().ok()?;
    let minutes: i64 = hhmm.get(2..)?.parse().ok()?;
    if minutes >= 60 {
        return None;
    }
    hours.checked_mul(60)?.checked_add(minutes)
}

/// Inserts or replaces programs keyed by `(station_id, prog_id)`.
///
/// Rows are independent: a failing row is logged and counted in
/// [`UpsertReport::failed`] while the remaining rows are still committed.
/// Re-importing the same batch leaves the table unchanged.
///
/// # Errors
///
/// Returns an error if the transaction cannot be started, the statement
/// cannot be prepared, or the commit fails.
#[allow(clippy::module_name_repetitions)]
pub fn upsert_programs(conn: &Connection, programs: &[Program]) -> Result<UpsertReport> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to begin transaction")?;

    let mut stmt = tx
        .prepare(
            "INSERT OR REPLACE INTO programs (
                station_id, prog_id, date, weekday, start_time,
                duration, title, url, personality, info
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .context("failed to prepare programs upsert")?;

    let mut report = UpsertReport::default();
    for p in programs {
        let result = stmt.execute(rusqlite::params![
            p.station_id,
            p.prog_id,
            p.date,
            p.weekday,
            p.start_time,
            p.duration_min,
            p.title,
            p.url,
            p.personality,
            p.info,
        ]);
        match result {
            Ok(_) => report.upserted = report.upserted.saturating_add(1),
            Err(e) => {
                tracing::warn!(
                    station_id = %p.station_id,
                    prog_id = %p.prog_id,
                    "Failed to upsert program: {e}"
                );
                report.failed = report.failed.saturating_add(1);
            }
        }
    }

    drop(stmt);
    tx.commit().context("failed to commit programs upsert")?;
    Ok(report)
}

/// Loads all programs ordered by date, start time and station.
///
/// # Errors
///
/// Returns an error if the database query fails.
#[allow(clippy::module_name_repetitions)]
pub fn load_programs(conn: &Connection) -> Result<Vec<Program>> {
    let mut stmt = conn
        .prepare(
            "SELECT station_id, prog_id, date, weekday, start_time,
                    duration, title, url, personality, info
             FROM programs
             ORDER BY date, start_time, station_id",
        )
        .context("failed to prepare programs query")?;

    let rows = stmt
        .query_map([], map_program_row)
        .context("failed to query programs")?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to read programs rows")
}

/// Searches title, personality and info for `keyword` (substring match).
///
/// `%` and `_` in the keyword are matched literally. Programs whose station
/// is not in the catalog are excluded.
///
/// # Errors
///
/// Returns an error if the database query fails.
#[allow(clippy::module_name_repetitions)]
pub fn search_programs(conn: &Connection, keyword: &str) -> Result<Vec<ProgramListing>> {
    let pattern = format!("%{}%", escape_like(keyword));
    let sql = format!(
        "SELECT {LISTING_COLUMNS}
         FROM programs p
         JOIN stations s ON p.station_id = s.station_id
         WHERE p.title LIKE ?1 ESCAPE '\\'
            OR p.personality LIKE ?1 ESCAPE '\\'
            OR p.info LIKE ?1 ESCAPE '\\'
         ORDER BY p.date, p.start_time, p.station_id"
    );

    let mut stmt = conn
        .prepare(&sql)
        .context("failed to prepare program search")?;

    let rows = stmt
        .query_map([pattern], map_listing_row)
        .context("failed to search programs")?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to read search rows")
}

/// Loads the programs on air at `now` for the given stations.
///
/// Candidates are taken from `now`'s date and the previous date (late-night
/// slots belong to the previous broadcast day), joined with `stations`, and
/// filtered by [`Program::is_airing_at`]. Station IDs with no catalog row
/// yield nothing.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn load_airing(
    conn: &Connection,
    station_ids: &[String],
    now: NaiveDateTime,
) -> Result<Vec<ProgramListing>> {
    if station_ids.is_empty() {
        return Ok(Vec::new());
    }

    let today = now.date();
    let yesterday = today.pred_opt().unwrap_or(today);

    let placeholders: Vec<String> = (0..station_ids.len())
        .map(|i| format!("?{}", i.saturating_add(3)))
        .collect();
    let sql = format!(
        "SELECT {LISTING_COLUMNS}
         FROM programs p
         JOIN stations s ON p.station_id = s.station_id
         WHERE p.date IN (?1, ?2) AND p.station_id IN ({})
         ORDER BY p.station_id, p.date, p.start_time",
        placeholders.join(", ")
    );

    let mut stmt = conn
        .prepare(&sql)
        .context("failed to prepare airing query")?;

    let params: Vec<String> = [
        today.format("%Y%m%d").to_string(),
        yesterday.format("%Y%m%d").to_string(),
    ]
    .into_iter()
    .chain(station_ids.iter().cloned())
    .collect();

    let rows = stmt
        .query_map(rusqlite::params_from_iter(params), map_listing_row)
        .context("failed to query airing programs")?;

    let listings = rows
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to read airing rows")?;

    Ok(listings
        .into_iter()
        .filter(|l| l.program.is_airing_at(now))
        .collect())
}

/// Loads the program on air at `now` for a single station.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn load_airing_for_station(
    conn: &Connection,
    station_id: &str,
    now: NaiveDateTime,
) -> Result<Option<ProgramListing>> {
    let mut airing = load_airing(conn, &[String::from(station_id)], now)?;
    if airing.is_empty() {
        return Ok(None);
    }
    Ok(Some(airing.swap_remove(0)))
}

/// Escapes `LIKE` wildcards using `\` as the escape character.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Maps a database row to a `Program`.
fn map_program_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Program> {
    Ok(Program {
        station_id: row.get(0)?,
        prog_id: row.get(1)?,
        date: row.get(2)?,
        weekday: row.get(3)?,
        start_time: row.get(4)?,
        duration_min: row.get(5)?,
        title: row.get(6)?,
        url: row.get(7)?,
        personality: row.get(8)?,
        info: row.get(9)?,
    })
}

/// Maps a joined row (`LISTING_COLUMNS`) to a `ProgramListing`.
fn map_listing_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProgramListing> {
    Ok(ProgramListing {
        program: map_program_row(row)?,
        station_name: row.get(10)?,
    })
}
