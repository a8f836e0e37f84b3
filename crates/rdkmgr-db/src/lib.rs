//! Catalog store for radiko stations and programs.
//!
//! Uses `rusqlite` (bundled `SQLite`) for the `stations` and `programs`
//! tables, plus a flat text file holding the enabled-station list.

mod connection;
/// Enabled-station list persistence.
pub mod enabled;
mod migrations;
/// Program catalog operations.
pub mod programs;
/// Station catalog operations.
pub mod stations;

pub use connection::{open_db, reset_db, resolve_data_dir};
pub use enabled::{load_enabled_stations, save_enabled_stations};
pub use programs::{
    Program, ProgramListing, load_airing, load_airing_for_station, load_programs,
    search_programs, upsert_programs,
};
pub use stations::{Station, load_station, load_stations, upsert_stations};

/// Outcome of a row-by-row upsert batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertReport {
    /// Rows written successfully.
    pub upserted: usize,
    /// Rows rejected by the database (logged and skipped).
    pub failed: usize,
}
