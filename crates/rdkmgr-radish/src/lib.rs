//! Wrappers around the external radish toolchain.
//!
//! Everything that talks to an external process lives here: the station
//! list and schedule export commands (with their output parsers), station
//! reachability probing, the bounded parallel scan, and playback control.

mod command;
mod config;
/// Playback start/stop and now-playing inspection.
pub mod player;
/// Station reachability probe.
pub mod probe;
/// Bounded parallel station scan.
pub mod scan;
/// Schedule export command and TSV parser.
pub mod schedule;
/// Station list command and parser.
pub mod station_list;

pub use command::run_capture;
#[allow(clippy::module_name_repetitions)]
pub use config::{PlayerConfig, ProbeConfig, RadishConfig, TimeoutPolicy};
pub use player::{InvocationContract, find_playing_station, start_playback, stop_playback};
pub use probe::{LocalStationProbe, ProbeOutcome, RadishProbe, StationProbe};
pub use scan::{ScanProgress, ScanReport, StationRef, scan_stations};
pub use schedule::{ProgramRow, ProgramTable, fetch_program_table, parse_program_table};
pub use station_list::{StationList, StationRow, fetch_station_list, parse_station_list};
