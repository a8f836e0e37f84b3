//! TUI module for interactive terminal interfaces.
//!
//! Uses `ratatui` + `crossterm` for rendering.

mod selector;
/// Station selector state types.
pub mod state;
mod ui;

pub use selector::run_station_selector;
