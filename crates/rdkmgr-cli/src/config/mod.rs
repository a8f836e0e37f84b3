//! Application configuration module.
//!
//! Manages the TOML config file that locates the radish toolchain and tunes
//! probing and playback.

#[allow(clippy::module_inception)]
mod config;
mod paths;

#[allow(clippy::module_name_repetitions)]
pub use config::AppConfig;
pub use paths::{resolve_config_path, resolve_enabled_path};
