//! `AppConfig` struct and TOML read/write.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use rdkmgr_radish::{PlayerConfig, ProbeConfig, RadishConfig, TimeoutPolicy};
use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// External toolchain locations.
    #[serde(default)]
    pub radish: RadishSection,
    /// Reachability probe tuning.
    #[serde(default)]
    pub probe: ProbeSection,
    /// Playback settings.
    #[serde(default)]
    pub player: PlayerSection,
}

/// `[radish]` section.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RadishSection {
    /// Interpreter the scripts are run with.
    pub shell: String,
    /// Playback / recording / station-list script.
    pub play_script: PathBuf,
    /// Schedule export command.
    pub schedule_command: PathBuf,
    /// Service name (`-t`).
    pub service: String,
}

impl Default for RadishSection {
    fn default() -> Self {
        let defaults = RadishConfig::default();
        Self {
            shell: defaults.shell,
            play_script: defaults.play_script,
            schedule_command: defaults.schedule_command,
            service: defaults.service,
        }
    }
}

/// Timeout classification as written in the config file.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutPolicySetting {
    /// A probe that hits the timeout counts as reachable.
    #[default]
    Reachable,
    /// A probe that hits the timeout counts as unreachable.
    Unreachable,
}

/// `[probe]` section.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProbeSection {
    /// Maximum concurrent probes.
    pub max_workers: usize,
    /// Per-probe timeout in seconds.
    pub timeout_secs: u64,
    /// Trial recording length in seconds.
    pub record_secs: u32,
    /// Rejection marker searched in the script's stderr.
    pub rejection_marker: String,
    /// Classification of probes that hit the timeout.
    pub timeout_policy: TimeoutPolicySetting,
    /// Where trial recordings are written (defaults to a temp directory).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl Default for ProbeSection {
    fn default() -> Self {
        let defaults = ProbeConfig::default();
        Self {
            max_workers: defaults.max_workers,
            timeout_secs: defaults.timeout.as_secs(),
            record_secs: defaults.record_secs,
            rejection_marker: defaults.rejection_marker,
            timeout_policy: TimeoutPolicySetting::Reachable,
            output_dir: None,
        }
    }
}

/// `[player]` section.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlayerSection {
    /// Name of the audio player process.
    pub process_name: String,
}

impl Default for PlayerSection {
    fn default() -> Self {
        Self {
            process_name: PlayerConfig::default().process_name,
        }
    }
}

impl AppConfig {
    /// Loads config from a TOML file. Returns default if file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if a value is out of range.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Checks values that parse but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns an error if `probe.timeout_secs` or `probe.max_workers` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.probe.timeout_secs == 0 {
            bail!("probe.timeout_secs must be at least 1");
        }
        if self.probe.max_workers == 0 {
            bail!("probe.max_workers must be at least 1");
        }
        Ok(())
    }

    /// Builds the toolchain settings.
    #[must_use]
    pub fn radish_config(&self) -> RadishConfig {
        RadishConfig {
            shell: self.radish.shell.clone(),
            play_script: self.radish.play_script.clone(),
            schedule_command: self.radish.schedule_command.clone(),
            service: self.radish.service.clone(),
        }
    }

    /// Builds the probe settings.
    #[must_use]
    pub fn probe_config(&self) -> ProbeConfig {
        let defaults = ProbeConfig::default();
        ProbeConfig {
            max_workers: self.probe.max_workers,
            timeout: Duration::from_secs(self.probe.timeout_secs),
            record_secs: self.probe.record_secs,
            rejection_marker: self.probe.rejection_marker.clone(),
            timeout_policy: match self.probe.timeout_policy {
                TimeoutPolicySetting::Reachable => TimeoutPolicy::Reachable,
                TimeoutPolicySetting::Unreachable => TimeoutPolicy::Unreachable,
            },
            output_dir: self
                .probe
                .output_dir
                .clone()
                .unwrap_or(defaults.output_dir),
        }
    }

    /// Builds the playback settings.
    #[must_use]
    pub fn player_config(&self) -> PlayerConfig {
        PlayerConfig {
            process_name: self.player.process_name.clone(),
        }
    }
}
