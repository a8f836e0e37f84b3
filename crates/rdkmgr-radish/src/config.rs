//! Runtime settings handed to each component at construction.

use std::path::PathBuf;
use std::time::Duration;

/// Location of the radish scripts and the service they target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadishConfig {
    /// Interpreter used to run the scripts (e.g. `bash`).
    pub shell: String,
    /// Playback / recording / station-list script (`radish-play.sh`).
    pub play_script: PathBuf,
    /// Schedule export command (`rx2`).
    pub schedule_command: PathBuf,
    /// Service name passed with `-t` and used to filter station lists.
    pub service: String,
}

impl Default for RadishConfig {
    fn default() -> Self {
        Self {
            shell: String::from("bash"),
            play_script: PathBuf::from("radish-play.sh"),
            schedule_command: PathBuf::from("rx2"),
            service: String::from("radiko"),
        }
    }
}

/// How a probe that ran for the whole timeout without a rejection is classified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// No rejection seen before the deadline counts as reachable.
    #[default]
    Reachable,
    /// Only a probe that exits on its own without rejection counts as reachable.
    Unreachable,
}

/// Probe and scan tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Maximum number of probes in flight.
    pub max_workers: usize,
    /// How long a single probe may run before it is terminated.
    pub timeout: Duration,
    /// Recording length requested from the script (`-d`), in seconds.
    pub record_secs: u32,
    /// Marker in the script's stderr that means the station refused us.
    pub rejection_marker: String,
    /// Classification of probes that hit the timeout.
    pub timeout_policy: TimeoutPolicy,
    /// Output directory for the throwaway trial recordings (`-o`).
    pub output_dir: PathBuf,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_workers: 3,
            timeout: Duration::from_secs(6),
            record_secs: 60,
            rejection_marker: String::from("403"),
            timeout_policy: TimeoutPolicy::Reachable,
            output_dir: std::env::temp_dir().join("rdkmgr-probe"),
        }
    }
}

/// Playback controller settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Name of the audio player process spawned by the play script.
    pub process_name: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            process_name: String::from("ffplay"),
        }
    }
}
