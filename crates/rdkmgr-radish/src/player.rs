//! Playback start/stop and now-playing inspection.
//!
//! Playback is fire-and-forget: the play script is launched detached in its
//! own process group and outlives this process. Stopping and "what is
//! playing" work from the OS process table.

use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use sysinfo::{ProcessRefreshKind, RefreshKind, Signal, System, UpdateKind};

use crate::config::{PlayerConfig, RadishConfig};

/// Play script file name matched when none is configured.
const DEFAULT_SCRIPT_NAME: &str = "radish-play.sh";

/// How a running playback shows up in a process's argument list.
///
/// The flags are versioned so a change in the play script's interface is a
/// new constructor rather than an edit scattered across call sites. The
/// script name follows the configured play script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContract {
    /// File name of the play script.
    pub script_name: String,
    /// Flag introducing the mode.
    pub mode_flag: &'static str,
    /// Mode value that means live playback.
    pub play_mode: &'static str,
    /// Flag introducing the station ID.
    pub station_flag: &'static str,
}

impl InvocationContract {
    /// `<script> -t <service> -s <station> -m play`, matching `script_name`.
    #[must_use]
    pub fn v1(script_name: impl Into<String>) -> Self {
        Self {
            script_name: script_name.into(),
            mode_flag: "-m",
            play_mode: "play",
            station_flag: "-s",
        }
    }

    /// V1 contract for the play script at `script`, matched by file name.
    #[must_use]
    pub fn for_script(script: &Path) -> Self {
        let name = script.file_name().map_or_else(
            || String::from(DEFAULT_SCRIPT_NAME),
            |n| n.to_string_lossy().into_owned(),
        );
        Self::v1(name)
    }

    /// Extracts the station ID from one process's arguments.
    ///
    /// Returns `None` unless the arguments name the play script and carry
    /// the play mode.
    #[must_use]
    pub fn station_from_args<S: AsRef<str>>(&self, args: &[S]) -> Option<String> {
        let has_script = args.iter().any(|a| {
            Path::new(a.as_ref()).file_name() == Some(OsStr::new(&self.script_name))
        });
        if !has_script {
            return None;
        }

        let is_play = args
            .windows(2)
            .any(|w| matches!(w, [flag, mode] if flag.as_ref() == self.mode_flag && mode.as_ref() == self.play_mode));
        if !is_play {
            return None;
        }

        args.windows(2).find_map(|w| match w {
            [flag, station] if flag.as_ref() == self.station_flag => {
                Some(station.as_ref().to_owned())
            }
            _ => None,
        })
    }
}

impl Default for InvocationContract {
    fn default() -> Self {
        Self::v1(DEFAULT_SCRIPT_NAME)
    }
}

/// Launches live playback of `station_id` and returns immediately.
///
/// The script runs in its own process group with stdio detached, so it
/// keeps playing after this process exits.
///
/// # Errors
///
/// Returns an error if the play script cannot be spawned.
pub fn start_playback(radish: &RadishConfig, station_id: &str) -> Result<u32> {
    let mut cmd = Command::new(&radish.shell);
    cmd.arg(&radish.play_script)
        .args(["-t", &radish.service, "-s", station_id, "-m", "play"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let child = cmd
        .spawn()
        .with_context(|| format!("failed to launch {}", radish.play_script.display()))?;
    let pid = child.id();
    tracing::debug!(station_id, pid, "Playback launched");
    Ok(pid)
}

/// Terminates every process named `player.process_name`.
///
/// Returns the number of processes signalled; zero when nothing was playing.
#[must_use]
pub fn stop_playback(player: &PlayerConfig) -> usize {
    let system = System::new_with_specifics(
        RefreshKind::nothing().with_processes(ProcessRefreshKind::nothing()),
    );

    let mut stopped: usize = 0;
    for process in system.processes_by_exact_name(OsStr::new(&player.process_name)) {
        match process.kill_with(Signal::Term) {
            Some(true) => {
                tracing::debug!(pid = %process.pid(), "Sent SIGTERM to player");
                stopped = stopped.saturating_add(1);
            }
            Some(false) => {
                tracing::warn!(pid = %process.pid(), "Failed to signal player process");
            }
            None => {
                tracing::warn!("SIGTERM is not supported on this platform");
            }
        }
    }
    stopped
}

/// Finds the station currently being played, if any.
///
/// Scans the process table for a play-script invocation matching
/// `contract`. When several are running the one with the lowest PID wins.
#[must_use]
pub fn find_playing_station(contract: &InvocationContract) -> Option<String> {
    let system = System::new_with_specifics(RefreshKind::nothing().with_processes(
        ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
    ));

    let mut matches: Vec<(sysinfo::Pid, String)> = system
        .processes()
        .iter()
        .filter_map(|(pid, process)| {
            let args: Vec<String> = process
                .cmd()
                .iter()
                .map(|a| a.to_string_lossy().into_owned())
                .collect();
            contract.station_from_args(&args).map(|id| (*pid, id))
        })
        .collect();
    matches.sort_by_key(|(pid, _)| *pid);
    matches.into_iter().next().map(|(_, id)| id)
}
