//! Station reachability probe.
//!
//! A probe starts a short trial recording for one station and watches the
//! script's stderr for the rejection marker (an HTTP 403 from the stream
//! server when the station is outside the current area).

#![allow(clippy::future_not_send)]

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::config::{ProbeConfig, RadishConfig, TimeoutPolicy};

/// Grace period for draining stderr after the probe process exits.
const STDERR_DRAIN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(1);

/// Classified result of one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The script exited before the deadline without the rejection marker.
    Exited,
    /// The deadline passed without a rejection; the process was terminated.
    TimedOut(TimeoutPolicy),
    /// The script reported the rejection marker.
    Rejected,
    /// The probe was cancelled from outside; the process was terminated.
    Cancelled,
    /// The probe could not be run at all.
    Failed(String),
}

impl ProbeOutcome {
    /// Whether this outcome counts as a receivable station.
    #[must_use]
    pub const fn is_reachable(&self) -> bool {
        matches!(self, Self::Exited | Self::TimedOut(TimeoutPolicy::Reachable))
    }

    /// Short label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Exited => "exited",
            Self::TimedOut(_) => "timed-out",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Failed(_) => "failed",
        }
    }
}

/// Station probe trait.
///
/// Abstracts the external probe so the scan can be driven by mocks in tests.
/// Uses `trait_variant::make` to generate a `Send`-bound async trait; the
/// scan spawns probes onto the runtime and therefore needs [`StationProbe`].
#[allow(clippy::module_name_repetitions)]
#[trait_variant::make(StationProbe: Send)]
pub trait LocalStationProbe {
    /// Probes one station. Never fails: every problem is folded into the outcome.
    ///
    /// Implementations must stop any external work once `cancel` fires.
    async fn probe(&self, station_id: &str, cancel: CancellationToken) -> ProbeOutcome;
}

/// Probe backed by `radish-play.sh -m record`.
#[derive(Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct RadishProbe {
    /// Script locations and service.
    radish: RadishConfig,
    /// Timeout, marker and recording settings.
    settings: ProbeConfig,
}

impl RadishProbe {
    /// Creates a probe from the toolchain and probe settings.
    #[must_use]
    pub const fn new(radish: RadishConfig, settings: ProbeConfig) -> Self {
        Self { radish, settings }
    }

    /// Builds the trial-recording command for `station_id`.
    fn command(&self, station_id: &str) -> Command {
        let mut cmd = Command::new(&self.radish.shell);
        cmd.arg(&self.radish.play_script)
            .args(["-t", &self.radish.service, "-s", station_id, "-m", "record"])
            .arg("-d")
            .arg(self.settings.record_secs.to_string())
            .arg("-o")
            .arg(&self.settings.output_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group so the recorder spawned by the script is
        // terminated together with it.
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }

    /// Runs the probe; errors are launch/communication failures only.
    async fn run(&self, station_id: &str, cancel: &CancellationToken) -> Result<ProbeOutcome> {
        std::fs::create_dir_all(&self.settings.output_dir).with_context(|| {
            format!(
                "failed to create probe output directory {}",
                self.settings.output_dir.display()
            )
        })?;

        let mut child = self
            .command(station_id)
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.radish.play_script.display()))?;
        let pid = child.id();

        let mut stderr = child.stderr.take().context("probe stderr was not captured")?;
        let collector = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            buf
        });

        tokio::select! {
            status = child.wait() => {
                let status = status.context("failed to wait for probe process")?;
                // The leader is reaped, so its pgid may be reused; a straggler
                // holding stderr open only costs the drain timeout.
                let stderr = tokio::time::timeout(STDERR_DRAIN_TIMEOUT, collector)
                    .await
                    .ok()
                    .and_then(std::result::Result::ok)
                    .unwrap_or_default();
                tracing::debug!(station_id, %status, stderr_bytes = stderr.len(), "Probe process exited");
                Ok(classify_exit(&stderr, self.settings.rejection_marker.as_bytes()))
            }
            () = tokio::time::sleep(self.settings.timeout) => {
                stop_child(&mut child, pid).await;
                collector.abort();
                Ok(ProbeOutcome::TimedOut(self.settings.timeout_policy))
            }
            () = cancel.cancelled() => {
                stop_child(&mut child, pid).await;
                collector.abort();
                Ok(ProbeOutcome::Cancelled)
            }
        }
    }
}

impl StationProbe for RadishProbe {
    async fn probe(&self, station_id: &str, cancel: CancellationToken) -> ProbeOutcome {
        match self.run(station_id, &cancel).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(station_id, "Probe failed: {e:#}");
                ProbeOutcome::Failed(format!("{e:#}"))
            }
        }
    }
}

/// Classifies a process that exited on its own.
fn classify_exit(stderr: &[u8], marker: &[u8]) -> ProbeOutcome {
    if !marker.is_empty() && stderr.windows(marker.len()).any(|w| w == marker) {
        ProbeOutcome::Rejected
    } else {
        ProbeOutcome::Exited
    }
}

/// Terminates the probe's process group and reaps the child.
async fn stop_child(child: &mut Child, pid: Option<u32>) {
    terminate_group(pid);
    if let Err(e) = child.wait().await {
        tracing::debug!("Failed to reap probe process: {e}");
    }
}

/// Sends `SIGTERM` to the process group led by `pid`.
#[cfg(unix)]
fn terminate_group(pid: Option<u32>) {
    let Some(pgid) = pid
        .and_then(|p| libc::pid_t::try_from(p).ok())
        .and_then(libc::pid_t::checked_neg)
    else {
        return;
    };
    // SAFETY: kill(2) only delivers a signal to the given process group; it
    // reads and writes no memory owned by this process.
    let rc = unsafe { libc::kill(pgid, libc::SIGTERM) };
    if rc != 0 {
        tracing::trace!(pgid, "Process group already gone");
    }
}

/// Process groups are not available; `kill_on_drop` covers the direct child.
#[cfg(not(unix))]
const fn terminate_group(_pid: Option<u32>) {}
