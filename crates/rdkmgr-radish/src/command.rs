//! Runs a radish script and captures its standard output.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use tokio::process::Command;
use tracing::instrument;

/// Runs `{shell} {script} {args..}` and returns its stdout as text.
///
/// # Errors
///
/// Returns an error if the process cannot be spawned, exits with a
/// non-zero status (stderr is included in the message), or prints
/// non-UTF-8 output.
#[instrument(skip_all, fields(script = %script.display()))]
pub async fn run_capture(shell: &str, script: &Path, args: &[&str]) -> Result<String> {
    tracing::debug!(?args, "Running external command");

    let output = Command::new(shell)
        .arg(script)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .with_context(|| format!("failed to run {shell} {}", script.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "{} exited with {}: {}",
            script.display(),
            output.status,
            stderr.trim()
        );
    }

    String::from_utf8(output.stdout)
        .with_context(|| format!("{} printed non-UTF-8 output", script.display()))
}
