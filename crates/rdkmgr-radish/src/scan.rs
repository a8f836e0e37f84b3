//! Bounded parallel station scan.
//!
//! Keeps at most `max_in_flight` probes running and submits the next
//! station as soon as any probe finishes, so one slow station never stalls
//! the rest of the batch.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::probe::{ProbeOutcome, StationProbe};

/// Station identity carried through the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationRef {
    /// Station ID passed to the probe.
    pub station_id: String,
    /// Display name for progress output.
    pub name: String,
}

/// Progress event emitted after each probe completes.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Probes completed so far, including this one.
    pub completed: usize,
    /// Number of stations in the scan.
    pub total: usize,
    /// The station whose probe just completed.
    pub finished: StationRef,
    /// Its outcome.
    pub outcome: ProbeOutcome,
    /// The station submitted in its place, if any remained.
    pub submitted: Option<StationRef>,
}

/// Result of a scan.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Reachable station IDs in completion order.
    pub reachable: Vec<String>,
    /// Every station with its outcome, in completion order.
    pub outcomes: Vec<(StationRef, ProbeOutcome)>,
}

/// Probes `stations` with at most `max_in_flight` probes running at once.
///
/// A `max_in_flight` of zero is treated as one. Once `cancel` fires no new
/// probes are submitted; in-flight probes are expected to stop on their own
/// and stations never submitted are recorded as [`ProbeOutcome::Cancelled`].
/// Every station appears in [`ScanReport::outcomes`] exactly once; a probe
/// task that panics is recorded as [`ProbeOutcome::Failed`] and its slot is
/// refilled like any other completion.
pub async fn scan_stations<P, F>(
    probe: Arc<P>,
    stations: Vec<StationRef>,
    max_in_flight: usize,
    cancel: &CancellationToken,
    mut on_progress: F,
) -> ScanReport
where
    P: StationProbe + Send + Sync + 'static,
    F: FnMut(&ScanProgress),
{
    let total = stations.len();
    let limit = max_in_flight.max(1);
    let mut pending = stations.into_iter();
    let mut tasks: JoinSet<ProbeOutcome> = JoinSet::new();
    let mut in_flight: HashMap<Id, StationRef> = HashMap::new();
    let mut report = ScanReport::default();
    let mut completed: usize = 0;

    tracing::debug!(total, limit, "Starting station scan");

    for station in pending.by_ref().take(limit) {
        submit(&mut tasks, &mut in_flight, &probe, station, cancel);
    }

    while let Some(joined) = tasks.join_next_with_id().await {
        let (id, outcome) = match joined {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Probe task failed: {e}");
                let reason = if e.is_panic() {
                    "probe task panicked"
                } else {
                    "probe task aborted"
                };
                (e.id(), ProbeOutcome::Failed(String::from(reason)))
            }
        };
        let Some(finished) = in_flight.remove(&id) else {
            tracing::warn!(%id, "Completed probe task is not tracked");
            continue;
        };

        let submitted = if cancel.is_cancelled() {
            None
        } else {
            pending.next()
        };
        if let Some(station) = &submitted {
            submit(&mut tasks, &mut in_flight, &probe, station.clone(), cancel);
        }

        completed = completed.saturating_add(1);
        tracing::debug!(
            station_id = %finished.station_id,
            outcome = outcome.label(),
            completed,
            total,
            "Probe completed"
        );
        if outcome.is_reachable() {
            report.reachable.push(finished.station_id.clone());
        }
        on_progress(&ScanProgress {
            completed,
            total,
            finished: finished.clone(),
            outcome: outcome.clone(),
            submitted,
        });
        report.outcomes.push((finished, outcome));
    }

    for station in pending {
        report.outcomes.push((station, ProbeOutcome::Cancelled));
    }

    report
}

/// Spawns one probe onto the join set and tracks its task id.
fn submit<P>(
    tasks: &mut JoinSet<ProbeOutcome>,
    in_flight: &mut HashMap<Id, StationRef>,
    probe: &Arc<P>,
    station: StationRef,
    cancel: &CancellationToken,
) where
    P: StationProbe + Send + Sync + 'static,
{
    let probe = Arc::clone(probe);
    let cancel = cancel.clone();
    let station_id = station.station_id.clone();
    tracing::trace!(station_id = %station_id, "Submitting probe");
    let handle = tasks.spawn(async move { probe.probe(&station_id, cancel).await });
    in_flight.insert(handle.id(), station);
}
