use anyhow::{Context, Result};
use std::thread;
use std::time::Duration;

use crate::error::TrackerError;
use crate::tracker::audit;
use crate::tracker::config::load_config;
use crate::tracker::paths::resolve_paths;
use crate::tracker::queue::build_work_queue;
use crate::tracker::reconcile::{RebuildOutcome, rebuild};
use crate::tracker::signal::{self, SignalKind};
use crate::tracker::state::{load, save};
use crate::tracker::util::now_epoch_secs;

#[derive(Debug, Clone)]
pub struct WatchCycleOutcome {
    pub state_file: String,
    pub heartbeat_epoch_secs: u64,
    pub poll_interval_secs: u64,
    pub rebuild_requests: usize,
    pub library_changes: usize,
    pub converted_added: usize,
    pub rebuild: Option<RebuildOutcome>,
    pub queue_size: usize,
}

/// Whether this cycle should attempt a full rebuild. A drained
/// `rebuild-requested` marker forces one (subject to cooldown); otherwise
/// rebuilds fire on the configured interval.
fn rebuild_due(
    last_rebuild: Option<u64>,
    now: u64,
    interval_secs: u64,
    cooldown_secs: u64,
    forced: bool,
) -> bool {
    let Some(last) = last_rebuild else {
        return true;
    };
    let elapsed = now.saturating_sub(last);
    if elapsed < cooldown_secs {
        return false;
    }
    forced || elapsed >= interval_secs
}

/// One poll cycle of the periodic rebuilder: provision the runtime tree,
/// drain signals, rebuild when due, refresh the queue summary, persist
/// daemon state. Lock contention inside the rebuild is skip-and-retry, not
/// an error; regression and replace failures propagate loudly.
pub fn run_once() -> Result<WatchCycleOutcome> {
    let paths = resolve_paths()?;
    signal::ensure_runtime_dirs(&paths)
        .map_err(|err| TrackerError::RuntimeDirUnavailable(format!("{err:#}")))?;

    let cfg = load_config()?;
    let mut state = load(&paths)?;

    let rebuild_requests = signal::drain(&paths, SignalKind::RebuildRequested)?;
    let library_changes = signal::drain(&paths, SignalKind::LibraryChanged)?;
    let converted_added = signal::drain(&paths, SignalKind::ConvertedAdded)?;

    if rebuild_requests + library_changes + converted_added > 0 {
        audit::append_event(
            &paths,
            "signals",
            "ok",
            &format!(
                "rebuild_requested={rebuild_requests} library_changed={library_changes} converted_added={converted_added}"
            ),
        )?;
    }

    let now = now_epoch_secs()?;
    state.last_heartbeat_epoch_secs = now;

    let mut rebuild_out = None;
    if rebuild_due(
        state.last_rebuild_epoch_secs,
        now,
        cfg.watcher.rebuild_interval_secs,
        cfg.watcher.cooldown_secs,
        rebuild_requests > 0,
    ) {
        match rebuild(&paths, &cfg, false)? {
            RebuildOutcome::AlreadyRunning => {
                audit::append_event(&paths, "rebuild", "skipped", "reason=lock-busy")?;
                rebuild_out = Some(RebuildOutcome::AlreadyRunning);
            }
            RebuildOutcome::Completed(report) => {
                state.last_rebuild_epoch_secs = Some(now);
                state.last_rebuild_size = Some(report.new_size);
                state.last_rebuild_degraded = Some(report.degraded);
                rebuild_out = Some(RebuildOutcome::Completed(report));
            }
        }
    }

    let queue = build_work_queue(&paths, &cfg.evidence.noise_tokens)
        .context("failed to build work queue")?;
    state.last_queue_size = Some(queue.len());

    let file = save(&paths, &state)?;

    Ok(WatchCycleOutcome {
        state_file: file.display().to_string(),
        heartbeat_epoch_secs: state.last_heartbeat_epoch_secs,
        poll_interval_secs: cfg.watcher.poll_interval_secs,
        rebuild_requests,
        library_changes,
        converted_added,
        rebuild: rebuild_out,
        queue_size: queue.len(),
    })
}

pub fn run_daemon() -> Result<()> {
    loop {
        let cycle = run_once()?;
        let sleep_for = Duration::from_secs(cycle.poll_interval_secs);
        thread::sleep(sleep_for);
    }
}
