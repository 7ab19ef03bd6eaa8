use anyhow::Result;

use crate::commands::CommandReport;
use crate::tracker::reconcile::RebuildOutcome;
use crate::tracker::watcher;

#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    pub once: bool,
    pub daemon: bool,
}

pub fn run(opts: &WatchOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("watch");

    if opts.once && opts.daemon {
        report.issue("invalid flags: use only one of --once or --daemon");
        return Ok(report);
    }

    if opts.daemon {
        report.detail("starting tracker watcher in daemon mode");
        watcher::run_daemon()?;
        return Ok(report);
    }

    let cycle = watcher::run_once()?;
    report.detail("tracker watcher cycle completed");
    report.detail(format!("state_file={}", cycle.state_file));
    report.detail(format!(
        "heartbeat_epoch_secs={}",
        cycle.heartbeat_epoch_secs
    ));
    report.detail(format!("poll_interval_secs={}", cycle.poll_interval_secs));
    report.detail(format!(
        "signals.rebuild_requested={}",
        cycle.rebuild_requests
    ));
    report.detail(format!("signals.library_changed={}", cycle.library_changes));
    report.detail(format!("signals.converted_added={}", cycle.converted_added));
    report.detail(format!("queue.size={}", cycle.queue_size));

    match cycle.rebuild {
        Some(RebuildOutcome::AlreadyRunning) => {
            report.detail("rebuild=skipped reason=lock-busy");
        }
        Some(RebuildOutcome::Completed(out)) => {
            report.detail(format!(
                "rebuild=completed prior={} new={} degraded={}",
                out.prior_size, out.new_size, out.degraded
            ));
            for c in &out.contributions {
                report.detail(format!(
                    "rebuild.source.{}.found={} added={} available={}",
                    c.source, c.found, c.added, c.available
                ));
            }
        }
        None => {
            report.detail("rebuild=not-due");
        }
    }

    Ok(report)
}
