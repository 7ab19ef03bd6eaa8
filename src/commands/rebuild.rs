use anyhow::Result;

use crate::commands::CommandReport;
use crate::error::{TrackerError, TrackerErrorCode};
use crate::tracker::config::load_config;
use crate::tracker::paths::resolve_paths;
use crate::tracker::reconcile::{RebuildOutcome, rebuild};
use crate::tracker::signal;

#[derive(Debug, Clone, Default)]
pub struct RebuildOptions {
    pub dry_run: bool,
}

pub fn run(opts: &RebuildOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("rebuild");
    let paths = resolve_paths()?;

    if let Err(err) = signal::ensure_runtime_dirs(&paths) {
        report.fail_with(
            TrackerErrorCode::E305RuntimeDirUnavailable,
            format!("runtime dir provisioning failed: {err:#}"),
        );
        return Ok(report);
    }

    let cfg = load_config()?;
    report.detail(format!("index_file={}", paths.index_file.display()));
    report.detail(format!("dry_run={}", opts.dry_run));

    match rebuild(&paths, &cfg, opts.dry_run) {
        Ok(RebuildOutcome::AlreadyRunning) => {
            report.detail("rebuild already in progress; skipping");
            report.note_code(TrackerErrorCode::E301LockBusy);
        }
        Ok(RebuildOutcome::Completed(out)) => {
            report.detail(format!("index.prior_size={}", out.prior_size));
            report.detail(format!("index.new_size={}", out.new_size));
            if let Some(hash) = &out.index_hash {
                report.detail(format!("index.sha256={hash}"));
            }
            for c in &out.contributions {
                report.detail(format!(
                    "source.{}.found={} added={} available={}",
                    c.source, c.found, c.added, c.available
                ));
            }
            if out.degraded {
                report.detail("one or more evidence sources were unavailable");
                report.note_code(TrackerErrorCode::E302EvidenceDegraded);
            }
        }
        Err(err) => match err.downcast_ref::<TrackerError>() {
            Some(TrackerError::Regression { prior, merged }) => {
                report.fail_with(
                    TrackerErrorCode::E304Regression,
                    format!(
                        "rebuild would shrink the index ({prior} -> {merged}); prior index kept"
                    ),
                );
            }
            Some(TrackerError::ReplaceFailed(detail)) => {
                report.fail_with(
                    TrackerErrorCode::E303ReplaceFailed,
                    format!("atomic index replace failed: {detail}"),
                );
            }
            _ => return Err(err),
        },
    }

    Ok(report)
}
