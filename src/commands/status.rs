use anyhow::Result;

use crate::commands::CommandReport;
use crate::tracker::config::load_config;
use crate::tracker::paths::resolve_paths;
use crate::tracker::signal::{self, SignalKind};
use crate::tracker::state;
use crate::tracker::store;

/// Read-only snapshot: index stats, daemon state, pending signals. Takes
/// no lock; a slightly stale view is fine for reporting.
pub fn run() -> Result<CommandReport> {
    let mut report = CommandReport::new("status");
    let paths = resolve_paths()?;
    let cfg = load_config()?;

    report.detail(format!("index_file={}", paths.index_file.display()));
    report.detail(format!("index.exists={}", paths.index_file.exists()));

    match store::load_index(&paths.index_file) {
        Ok(ids) => report.detail(format!("index.size={}", ids.len())),
        Err(err) => report.issue(format!("index unreadable: {err:#}")),
    }
    if let Some(hash) = store::index_content_hash(&paths.index_file)? {
        report.detail(format!("index.sha256={hash}"));
    }

    let st = state::load(&paths)?;
    report.detail(format!(
        "daemon.heartbeat_epoch_secs={}",
        st.last_heartbeat_epoch_secs
    ));
    match st.last_rebuild_epoch_secs {
        Some(epoch) => report.detail(format!("daemon.last_rebuild_epoch_secs={epoch}")),
        None => report.detail("daemon.last_rebuild=never".to_string()),
    }
    if let Some(size) = st.last_rebuild_size {
        report.detail(format!("daemon.last_rebuild_size={size}"));
    }
    if let Some(degraded) = st.last_rebuild_degraded {
        report.detail(format!("daemon.last_rebuild_degraded={degraded}"));
    }
    if let Some(queue) = st.last_queue_size {
        report.detail(format!("daemon.last_queue_size={queue}"));
    }

    for kind in SignalKind::all() {
        report.detail(format!(
            "signals.{}.pending={}",
            kind.as_str(),
            signal::pending(&paths, kind)?
        ));
    }

    report.detail(format!(
        "evidence.sidecar_enabled={}",
        cfg.evidence.sidecar_enabled
    ));
    report.detail(format!(
        "evidence.fuzzy_enabled={}",
        cfg.evidence.fuzzy_enabled
    ));
    report.detail(format!(
        "evidence.authoritative_enabled={}",
        cfg.evidence.authoritative_enabled
    ));

    Ok(report)
}
