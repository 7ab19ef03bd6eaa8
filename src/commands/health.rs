use anyhow::Result;
use std::env;

use crate::commands::CommandReport;
use crate::error::TrackerErrorCode;
use crate::library::api;
use crate::tracker::config::load_config;
use crate::tracker::lock::{self, INDEX_LOCK};
use crate::tracker::paths::resolve_paths;
use crate::tracker::signal;
use crate::tracker::util::pid_alive;

include!(concat!(env!("OUT_DIR"), "/abtrack_env_allowlist.rs"));

/// Startup/operator health check. Actively provisions the runtime tree:
/// a host that cleared /tmp must fail fast here, not at first signal.
pub fn run() -> Result<CommandReport> {
    let mut report = CommandReport::new("health");
    let paths = resolve_paths()?;
    let cfg = load_config()?;

    report.detail(format!("build.uuid={}", env!("BUILD_UUID")));
    report.detail(format!(
        "audiobooks_home={}",
        paths.audiobooks_home.display()
    ));

    for (name, path) in [
        ("source_dir", &paths.source_dir),
        ("library_dir", &paths.library_dir),
        ("state_dir", &paths.state_dir),
        ("logs_dir", &paths.logs_dir),
        ("catalog_file", &paths.catalog_file),
        ("index_file", &paths.index_file),
    ] {
        if path.exists() {
            report.detail(format!("path.{name}=ok"));
        } else {
            report.detail(format!("path.{name}=missing ({})", path.display()));
        }
    }

    match signal::ensure_runtime_dirs(&paths) {
        Ok(()) => report.detail(format!(
            "runtime_dir=provisioned ({})",
            paths.runtime_dir.display()
        )),
        Err(err) => {
            report.fail_with(
                TrackerErrorCode::E305RuntimeDirUnavailable,
                format!("runtime dir provisioning failed: {err:#}"),
            );
            return Ok(report);
        }
    }

    // Probe the mutation lock without holding it: an immediate acquire and
    // release tells us whether another process is mid-mutation.
    match lock::try_acquire(&paths, INDEX_LOCK)? {
        Some(guard) => {
            report.detail(format!("lock.index=free ({})", guard.path().display()));
        }
        None => {
            let holder = lock::holder_pid(&paths, INDEX_LOCK)?;
            match holder {
                Some(pid) if pid_alive(pid) => {
                    report.detail(format!("lock.index=held pid={pid}"));
                }
                Some(pid) => {
                    report.issue(format!("lock.index=held by dead pid {pid} (stale holder)"));
                }
                None => report.detail("lock.index=held pid=unknown".to_string()),
            }
        }
    }

    if cfg.evidence.authoritative_enabled {
        let reachable =
            api::backend_available(&cfg.library.api_base_url, cfg.library.api_timeout_secs);
        report.detail(format!(
            "library_api.url={} reachable={}",
            cfg.library.api_base_url, reachable
        ));
    } else {
        report.detail("library_api=disabled".to_string());
    }

    match which::which(&cfg.library.converter_bin) {
        Ok(path) => report.detail(format!("converter_bin={}", path.display())),
        Err(_) => report.detail(format!(
            "converter_bin={} not found on PATH (informational)",
            cfg.library.converter_bin
        )),
    }

    for key in GENERATED_ABTRACK_ENV_ALLOWLIST {
        if env::var_os(key).is_some() {
            report.detail(format!("env.{key}=set"));
        }
    }

    Ok(report)
}
