use anyhow::Result;

use crate::commands::CommandReport;
use crate::error::TrackerErrorCode;
use crate::tracker::paths::resolve_paths;
use crate::tracker::signal::{self, SignalKind};

#[derive(Debug, Clone)]
pub struct SignalOptions {
    pub kind: String,
    pub drain: bool,
}

pub fn run(opts: &SignalOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("signal");
    let paths = resolve_paths()?;

    let kind = match opts.kind.parse::<SignalKind>() {
        Ok(kind) => kind,
        Err(err) => {
            report.issue(format!("{err}"));
            return Ok(report);
        }
    };

    report.detail(format!("signals_dir={}", paths.signals_dir().display()));
    report.detail(format!("kind={}", kind.as_str()));

    if opts.drain {
        let drained = signal::drain(&paths, kind)?;
        report.detail(format!("drained={drained}"));
        return Ok(report);
    }

    match signal::emit(&paths, kind) {
        Ok(path) => {
            report.detail(format!("emitted={}", path.display()));
        }
        Err(err) => {
            report.fail_with(
                TrackerErrorCode::E305RuntimeDirUnavailable,
                format!("failed to emit signal: {err:#}"),
            );
        }
    }

    Ok(report)
}
