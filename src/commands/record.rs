use anyhow::Result;

use crate::commands::CommandReport;
use crate::error::TrackerErrorCode;
use crate::tracker::paths::resolve_paths;
use crate::tracker::store;
use crate::tracker::updater::{RecordOutcome, record_processed};

#[derive(Debug, Clone)]
pub struct RecordOptions {
    pub asin: String,
}

pub fn run(opts: &RecordOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("record");
    let paths = resolve_paths()?;

    report.detail(format!("index_file={}", paths.index_file.display()));
    report.detail(format!("asin={}", opts.asin.trim()));

    match record_processed(&paths, &opts.asin)? {
        RecordOutcome::Recorded => {
            report.detail("recorded=true");
        }
        RecordOutcome::AlreadyPresent => {
            report.detail("recorded=false reason=already-present");
        }
        RecordOutcome::Busy => {
            report.detail("recorded=false reason=lock-busy; retry on the next cycle");
            report.note_code(TrackerErrorCode::E301LockBusy);
            return Ok(report);
        }
        RecordOutcome::InvalidIdentifier => {
            report.issue(format!(
                "invalid identifier `{}`; expected ten uppercase alphanumerics",
                opts.asin.trim()
            ));
            return Ok(report);
        }
    }

    let size = store::load_index(&paths.index_file)?.len();
    report.detail(format!("index.size={size}"));
    Ok(report)
}
