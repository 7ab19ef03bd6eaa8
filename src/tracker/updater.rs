use anyhow::Result;

use crate::tracker::audit;
use crate::tracker::catalog::is_valid_asin;
use crate::tracker::lock::{self, INDEX_LOCK};
use crate::tracker::paths::TrackerPaths;
use crate::tracker::store;

/// Result of one incremental append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    AlreadyPresent,
    Busy,
    InvalidIdentifier,
}

/// Append one newly-processed identifier right after a conversion. Shares
/// the mutation lock with the reconciler, never invokes the evidence
/// collectors, and appends a single line when the identifier is absent.
/// This path keeps the index current between rebuilds, and is what a
/// rebuild's union merge is forbidden to undo.
pub fn record_processed(paths: &TrackerPaths, asin: &str) -> Result<RecordOutcome> {
    let asin = asin.trim();
    if !is_valid_asin(asin) {
        return Ok(RecordOutcome::InvalidIdentifier);
    }

    let Some(_guard) = lock::try_acquire(paths, INDEX_LOCK)? else {
        return Ok(RecordOutcome::Busy);
    };

    let existing = store::load_index(&paths.index_file)?;
    if existing.contains(asin) {
        return Ok(RecordOutcome::AlreadyPresent);
    }

    store::append_identifier(&paths.index_file, asin)?;
    audit::append_event(paths, "record", "ok", &format!("asin={asin}"))?;
    Ok(RecordOutcome::Recorded)
}
