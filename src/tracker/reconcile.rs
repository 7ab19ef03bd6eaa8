use anyhow::Result;
use std::collections::BTreeSet;

use crate::error::TrackerError;
use crate::tracker::audit;
use crate::tracker::config::TrackerConfig;
use crate::tracker::evidence::{EvidenceSet, enabled_collectors};
use crate::tracker::lock::{self, INDEX_LOCK};
use crate::tracker::paths::TrackerPaths;
use crate::tracker::store;

/// What one collector contributed to the merge: how many identifiers it
/// reported, and how many of those were new to the running union.
#[derive(Debug, Clone)]
pub struct SourceContribution {
    pub source: &'static str,
    pub found: usize,
    pub added: usize,
    pub available: bool,
}

#[derive(Debug, Clone)]
pub struct RebuildReport {
    pub prior_size: usize,
    pub new_size: usize,
    pub contributions: Vec<SourceContribution>,
    pub degraded: bool,
    pub index_hash: Option<String>,
    pub dry_run: bool,
}

/// Rebuild result. Contention is an expected concurrent condition, so it
/// is a variant here rather than an error.
#[derive(Debug, Clone)]
pub enum RebuildOutcome {
    AlreadyRunning,
    Completed(RebuildReport),
}

/// Union-only merge across collector outputs, in collection order. Later
/// sources may add but never remove entries; the returned flag reports
/// whether any source was unavailable.
fn union_merge(evidence: Vec<EvidenceSet>) -> (BTreeSet<String>, Vec<SourceContribution>, bool) {
    let mut merged = BTreeSet::new();
    let mut contributions = Vec::with_capacity(evidence.len());
    let mut degraded = false;

    for set in evidence {
        let before = merged.len();
        merged.extend(set.ids.iter().cloned());
        degraded |= !set.available;
        contributions.push(SourceContribution {
            source: set.source,
            found: set.count(),
            added: merged.len() - before,
            available: set.available,
        });
    }

    (merged, contributions, degraded)
}

/// A union over sources that include the prior index can never shrink it;
/// a smaller result means a collector lied and must abort the rebuild
/// before anything is replaced.
fn ensure_no_regression(prior: usize, merged: usize) -> Result<(), TrackerError> {
    if merged < prior {
        return Err(TrackerError::Regression { prior, merged });
    }
    Ok(())
}

fn contributions_summary(contributions: &[SourceContribution]) -> String {
    contributions
        .iter()
        .map(|c| {
            format!(
                "{}:found={},added={},available={}",
                c.source, c.found, c.added, c.available
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Full reconciliation of the durable index from all enabled evidence
/// sources. Union-only merge: the rebuild is monotonically non-decreasing
/// relative to the prior index, so identifiers recorded by the incremental
/// updater between rebuilds survive even when no heuristic can rediscover
/// them. A merged set smaller than the prior index aborts before the
/// replace and leaves the prior file untouched.
pub fn rebuild(paths: &TrackerPaths, cfg: &TrackerConfig, dry_run: bool) -> Result<RebuildOutcome> {
    let Some(_guard) = lock::try_acquire(paths, INDEX_LOCK)? else {
        return Ok(RebuildOutcome::AlreadyRunning);
    };

    let prior = store::load_index(&paths.index_file).unwrap_or_default();

    let evidence = enabled_collectors(cfg)
        .iter()
        .map(|collector| collector.collect(paths, cfg))
        .collect::<Vec<_>>();
    let (merged, contributions, degraded) = union_merge(evidence);

    if let Err(err) = ensure_no_regression(prior.len(), merged.len()) {
        audit::append_event(
            paths,
            "rebuild",
            "regression",
            &format!(
                "prior={} merged={} {}",
                prior.len(),
                merged.len(),
                contributions_summary(&contributions)
            ),
        )?;
        return Err(err.into());
    }

    if !dry_run {
        store::replace_index(&paths.index_file, &merged)
            .map_err(|err| TrackerError::ReplaceFailed(format!("{err:#}")))?;
    }

    let report = RebuildReport {
        prior_size: prior.len(),
        new_size: merged.len(),
        index_hash: store::index_content_hash(&paths.index_file)?,
        contributions,
        degraded,
        dry_run,
    };

    audit::append_event(
        paths,
        "rebuild",
        if report.degraded { "degraded" } else { "ok" },
        &format!(
            "dry_run={} prior={} new={} {}",
            report.dry_run,
            report.prior_size,
            report.new_size,
            contributions_summary(&report.contributions)
        ),
    )?;

    Ok(RebuildOutcome::Completed(report))
}
