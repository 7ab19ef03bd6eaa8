use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::library::api;
use crate::tracker::catalog::{AUDIO_EXTENSIONS, load_title_catalog};
use crate::tracker::config::TrackerConfig;
use crate::tracker::normalize::{normalize_title, title_from_stem};
use crate::tracker::paths::TrackerPaths;
use crate::tracker::store;
use crate::tracker::warn::{self, WarnEvent};

/// Sidecar artifact the converter drops next to finished output.
pub const SIDECAR_FILE_NAME: &str = "chapters.json";

/// One collector's candidate identifiers. Never persisted; consumed once
/// by the reconciler. `available = false` means the source could not be
/// read at all, as opposed to legitimately having nothing to report.
#[derive(Debug, Clone)]
pub struct EvidenceSet {
    pub source: &'static str,
    pub ids: BTreeSet<String>,
    pub available: bool,
}

impl EvidenceSet {
    fn found(source: &'static str, ids: BTreeSet<String>) -> Self {
        Self {
            source,
            ids,
            available: true,
        }
    }

    fn unavailable(source: &'static str) -> Self {
        Self {
            source,
            ids: BTreeSet::new(),
            available: false,
        }
    }

    pub fn count(&self) -> usize {
        self.ids.len()
    }
}

/// Pure read of one evidence source. Implementations must not mutate
/// external state and must degrade to an empty set (never an error) when
/// the source is unavailable, warning about the shortfall instead.
pub trait EvidenceCollector {
    fn name(&self) -> &'static str;
    fn collect(&self, paths: &TrackerPaths, cfg: &TrackerConfig) -> EvidenceSet;
}

fn warn_unavailable(source: &'static str, err: &anyhow::Error) {
    warn::emit(WarnEvent {
        code: "EVIDENCE_UNAVAILABLE",
        stage: "collect",
        source,
        retry: "retry-next-rebuild",
        reason: "source-unreadable",
        err: &format!("{err:#}"),
    });
}

pub struct ExistingIndexCollector;
pub struct SidecarCollector;
pub struct FuzzyTitleCollector;
pub struct AuthoritativeCollector;

impl EvidenceCollector for ExistingIndexCollector {
    fn name(&self) -> &'static str {
        "existing-index"
    }

    fn collect(&self, paths: &TrackerPaths, _cfg: &TrackerConfig) -> EvidenceSet {
        // A missing index file is the valid initial state, not a shortfall.
        match store::load_index(&paths.index_file) {
            Ok(ids) => EvidenceSet::found(self.name(), ids),
            Err(err) => {
                warn_unavailable(self.name(), &err);
                EvidenceSet::unavailable(self.name())
            }
        }
    }
}

fn extract_sidecar_asin(raw: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(raw).ok()?;
    let asin = parsed
        .get("content_metadata")?
        .get("content_reference")?
        .get("asin")?
        .as_str()?
        .trim();
    if asin.is_empty() {
        None
    } else {
        Some(asin.to_string())
    }
}

fn collect_library_files(root: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        std::fs::read_dir(root).with_context(|| format!("failed to read {}", root.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_library_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

fn sidecar_asins(library_dir: &Path) -> Result<BTreeSet<String>> {
    let mut files = Vec::new();
    collect_library_files(library_dir, &mut files)?;

    let mut out = BTreeSet::new();
    for path in files {
        if path.file_name().and_then(|s| s.to_str()) != Some(SIDECAR_FILE_NAME) {
            continue;
        }
        // An unreadable or malformed sidecar is the documented gap: the
        // item simply contributes no evidence here.
        let Ok(raw) = std::fs::read_to_string(&path) else {
            continue;
        };
        if let Some(asin) = extract_sidecar_asin(&raw) {
            out.insert(asin);
        }
    }
    Ok(out)
}

impl EvidenceCollector for SidecarCollector {
    fn name(&self) -> &'static str {
        "sidecar-metadata"
    }

    fn collect(&self, paths: &TrackerPaths, _cfg: &TrackerConfig) -> EvidenceSet {
        if !paths.library_dir.exists() {
            warn_unavailable(
                self.name(),
                &anyhow::anyhow!("library dir {} does not exist", paths.library_dir.display()),
            );
            return EvidenceSet::unavailable(self.name());
        }
        match sidecar_asins(&paths.library_dir) {
            Ok(ids) => EvidenceSet::found(self.name(), ids),
            Err(err) => {
                warn_unavailable(self.name(), &err);
                EvidenceSet::unavailable(self.name())
            }
        }
    }
}

fn fuzzy_matches(
    library_dir: &Path,
    catalog_file: &Path,
    noise_tokens: &[String],
) -> Result<BTreeSet<String>> {
    let catalog = load_title_catalog(catalog_file)?;
    let normalized_catalog = catalog
        .iter()
        .map(|entry| (normalize_title(&entry.title, noise_tokens), entry))
        .collect::<Vec<_>>();

    let mut files = Vec::new();
    collect_library_files(library_dir, &mut files)?;

    let mut out = BTreeSet::new();
    for path in &files {
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        if !AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
            continue;
        }
        // Only items without a sidecar fall through to the heuristic.
        if path
            .parent()
            .is_some_and(|dir| dir.join(SIDECAR_FILE_NAME).exists())
        {
            continue;
        }

        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let needle = normalize_title(&title_from_stem(stem), noise_tokens);
        if needle.is_empty() {
            continue;
        }
        if let Some((_, entry)) = normalized_catalog
            .iter()
            .find(|(normalized, _)| *normalized == needle)
        {
            out.insert(entry.asin.clone());
        }
    }
    Ok(out)
}

impl EvidenceCollector for FuzzyTitleCollector {
    fn name(&self) -> &'static str {
        "fuzzy-title"
    }

    fn collect(&self, paths: &TrackerPaths, cfg: &TrackerConfig) -> EvidenceSet {
        if !paths.library_dir.exists() || !paths.catalog_file.exists() {
            warn_unavailable(
                self.name(),
                &anyhow::anyhow!(
                    "library dir {} or title catalog {} missing",
                    paths.library_dir.display(),
                    paths.catalog_file.display()
                ),
            );
            return EvidenceSet::unavailable(self.name());
        }
        match fuzzy_matches(
            &paths.library_dir,
            &paths.catalog_file,
            &cfg.evidence.noise_tokens,
        ) {
            Ok(ids) => EvidenceSet::found(self.name(), ids),
            Err(err) => {
                warn_unavailable(self.name(), &err);
                EvidenceSet::unavailable(self.name())
            }
        }
    }
}

impl EvidenceCollector for AuthoritativeCollector {
    fn name(&self) -> &'static str {
        "authoritative"
    }

    fn collect(&self, _paths: &TrackerPaths, cfg: &TrackerConfig) -> EvidenceSet {
        match api::fetch_converted_asins(&cfg.library.api_base_url, cfg.library.api_timeout_secs) {
            Ok(ids) => EvidenceSet::found(self.name(), ids),
            Err(err) => {
                warn_unavailable(self.name(), &err);
                EvidenceSet::unavailable(self.name())
            }
        }
    }
}

/// Enabled collectors in merge order. Later collectors may add but never
/// remove entries from earlier ones; the authoritative source runs last so
/// its entries are always present in the final snapshot.
pub fn enabled_collectors(cfg: &TrackerConfig) -> Vec<Box<dyn EvidenceCollector>> {
    let mut out: Vec<Box<dyn EvidenceCollector>> = vec![Box::new(ExistingIndexCollector)];
    if cfg.evidence.sidecar_enabled {
        out.push(Box::new(SidecarCollector));
    }
    if cfg.evidence.fuzzy_enabled {
        out.push(Box::new(FuzzyTitleCollector));
    }
    if cfg.evidence.authoritative_enabled {
        out.push(Box::new(AuthoritativeCollector));
    }
    out
}
