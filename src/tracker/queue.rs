use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::tracker::catalog::{CatalogEntry, SourceItem, is_valid_asin, load_title_catalog,
    scan_source_items};
use crate::tracker::normalize::normalize_title;
use crate::tracker::paths::TrackerPaths;
use crate::tracker::store;

/// A pending conversion job handed to the converter daemon. Entries are
/// ephemeral: built by diffing the source catalog against the index,
/// destroyed when the converter claims and completes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkQueueEntry {
    pub item: SourceItem,
    pub enqueued_at: String,
}

/// Best-effort identifier for a source file: an ASIN-shaped token in the
/// filename wins (downloader output embeds them), otherwise a normalized
/// title match against the backend's catalog export.
fn resolve_asin(item: &SourceItem, catalog: &[CatalogEntry], noise_tokens: &[String]) -> Option<String> {
    if let Some(stem) = item.path.file_stem().and_then(|s| s.to_str()) {
        for token in stem.split(|ch: char| !ch.is_ascii_alphanumeric()) {
            if token.starts_with('B') && is_valid_asin(token) {
                return Some(token.to_string());
            }
        }
    }

    let needle = normalize_title(&item.title, noise_tokens);
    if needle.is_empty() {
        return None;
    }
    catalog
        .iter()
        .find(|entry| normalize_title(&entry.title, noise_tokens) == needle)
        .map(|entry| entry.asin.clone())
}

/// Diff the source scan against a lock-free read of the durable index.
/// The snapshot may be slightly stale; that only risks a redundant,
/// idempotent reconversion attempt, never data loss. Items whose ASIN
/// cannot be resolved stay queued; reconverting is cheaper than losing
/// work.
pub fn build_work_queue(
    paths: &TrackerPaths,
    noise_tokens: &[String],
) -> Result<Vec<WorkQueueEntry>> {
    let index = store::load_index(&paths.index_file)?;
    let catalog = if paths.catalog_file.exists() {
        load_title_catalog(&paths.catalog_file).unwrap_or_default()
    } else {
        Vec::new()
    };
    let items = scan_source_items(&paths.source_dir)?;
    let enqueued_at = Utc::now().to_rfc3339();

    let mut out = Vec::new();
    for mut item in items {
        item.asin = resolve_asin(&item, &catalog, noise_tokens);
        if let Some(asin) = item.asin.as_deref()
            && index.contains(asin)
        {
            continue;
        }
        if !item.status.needs_conversion() {
            continue;
        }
        out.push(WorkQueueEntry {
            item,
            enqueued_at: enqueued_at.clone(),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::build_work_queue;
    use crate::tracker::config::TrackerConfig;
    use crate::tracker::paths::TrackerPaths;
    use crate::tracker::store;
    use tempfile::tempdir;

    fn paths_for(root: &std::path::Path) -> TrackerPaths {
        TrackerPaths {
            audiobooks_home: root.to_path_buf(),
            source_dir: root.join("source"),
            library_dir: root.join("library"),
            state_dir: root.join("state"),
            index_file: root.join("state/converted.index"),
            catalog_file: root.join("state/title_catalog.json"),
            logs_dir: root.join("logs"),
            runtime_dir: root.join("runtime"),
        }
    }

    fn seed_index(paths: &TrackerPaths, ids: &[&str]) {
        let set = ids.iter().map(|s| s.to_string()).collect();
        store::replace_index(&paths.index_file, &set).expect("seed index");
    }

    #[test]
    fn queue_skips_items_whose_filename_asin_is_indexed() {
        let tmp = tempdir().expect("tempdir");
        let paths = paths_for(tmp.path());
        let cfg = TrackerConfig::default();
        seed_index(&paths, &["B002V0QK4C"]);

        std::fs::create_dir_all(&paths.source_dir).expect("mkdir");
        std::fs::write(
            paths.source_dir.join("Children_of_Dune-B002V0QK4C.aax"),
            b"x",
        )
        .expect("write");
        std::fs::write(paths.source_dir.join("fresh_item.aax"), b"x").expect("write");

        let queue = build_work_queue(&paths, &cfg.evidence.noise_tokens).expect("queue");
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].item.title, "fresh item");
        assert!(!queue[0].enqueued_at.is_empty());
    }

    #[test]
    fn queue_resolves_asins_through_the_title_catalog() {
        let tmp = tempdir().expect("tempdir");
        let paths = paths_for(tmp.path());
        let cfg = TrackerConfig::default();
        seed_index(&paths, &["B0099RKRDO"]);

        std::fs::create_dir_all(&paths.state_dir).expect("mkdir");
        std::fs::write(
            &paths.catalog_file,
            r#"[{"title":"Leviathan Wakes","asin":"B0099RKRDO"}]"#,
        )
        .expect("write catalog");

        std::fs::create_dir_all(&paths.source_dir).expect("mkdir");
        std::fs::write(
            paths.source_dir.join("Leviathan_Wakes (Unabridged).aax"),
            b"x",
        )
        .expect("write");

        let queue = build_work_queue(&paths, &cfg.evidence.noise_tokens).expect("queue");
        assert!(queue.is_empty());
    }

    #[test]
    fn unresolvable_items_stay_queued() {
        let tmp = tempdir().expect("tempdir");
        let paths = paths_for(tmp.path());
        let cfg = TrackerConfig::default();
        seed_index(&paths, &["B0099RKRDO"]);

        std::fs::create_dir_all(&paths.source_dir).expect("mkdir");
        std::fs::write(paths.source_dir.join("mystery_title.aax"), b"x").expect("write");

        let queue = build_work_queue(&paths, &cfg.evidence.noise_tokens).expect("queue");
        assert_eq!(queue.len(), 1);
        assert!(queue[0].item.asin.is_none());
    }

    #[test]
    fn queue_tolerates_missing_index_and_source() {
        let tmp = tempdir().expect("tempdir");
        let paths = paths_for(tmp.path());
        let cfg = TrackerConfig::default();

        let queue = build_work_queue(&paths, &cfg.evidence.noise_tokens).expect("queue");
        assert!(queue.is_empty());
    }
}
