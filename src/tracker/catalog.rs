use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::tracker::normalize::title_from_stem;

/// Extensions the pipeline treats as convertible source audio.
pub const AUDIO_EXTENSIONS: &[&str] = &["aax", "aaxc", "m4a", "m4b", "mp3"];

/// ASINs are ten uppercase alphanumerics, same shape the library backend
/// enforces before touching its database.
pub fn is_valid_asin(raw: &str) -> bool {
    raw.len() == 10
        && raw
            .chars()
            .all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStatus {
    Pending,
    Converted,
    Failed,
}

impl ConversionStatus {
    /// `converted` is terminal for this core; `failed` items re-enter the
    /// queue as retries.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Converted)
    }

    pub fn needs_conversion(self) -> bool {
        matches!(self, Self::Pending | Self::Failed)
    }
}

/// A file-system asset awaiting or having undergone conversion. Status is
/// derived at scan time; only the converter daemon and the reconciler act
/// on it, and nothing here ever deletes the asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceItem {
    pub path: PathBuf,
    pub title: String,
    pub asin: Option<String>,
    pub status: ConversionStatus,
}

fn collect_audio_files(root: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        std::fs::read_dir(root).with_context(|| format!("failed to read {}", root.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_audio_files(&path, out)?;
            continue;
        }
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        if AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
            out.push(path);
        }
    }
    Ok(())
}

/// Scan the source directory into pending items. A missing directory is an
/// empty scan, matching how collectors treat absent sources.
pub fn scan_source_items(source_dir: &Path) -> Result<Vec<SourceItem>> {
    if !source_dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    collect_audio_files(source_dir, &mut files)?;
    files.sort();

    let mut out = Vec::with_capacity(files.len());
    for path in files {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled");
        out.push(SourceItem {
            title: title_from_stem(stem),
            path,
            asin: None,
            status: ConversionStatus::Pending,
        });
    }
    Ok(out)
}

/// One row of the backend's title export: a known library title and the
/// ASIN it resolves to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub title: String,
    pub asin: String,
}

pub fn load_title_catalog(path: &Path) -> Result<Vec<CatalogEntry>> {
    let raw =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let parsed: Vec<CatalogEntry> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse title catalog {}", path.display()))?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::{ConversionStatus, is_valid_asin, load_title_catalog, scan_source_items};
    use tempfile::tempdir;

    #[test]
    fn asin_shape_matches_backend_rule() {
        assert!(is_valid_asin("B00A1B2C3D"));
        assert!(is_valid_asin("0123456789"));
        assert!(!is_valid_asin("b00a1b2c3d"));
        assert!(!is_valid_asin("B00A1B2C3"));
        assert!(!is_valid_asin("B00A1B2C3DX"));
        assert!(!is_valid_asin("B00A-B2C3D"));
    }

    #[test]
    fn status_transitions_follow_the_state_machine() {
        assert!(ConversionStatus::Converted.is_terminal());
        assert!(ConversionStatus::Pending.needs_conversion());
        assert!(ConversionStatus::Failed.needs_conversion());
        assert!(!ConversionStatus::Converted.needs_conversion());
    }

    #[test]
    fn scan_finds_audio_recursively_and_titles_stems() {
        let tmp = tempdir().expect("tempdir");
        let source = tmp.path().join("source");
        std::fs::create_dir_all(source.join("nested")).expect("mkdir");
        std::fs::write(source.join("Project_Hail_Mary.aax"), b"x").expect("write");
        std::fs::write(source.join("nested/leviathan wakes.m4b"), b"x").expect("write");
        std::fs::write(source.join("cover.jpg"), b"x").expect("write");

        let items = scan_source_items(&source).expect("scan");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Project Hail Mary");
        assert_eq!(items[1].title, "leviathan wakes");
        assert!(items.iter().all(|i| i.asin.is_none()));
    }

    #[test]
    fn missing_source_dir_scans_empty() {
        let tmp = tempdir().expect("tempdir");
        let items = scan_source_items(&tmp.path().join("nope")).expect("scan");
        assert!(items.is_empty());
    }

    #[test]
    fn title_catalog_parses_backend_export() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("title_catalog.json");
        std::fs::write(
            &path,
            r#"[{"title":"Children of Dune","asin":"B002V0QK4C"}]"#,
        )
        .expect("write");

        let catalog = load_title_catalog(&path).expect("load");
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].asin, "B002V0QK4C");
    }
}
