use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Read the durable index: one identifier per line, deduplicated by the
/// set. A missing file is the valid empty state, not an error.
pub fn load_index(path: &Path) -> Result<BTreeSet<String>> {
    if !path.exists() {
        return Ok(BTreeSet::new());
    }
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut out = BTreeSet::new();
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        out.insert(trimmed.to_string());
    }
    Ok(out)
}

fn render_index(ids: &BTreeSet<String>) -> String {
    let mut out = String::new();
    for id in ids {
        out.push_str(id);
        out.push('\n');
    }
    out
}

/// Replace the durable index atomically: write to a temp file in the same
/// directory, then rename over the existing file. A crash mid-write leaves
/// the prior index intact; readers never observe a half-written file.
pub fn replace_index(path: &Path, ids: &BTreeSet<String>) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("index path {} has no parent directory", path.display()))?;
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp index in {}", parent.display()))?;
    tmp.write_all(render_index(ids).as_bytes())
        .with_context(|| format!("failed to write temp index in {}", parent.display()))?;
    tmp.persist(path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

/// Append a single identifier. The caller has already checked absence under
/// the mutation lock, so this stays O(1) instead of rewriting the file.
pub fn append_identifier(path: &Path, id: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("index path {} has no parent directory", path.display()))?;
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(format!("{id}\n").as_bytes())
        .with_context(|| format!("failed to append to {}", path.display()))?;
    Ok(())
}

pub fn index_content_hash(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(Some(format!("{:x}", hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::{append_identifier, load_index, replace_index};
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    #[test]
    fn missing_index_loads_as_empty() {
        let tmp = tempdir().expect("tempdir");
        let index = tmp.path().join("converted.index");
        assert!(load_index(&index).expect("load").is_empty());
    }

    #[test]
    fn load_deduplicates_and_skips_blank_lines() {
        let tmp = tempdir().expect("tempdir");
        let index = tmp.path().join("converted.index");
        std::fs::write(&index, "B00A1B2C3D\n\nB00A1B2C3D\n  B09XYZW123  \n").expect("write");

        let ids = load_index(&index).expect("load");
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("B09XYZW123"));
    }

    #[test]
    fn replace_then_load_round_trips_sorted_lines() {
        let tmp = tempdir().expect("tempdir");
        let index = tmp.path().join("state/converted.index");

        let mut ids = BTreeSet::new();
        ids.insert("B00ZZZZZZ9".to_string());
        ids.insert("B00AAAAAA1".to_string());
        replace_index(&index, &ids).expect("replace");

        let raw = std::fs::read_to_string(&index).expect("read");
        assert_eq!(raw, "B00AAAAAA1\nB00ZZZZZZ9\n");
        assert_eq!(load_index(&index).expect("load"), ids);
    }

    #[test]
    fn append_adds_one_line_without_rewriting() {
        let tmp = tempdir().expect("tempdir");
        let index = tmp.path().join("converted.index");
        std::fs::write(&index, "B00AAAAAA1\n").expect("write");

        append_identifier(&index, "B00BBBBBB2").expect("append");
        let raw = std::fs::read_to_string(&index).expect("read");
        assert_eq!(raw, "B00AAAAAA1\nB00BBBBBB2\n");
    }
}
