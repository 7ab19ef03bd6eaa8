use crate::tracker::paths::TrackerPaths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerState {
    pub schema_version: u32,
    pub last_heartbeat_epoch_secs: u64,
    pub last_rebuild_epoch_secs: Option<u64>,
    pub last_rebuild_size: Option<usize>,
    pub last_rebuild_degraded: Option<bool>,
    pub last_queue_size: Option<usize>,
}

impl Default for TrackerState {
    fn default() -> Self {
        Self {
            schema_version: 1,
            last_heartbeat_epoch_secs: 0,
            last_rebuild_epoch_secs: None,
            last_rebuild_size: None,
            last_rebuild_degraded: None,
            last_queue_size: None,
        }
    }
}

pub fn state_file_path(paths: &TrackerPaths) -> PathBuf {
    paths.state_dir.join("tracker_state.json")
}

pub fn load(paths: &TrackerPaths) -> Result<TrackerState> {
    let file = state_file_path(paths);
    if !file.exists() {
        return Ok(TrackerState::default());
    }

    let raw =
        fs::read_to_string(&file).with_context(|| format!("failed to read {}", file.display()))?;
    let parsed: TrackerState = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", file.display()))?;
    Ok(parsed)
}

pub fn save(paths: &TrackerPaths, state: &TrackerState) -> Result<PathBuf> {
    let file = state_file_path(paths);
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let data = serde_json::to_string_pretty(state)?;
    fs::write(&file, format!("{data}\n"))
        .with_context(|| format!("failed to write {}", file.display()))?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::{TrackerState, load, save};
    use crate::tracker::paths::TrackerPaths;
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

    #[test]
    fn missing_state_loads_defaults() {
        let tmp = tempdir().expect("tempdir");
        let state = load(&paths_for(tmp.path())).expect("load");
        assert_eq!(state.schema_version, 1);
        assert!(state.last_rebuild_epoch_secs.is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = tempdir().expect("tempdir");
        let paths = paths_for(tmp.path());

        let mut state = TrackerState::default();
        state.last_heartbeat_epoch_secs = 1234;
        state.last_rebuild_size = Some(7);
        save(&paths, &state).expect("save");

        let loaded = load(&paths).expect("load");
        assert_eq!(loaded.last_heartbeat_epoch_secs, 1234);
        assert_eq!(loaded.last_rebuild_size, Some(7));
    }
}
