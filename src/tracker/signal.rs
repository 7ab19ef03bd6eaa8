use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use crate::tracker::paths::TrackerPaths;
use crate::tracker::util::now_epoch_secs;

/// Events daemons announce to each other through marker files. The mover
/// emits `ConvertedAdded` when it relocates finished output; it must never
/// request a rebuild itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    LibraryChanged,
    RebuildRequested,
    ConvertedAdded,
}

impl SignalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LibraryChanged => "library-changed",
            Self::RebuildRequested => "rebuild-requested",
            Self::ConvertedAdded => "converted-added",
        }
    }

    pub fn all() -> [SignalKind; 3] {
        [
            Self::LibraryChanged,
            Self::RebuildRequested,
            Self::ConvertedAdded,
        ]
    }
}

impl FromStr for SignalKind {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw {
            "library-changed" => Ok(Self::LibraryChanged),
            "rebuild-requested" => Ok(Self::RebuildRequested),
            "converted-added" => Ok(Self::ConvertedAdded),
            other => Err(anyhow::anyhow!(
                "unknown signal kind `{other}`; expected library-changed, rebuild-requested or converted-added"
            )),
        }
    }
}

/// The runtime directory may sit on volatile storage that the host clears
/// on boot, so every process start re-creates the tree. Failure here is a
/// loud startup error, not something deferred to first use.
pub fn ensure_runtime_dirs(paths: &TrackerPaths) -> Result<()> {
    for dir in [
        paths.runtime_dir.clone(),
        paths.locks_dir(),
        paths.signals_dir(),
    ] {
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to provision runtime dir {}", dir.display()))?;
    }
    Ok(())
}

/// Create one marker file for `kind`. Pid and epoch keep producers from
/// clobbering each other's markers.
pub fn emit(paths: &TrackerPaths, kind: SignalKind) -> Result<PathBuf> {
    ensure_runtime_dirs(paths)?;
    let name = format!(
        "{}-{}-{}.trigger",
        kind.as_str(),
        now_epoch_secs()?,
        std::process::id()
    );
    let path = paths.signals_dir().join(name);
    fs::write(&path, b"")
        .with_context(|| format!("failed to write signal marker {}", path.display()))?;
    Ok(path)
}

/// Consume all pending markers of `kind`: each marker is deleted by exactly
/// the poll cycle that acts on it. Returns how many were drained.
pub fn drain(paths: &TrackerPaths, kind: SignalKind) -> Result<usize> {
    let signals_dir = paths.signals_dir();
    if !signals_dir.exists() {
        return Ok(0);
    }

    let prefix = format!("{}-", kind.as_str());
    let mut drained = 0usize;
    let entries = fs::read_dir(&signals_dir)
        .with_context(|| format!("failed to read {}", signals_dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        if !name.starts_with(&prefix) || !name.ends_with(".trigger") {
            continue;
        }
        // A concurrent consumer may have taken it first; that is fine.
        if fs::remove_file(&path).is_ok() {
            drained += 1;
        }
    }
    Ok(drained)
}

/// Count pending markers of `kind` without consuming them.
pub fn pending(paths: &TrackerPaths, kind: SignalKind) -> Result<usize> {
    let signals_dir = paths.signals_dir();
    if !signals_dir.exists() {
        return Ok(0);
    }

    let prefix = format!("{}-", kind.as_str());
    let mut count = 0usize;
    let entries = fs::read_dir(&signals_dir)
        .with_context(|| format!("failed to read {}", signals_dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let Some(name) = entry.file_name().to_str().map(ToOwned::to_owned) else {
            continue;
        };
        if name.starts_with(&prefix) && name.ends_with(".trigger") {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::{SignalKind, drain, emit, ensure_runtime_dirs, pending};
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
    fn emit_then_drain_consumes_only_matching_kind() {
        let tmp = tempdir().expect("tempdir");
        let paths = paths_for(tmp.path());

        emit(&paths, SignalKind::ConvertedAdded).expect("emit");
        emit(&paths, SignalKind::ConvertedAdded).expect("emit");
        emit(&paths, SignalKind::RebuildRequested).expect("emit");

        assert_eq!(drain(&paths, SignalKind::ConvertedAdded).expect("drain"), 2);
        assert_eq!(drain(&paths, SignalKind::ConvertedAdded).expect("drain"), 0);
        assert_eq!(
            pending(&paths, SignalKind::RebuildRequested).expect("pending"),
            1
        );
    }

    #[test]
    fn runtime_dirs_are_recreated_after_wipe() {
        let tmp = tempdir().expect("tempdir");
        let paths = paths_for(tmp.path());

        ensure_runtime_dirs(&paths).expect("provision");
        std::fs::remove_dir_all(&paths.runtime_dir).expect("wipe");
        ensure_runtime_dirs(&paths).expect("re-provision");
        assert!(paths.signals_dir().exists());
        assert!(paths.locks_dir().exists());
    }

    #[test]
    fn signal_kind_parses_cli_names() {
        assert_eq!(
            "rebuild-requested".parse::<SignalKind>().expect("parse"),
            SignalKind::RebuildRequested
        );
        assert!("unknown".parse::<SignalKind>().is_err());
    }
}
