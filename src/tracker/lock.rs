use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::tracker::paths::TrackerPaths;

/// Name of the advisory lock serializing all index mutation; the
/// incremental append and the full rebuild both take this one.
pub const INDEX_LOCK: &str = "converted-index";

/// Held advisory lock. The flock is tied to the open file descriptor, so it
/// dies with the process; the lock file itself is left behind and only
/// carries the holder pid for diagnostics.
#[derive(Debug)]
pub struct LockGuard {
    file: fs::File,
    path: PathBuf,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn lock_path(paths: &TrackerPaths, name: &str) -> PathBuf {
    paths.locks_dir().join(format!("{name}.lock"))
}

/// Non-blocking acquire. `Ok(None)` means another process holds the lock;
/// callers skip and retry on their own schedule instead of queueing.
pub fn try_acquire(paths: &TrackerPaths, name: &str) -> Result<Option<LockGuard>> {
    let locks_dir = paths.locks_dir();
    fs::create_dir_all(&locks_dir)
        .with_context(|| format!("failed to create {}", locks_dir.display()))?;

    let path = lock_path(paths, name);
    let file = fs::OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    match file.try_lock_exclusive() {
        Ok(()) => {}
        Err(err) if err.kind() == fs2::lock_contended_error().kind() => {
            return Ok(None);
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to lock {}", path.display()));
        }
    }

    let mut locked = file;
    locked.set_len(0).ok();
    let _ = locked.write_all(format!("{}\n", std::process::id()).as_bytes());

    Ok(Some(LockGuard { file: locked, path }))
}

/// Pid recorded by the current or most recent holder, for health reporting.
pub fn holder_pid(paths: &TrackerPaths, name: &str) -> Result<Option<u32>> {
    let path = lock_path(paths, name);
    if !path.exists() {
        return Ok(None);
    }
    let raw =
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(raw
        .lines()
        .find(|line| !line.trim().is_empty())
        .and_then(|line| line.trim().parse::<u32>().ok()))
}

#[cfg(test)]
mod tests {
    use super::{INDEX_LOCK, holder_pid, try_acquire};
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
    fn second_acquire_in_same_process_is_refused() {
        let tmp = tempdir().expect("tempdir");
        let paths = paths_for(tmp.path());

        let first = try_acquire(&paths, INDEX_LOCK).expect("acquire");
        assert!(first.is_some());

        // flock is per-fd, so a second open descriptor contends.
        let second = try_acquire(&paths, INDEX_LOCK).expect("acquire");
        assert!(second.is_none());
    }

    #[test]
    fn lock_is_reacquirable_after_release() {
        let tmp = tempdir().expect("tempdir");
        let paths = paths_for(tmp.path());

        drop(try_acquire(&paths, INDEX_LOCK).expect("acquire"));
        let again = try_acquire(&paths, INDEX_LOCK).expect("acquire");
        assert!(again.is_some());
    }

    #[test]
    fn holder_pid_records_current_process() {
        let tmp = tempdir().expect("tempdir");
        let paths = paths_for(tmp.path());

        let _guard = try_acquire(&paths, INDEX_LOCK).expect("acquire");
        let pid = holder_pid(&paths, INDEX_LOCK).expect("read pid");
        assert_eq!(pid, Some(std::process::id()));
    }
}
