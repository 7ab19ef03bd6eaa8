use anyhow::Result;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct TrackerPaths {
    pub audiobooks_home: PathBuf,
    pub source_dir: PathBuf,
    pub library_dir: PathBuf,
    pub state_dir: PathBuf,
    pub index_file: PathBuf,
    pub catalog_file: PathBuf,
    pub logs_dir: PathBuf,
    pub runtime_dir: PathBuf,
}

impl TrackerPaths {
    pub fn locks_dir(&self) -> PathBuf {
        self.runtime_dir.join("locks")
    }

    pub fn signals_dir(&self) -> PathBuf {
        self.runtime_dir.join("signals")
    }
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<TrackerPaths> {
    let home = required_home_dir()?;
    let audiobooks_home = env_or_default_path("AUDIOBOOKS_HOME", home.join("audiobooks"));

    let source_dir = env_or_default_path("ABTRACK_SOURCE_DIR", audiobooks_home.join("source"));
    let library_dir = env_or_default_path("ABTRACK_LIBRARY_DIR", audiobooks_home.join("library"));
    let state_dir = env_or_default_path("ABTRACK_STATE_DIR", audiobooks_home.join("state"));
    let index_file = env_or_default_path("ABTRACK_INDEX_FILE", state_dir.join("converted.index"));
    let catalog_file =
        env_or_default_path("ABTRACK_CATALOG_FILE", state_dir.join("title_catalog.json"));
    let logs_dir = env_or_default_path("ABTRACK_LOGS_DIR", audiobooks_home.join("logs"));
    // Lives on volatile storage; every command re-ensures it exists.
    let runtime_dir =
        env_or_default_path("ABTRACK_RUNTIME_DIR", PathBuf::from("/tmp/abtrack-runtime"));

    Ok(TrackerPaths {
        audiobooks_home,
        source_dir,
        library_dir,
        state_dir,
        index_file,
        catalog_file,
        logs_dir,
        runtime_dir,
    })
}
