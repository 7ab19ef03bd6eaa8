use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    pub poll_interval_secs: u64,
    pub rebuild_interval_secs: u64,
    pub cooldown_secs: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            rebuild_interval_secs: 86_400,
            cooldown_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceConfig {
    pub sidecar_enabled: bool,
    pub fuzzy_enabled: bool,
    pub authoritative_enabled: bool,
    pub noise_tokens: Vec<String>,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            sidecar_enabled: true,
            fuzzy_enabled: true,
            authoritative_enabled: true,
            noise_tokens: vec![
                "unabridged".to_string(),
                "audiobook".to_string(),
                "retail".to_string(),
                "m4b".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    pub api_base_url: String,
    pub api_timeout_secs: u64,
    pub converter_bin: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:5005".to_string(),
            api_timeout_secs: 5,
            converter_bin: "m4b-tool".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrackerConfig {
    pub watcher: WatcherConfig,
    pub evidence: EvidenceConfig,
    pub library: LibraryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialTrackerConfig {
    watcher: Option<WatcherConfig>,
    evidence: Option<EvidenceConfig>,
    library: Option<LibraryConfig>,
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => {
            let trimmed = v.trim();
            match trimmed {
                "1" | "true" | "TRUE" | "yes" | "on" => true,
                "0" | "false" | "FALSE" | "no" | "off" => false,
                _ => fallback,
            }
        }
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn env_or_csv(var: &str, fallback: &[String]) -> Vec<String> {
    match env::var(var) {
        Ok(v) => {
            let out = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>();
            if out.is_empty() { fallback.to_vec() } else { out }
        }
        Err(_) => fallback.to_vec(),
    }
}

fn validate(cfg: &TrackerConfig) -> Result<()> {
    if cfg.watcher.poll_interval_secs == 0 {
        return Err(anyhow!(
            "invalid watcher poll interval: must be >= 1 second"
        ));
    }
    if cfg.watcher.rebuild_interval_secs == 0 {
        return Err(anyhow!(
            "invalid rebuild interval: must be >= 1 second"
        ));
    }
    if cfg.watcher.rebuild_interval_secs < cfg.watcher.poll_interval_secs {
        return Err(anyhow!(
            "invalid intervals: rebuild interval must not be shorter than the poll interval"
        ));
    }
    if cfg.evidence.authoritative_enabled && cfg.library.api_base_url.trim().is_empty() {
        return Err(anyhow!(
            "invalid library api base url: cannot be empty while the authoritative collector is enabled"
        ));
    }
    if cfg.library.api_timeout_secs == 0 {
        return Err(anyhow!("invalid library api timeout: must be >= 1 second"));
    }
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("ABTRACK_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    if let Ok(home) = env::var("AUDIOBOOKS_HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed).join("abtrack.toml"));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join("audiobooks").join("abtrack.toml"))
}

fn merge_file_config(base: &mut TrackerConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    let parsed: PartialTrackerConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse tracker config {}: {err}", path.display()))?;
    if let Some(watcher) = parsed.watcher {
        base.watcher = watcher;
    }
    if let Some(evidence) = parsed.evidence {
        base.evidence = evidence;
    }
    if let Some(library) = parsed.library {
        base.library = library;
    }
    Ok(())
}

pub fn load_config() -> Result<TrackerConfig> {
    let mut cfg = TrackerConfig::default();
    merge_file_config(&mut cfg)?;

    cfg.watcher.poll_interval_secs =
        env_or_u64("ABTRACK_POLL_INTERVAL_SECS", cfg.watcher.poll_interval_secs);
    cfg.watcher.rebuild_interval_secs = env_or_u64(
        "ABTRACK_REBUILD_INTERVAL_SECS",
        cfg.watcher.rebuild_interval_secs,
    );
    cfg.watcher.cooldown_secs = env_or_u64("ABTRACK_COOLDOWN_SECS", cfg.watcher.cooldown_secs);
    cfg.evidence.sidecar_enabled =
        env_or_bool("ABTRACK_SIDECAR_ENABLED", cfg.evidence.sidecar_enabled);
    cfg.evidence.fuzzy_enabled = env_or_bool("ABTRACK_FUZZY_ENABLED", cfg.evidence.fuzzy_enabled);
    cfg.evidence.authoritative_enabled = env_or_bool(
        "ABTRACK_AUTHORITATIVE_ENABLED",
        cfg.evidence.authoritative_enabled,
    );
    cfg.evidence.noise_tokens = env_or_csv("ABTRACK_NOISE_TOKENS", &cfg.evidence.noise_tokens);
    cfg.library.api_base_url = env_or_string("ABTRACK_API_BASE_URL", &cfg.library.api_base_url);
    cfg.library.api_timeout_secs =
        env_or_u64("ABTRACK_API_TIMEOUT_SECS", cfg.library.api_timeout_secs);
    cfg.library.converter_bin = env_or_string("ABTRACK_CONVERTER_BIN", &cfg.library.converter_bin);

    validate(&cfg)?;
    Ok(cfg)
}
