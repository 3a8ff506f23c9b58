use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::orchestration::scheduler::DEFAULT_DEBOUNCE;
use crate::{tlog_debug, Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Directory containing the tracker's tasks.json.
    pub tracker_dir: Option<String>,
    /// Override for the recompute debounce delay, in milliseconds.
    pub debounce_ms: Option<u64>,
}

impl Config {
    pub fn tempo_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".tempo"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::tempo_dir()?.join("tempo.toml"))
    }

    pub fn view_path() -> Result<PathBuf> {
        Ok(Self::tempo_dir()?.join("view.json"))
    }

    /// Resolve the tracker directory: CLI override wins, then config, then
    /// the current directory.
    pub fn effective_tracker_dir(&self, cli_override: Option<&str>) -> PathBuf {
        match cli_override.or(self.tracker_dir.as_deref()) {
            Some(dir) => expand_tilde(dir),
            None => PathBuf::from("."),
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_DEBOUNCE)
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        tlog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            tlog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(&path)?)?;
        tlog_debug!(
            "Config loaded: tracker_dir={:?}, debounce_ms={:?}",
            config.tracker_dir,
            config.debounce_ms
        );
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let tempo_dir = Self::tempo_dir()?;
        if !tempo_dir.exists() {
            tlog_debug!("Creating tempo directory: {}", tempo_dir.display());
            fs::create_dir_all(&tempo_dir)?;
        }
        let path = Self::config_path()?;
        fs::write(&path, toml::to_string_pretty(self)?)?;
        tlog_debug!("Config saved to {}", path.display());
        Ok(())
    }

    pub fn ensure_dirs() -> Result<()> {
        let tempo_dir = Self::tempo_dir()?;
        if !tempo_dir.exists() {
            fs::create_dir_all(&tempo_dir)?;
        }
        Ok(())
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
