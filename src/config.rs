use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::services::ConfigSource;

pub const CONFIG_FILE: &str = "config.toml";

/// Which management API the CLI talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Service management (the older API)
    #[default]
    Asm,
    /// Resource manager
    Arm,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Asm => f.write_str("asm"),
            Mode::Arm => f.write_str("arm"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mode: Mode,
    /// Override the resource manager endpoint (e.g. "http://127.0.0.1:8080"). Used by test harness.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_manager_url: Option<String>,
}

/// Returns the config directory: ~/.config/armctl/ on Linux, %APPDATA%\armctl\ on Windows.
/// Override with ARMCTL_CONFIG_DIR env var.
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("ARMCTL_CONFIG_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let proj = directories::ProjectDirs::from("", "", "armctl")
        .context("could not determine config directory")?;
    Ok(proj.config_dir().to_path_buf())
}

/// Load config from disk, returning a default Config if the file doesn't exist
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: Config =
        toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(config)
}

/// Save config to disk, creating the directory if needed
pub fn save_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// `config.toml` on disk.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ConfigSource for FileConfigSource {
    fn read_config(&self) -> Result<Config> {
        load_config(&self.path)
    }

    fn write_config(&self, config: &Config) -> Result<()> {
        save_config(&self.path, config)?;
        tracing::info!(path = %self.path.display(), mode = %config.mode, "saved config");
        Ok(())
    }
}
