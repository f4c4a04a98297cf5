use anyhow::{Context, Result};
use globset::Glob;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub logs: LogsConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogsConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default = "default_night_tail_files")]
    pub night_tail_files: usize,
    #[serde(default = "default_night_marker")]
    pub night_marker: String,
    #[serde(default = "default_image_dir_suffix")]
    pub image_dir_suffix: String,
    #[serde(default)]
    pub verify_image_files: bool,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            include_globs: default_include_globs(),
            night_tail_files: default_night_tail_files(),
            night_marker: default_night_marker(),
            image_dir_suffix: default_image_dir_suffix(),
            verify_image_files: false,
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("Logs")
}
fn default_include_globs() -> Vec<String> {
    vec!["*.csv".to_string(), "*.log".to_string()]
}
fn default_night_tail_files() -> usize {
    3
}
fn default_night_marker() -> String {
    "night".to_string()
}
fn default_image_dir_suffix() -> String {
    "_images".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Worker threads for folder processing; 0 uses the rayon default.
    #[serde(default)]
    pub threads: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            threads: 0,
        }
    }
}

fn default_parallel() -> bool {
    true
}

impl Config {
    /// Defaults for every section, used when no config file exists.
    pub fn minimal() -> Self {
        Self {
            logs: LogsConfig::default(),
            ingest: IngestConfig::default(),
        }
    }

    /// Same configuration with a different log root.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.logs.root = root.into();
        self
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

/// Load the config file if it exists, otherwise fall back to defaults.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config_file_missing_using_defaults");
        Ok(Config::minimal())
    }
}

pub fn validate(config: &Config) -> Result<()> {
    let logs = &config.logs;

    if logs.include_globs.is_empty() {
        anyhow::bail!("logs.include_globs must contain at least one pattern");
    }
    for pattern in &logs.include_globs {
        Glob::new(pattern)
            .with_context(|| format!("logs.include_globs has an invalid pattern: '{}'", pattern))?;
    }

    if logs.night_marker.trim().is_empty() {
        anyhow::bail!("logs.night_marker must not be empty");
    }

    if logs.image_dir_suffix.is_empty() {
        anyhow::bail!("logs.image_dir_suffix must not be empty");
    }

    Ok(())
}
