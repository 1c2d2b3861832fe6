use crate::agent::{DEFAULT_MAX_ITERATIONS, default_stop_markers};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const REAGENT_DIR: &str = ".reagent";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub max_iterations: usize,
    pub stop: Vec<String>,
    pub prompt_template: Option<String>,
    pub completion_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: None,
            api_key: String::new(),
            base_url: None,
            model: "gpt-4o".to_string(),
            temperature: 0.0,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            stop: default_stop_markers(),
            prompt_template: None,
            completion_timeout_secs: None,
        }
    }
}

pub fn get_reagent_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(REAGENT_DIR)
}

pub fn get_config_path() -> PathBuf {
    get_reagent_dir().join("config.toml")
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config")
    }

    /// Loads the config at the default location, falling back to defaults when
    /// no file exists yet.
    pub fn load_or_default() -> Result<Self> {
        let path = get_config_path();
        if path.exists() {
            load_config(&path)
        } else {
            Ok(Config::default())
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;

    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", path.display()))
}

pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
    }

    let content =
        toml::to_string_pretty(config).with_context(|| "Failed to serialize config to TOML")?;

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}
