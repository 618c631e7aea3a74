use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use url::Url;

use crate::transport;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend host, with optional port (e.g. `chat.example.com:443`)
    pub host: String,
    /// Connect over `wss://` instead of `ws://`
    pub secure: bool,
    /// Prompts offered as one-click starters; they pre-fill the input only
    pub example_prompts: Vec<String>,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `rentchat=debug`
    pub filter: Option<String>,
    /// `pretty`, `compact` or `json`
    pub format: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1:8000".to_string(),
            secure: false,
            example_prompts: vec![
                "I'm looking for a 2 bedroom flat in Manchester under £1200".to_string(),
                "Show me furnished places with parking near Leeds".to_string(),
                "My boiler is broken, can someone fix it?".to_string(),
            ],
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// `~/.rentchat/config.toml`
    pub fn default_path() -> PathBuf {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home_dir.join(".rentchat").join("config.toml")
    }

    /// Load configuration from file; a missing file yields the defaults.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = path.unwrap_or_else(Self::default_path);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("reading {}", config_path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("parsing {}", config_path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// The chat endpoint this configuration points at.
    pub fn endpoint(&self) -> Result<Url> {
        Ok(transport::endpoint_url(&self.host, self.secure)?)
    }
}
