use std::path::{Path, PathBuf};

use anyhow::Context;
use mines_core::Settings;
use mines_protocol::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_KEY_ENV: &str = "API_KEY";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerOptions {
    pub model: String,
    pub endpoint: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Enables the credential picker, which re-reads the key from this file.
    pub api_key_file: Option<PathBuf>,
    /// Canned response served instead of calling the endpoint.
    pub fixture: Option<PathBuf>,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            api_key_file: None,
            fixture: None,
        }
    }
}

/// Contents of the `--config` file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub game: Settings,
    pub analyzer: AnalyzerOptions,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
