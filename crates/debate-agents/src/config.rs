//! Runtime configuration for the debate runner.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (`--rounds`, `--model`, `--max-words`)
//! 2. Environment variables (a `.env` file is loaded first when present)
//! 3. The TOML file passed with `--config`
//! 4. Built-in defaults (OpenRouter, `tngtech/deepseek-r1t2-chimera:free`)
//!
//! ## Environment variables
//!
//! | Variable              | Sets                                  |
//! |-----------------------|---------------------------------------|
//! | `OPENROUTER_API_KEY`  | `provider.api_key` (required)         |
//! | `OPENROUTER_BASE_URL` | `provider.base_url`                   |
//! | `DEFAULT_MODEL`       | `debate.model.name`                   |
//! | `MAX_ROUNDS`          | `debate.max_rounds`                   |
//! | `MAX_RESPONSE_LENGTH` | `debate.safeguard.max_response_length`|
//! | `MAX_RETRIES`         | `debate.safeguard.max_retries`        |

use std::path::{Path, PathBuf};
use std::str::FromStr;

use coordination::debate::{DebateConfig, StructureMarkers};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default OpenAI-compatible endpoint.
const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
/// Per-request timeout; reasoning models can take a while.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_REFERER: &str = "https://github.com/debate-agents";
const DEFAULT_TITLE: &str = "Multi-Agent Debate System";
/// Judge word cap. The verdict comes after a long analysis and must not be
/// cut off.
pub const DEFAULT_JUDGE_MAX_WORDS: usize = 2000;

/// Value shipped in `.env.example`; treated as "not configured".
pub const API_KEY_PLACEHOLDER: &str = "your_openrouter_api_key_here";

pub const ENV_API_KEY: &str = "OPENROUTER_API_KEY";
pub const ENV_BASE_URL: &str = "OPENROUTER_BASE_URL";
pub const ENV_MODEL: &str = "DEFAULT_MODEL";
pub const ENV_MAX_ROUNDS: &str = "MAX_ROUNDS";
pub const ENV_MAX_RESPONSE_LENGTH: &str = "MAX_RESPONSE_LENGTH";
pub const ENV_MAX_RETRIES: &str = "MAX_RETRIES";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{var}={value:?} is not a valid number")]
    InvalidEnv { var: &'static str, value: String },

    #[error("{0} is not set; add it to your environment or a .env file")]
    MissingApiKey(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Connection settings for the chat-completions provider.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Sent as `HTTP-Referer` for OpenRouter attribution.
    pub referer: String,
    /// Sent as `X-Title` for OpenRouter attribution.
    pub title: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            referer: DEFAULT_REFERER.to_string(),
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("referer", &self.referer)
            .field("title", &self.title)
            .finish()
    }
}

fn redact(key: &str) -> String {
    if key.is_empty() {
        "<unset>".to_string()
    } else {
        let tail: String = key
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("****{}", tail)
    }
}

/// Flag values that override every other layer.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub rounds: Option<u32>,
    pub model: Option<String>,
    pub max_words: Option<usize>,
}

/// Everything the runner needs: provider connection plus the debate
/// configuration handed to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub debate: DebateConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut debate = DebateConfig::default();
        debate.safeguard.structure_markers = StructureMarkers::standard();
        debate.safeguard.judge_max_response_length = Some(DEFAULT_JUDGE_MAX_WORDS);
        Self {
            provider: ProviderConfig::default(),
            debate,
        }
    }
}

impl AppConfig {
    /// Resolve every layer and validate the result.
    pub fn load(path: Option<&Path>, overrides: &CliOverrides) -> Result<Self, ConfigError> {
        // A missing .env is normal
        let _ = dotenvy::dotenv();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with a TOML file. Missing keys keep their default.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a TOML document. Structure markers and the judge word cap
    /// keep the runner defaults unless the file sets them.
    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        let table: toml::Table = toml::from_str(raw)?;
        let safeguard = table.get("debate").and_then(|d| d.get("safeguard"));
        let markers_set = safeguard
            .and_then(|s| s.get("structure_markers"))
            .is_some();
        let judge_limit_set = safeguard
            .and_then(|s| s.get("judge_max_response_length"))
            .is_some();
        let mut config: Self = toml::Value::Table(table).try_into()?;
        if !markers_set {
            config.debate.safeguard.structure_markers = StructureMarkers::standard();
        }
        if !judge_limit_set {
            config.debate.safeguard.judge_max_response_length = Some(DEFAULT_JUDGE_MAX_WORDS);
        }
        Ok(config)
    }

    /// Overlay environment variables read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.provider.api_key = key.trim().to_string();
        }
        if let Some(url) = get(ENV_BASE_URL) {
            self.provider.base_url = url.trim().to_string();
        }
        if let Some(model) = get(ENV_MODEL) {
            self.debate.model.name = model.trim().to_string();
        }
        if let Some(rounds) = parse_env(ENV_MAX_ROUNDS, get(ENV_MAX_ROUNDS))? {
            self.debate.max_rounds = rounds;
        }
        if let Some(words) = parse_env(ENV_MAX_RESPONSE_LENGTH, get(ENV_MAX_RESPONSE_LENGTH))? {
            self.debate.safeguard.max_response_length = words;
        }
        if let Some(retries) = parse_env(ENV_MAX_RETRIES, get(ENV_MAX_RETRIES))? {
            self.debate.safeguard.max_retries = retries;
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(rounds) = overrides.rounds {
            self.debate.max_rounds = rounds;
        }
        if let Some(model) = &overrides.model {
            self.debate.model.name = model.clone();
        }
        if let Some(words) = overrides.max_words {
            self.debate.safeguard.max_response_length = words;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let key = self.provider.api_key.trim();
        if key.is_empty() || key == API_KEY_PLACEHOLDER {
            return Err(ConfigError::MissingApiKey(ENV_API_KEY));
        }
        if !self.provider.base_url.starts_with("http://")
            && !self.provider.base_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid(format!(
                "base_url {:?} must start with http:// or https://",
                self.provider.base_url
            )));
        }
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be positive".into()));
        }
        self.debate
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

fn parse_env<T: FromStr>(var: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError> {
    match value {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
    }
}
