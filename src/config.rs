use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::inference::{huggingface, openai};
use crate::rate_limiter::DEFAULT_REQUESTS_PER_MINUTE;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

/// Which inference API answers non-canned messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    OpenAi,
    HuggingFace,
}

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    telegram_bot_token: String,
    /// Mention handle; looked up via getMe when absent.
    bot_username: Option<String>,
    #[serde(default)]
    backend: BackendKind,
    openai_api_key: Option<String>,
    openai_base_url: Option<String>,
    openai_model: Option<String>,
    /// System prompt sent with every chat completion.
    persona: Option<String>,
    huggingface_api_key: Option<String>,
    huggingface_model_url: Option<String>,
    #[serde(default = "default_requests_per_minute")]
    requests_per_minute: usize,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
    /// Directory for logs. Defaults to current directory.
    data_dir: Option<String>,
}

fn default_requests_per_minute() -> usize {
    DEFAULT_REQUESTS_PER_MINUTE
}

fn default_request_timeout_secs() -> u64 {
    10
}

pub struct Config {
    pub telegram_bot_token: String,
    /// Normalized to start with `@`.
    pub bot_username: Option<String>,
    pub backend: BackendKind,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub persona: String,
    pub huggingface_api_key: String,
    pub huggingface_model_url: String,
    pub requests_per_minute: usize,
    pub request_timeout: Duration,
    pub data_dir: PathBuf,
}

impl Config {
    /// Load from an optional JSON file, then apply environment overrides.
    ///
    /// `TELEGRAM_TOKEN`, `OPENAI_API_KEY` and `HUGGINGFACE_API_KEY` replace the
    /// corresponding file values when set and non-empty.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    pub fn load_with_env<F>(path: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match path {
            Some(path) => {
                let config_path = path.to_path_buf();
                let content = std::fs::read_to_string(&config_path).map_err(|e| {
                    ConfigError::ReadFile { path: config_path.clone(), source: e }
                })?;
                serde_json::from_str(&content)
                    .map_err(|e| ConfigError::ParseJson { path: config_path, source: e })?
            }
            None => ConfigFile {
                requests_per_minute: default_requests_per_minute(),
                request_timeout_secs: default_request_timeout_secs(),
                ..ConfigFile::default()
            },
        };

        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let telegram_bot_token = lookup("TELEGRAM_TOKEN").unwrap_or(file.telegram_bot_token);
        let openai_api_key = lookup("OPENAI_API_KEY")
            .or(file.openai_api_key)
            .unwrap_or_default();
        let huggingface_api_key = lookup("HUGGINGFACE_API_KEY")
            .or(file.huggingface_api_key)
            .unwrap_or_default();

        if telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token is required (or set TELEGRAM_TOKEN)".into(),
            ));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }

        match file.backend {
            BackendKind::OpenAi if openai_api_key.is_empty() => {
                return Err(ConfigError::Validation(
                    "openai backend selected but no API key (openai_api_key or OPENAI_API_KEY)".into(),
                ));
            }
            BackendKind::HuggingFace if huggingface_api_key.is_empty() => {
                return Err(ConfigError::Validation(
                    "huggingface backend selected but no API key (huggingface_api_key or HUGGINGFACE_API_KEY)".into(),
                ));
            }
            _ => {}
        }

        if file.requests_per_minute == 0 {
            return Err(ConfigError::Validation("requests_per_minute must be at least 1".into()));
        }
        if file.request_timeout_secs == 0 {
            return Err(ConfigError::Validation("request_timeout_secs must be at least 1".into()));
        }

        let bot_username = file
            .bot_username
            .map(|s| s.trim().trim_start_matches('@').to_string())
            .filter(|s| !s.is_empty())
            .map(|s| format!("@{s}"));

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            telegram_bot_token,
            bot_username,
            backend: file.backend,
            openai_api_key,
            openai_base_url: file
                .openai_base_url
                .unwrap_or_else(|| openai::DEFAULT_BASE_URL.to_string()),
            openai_model: file
                .openai_model
                .unwrap_or_else(|| openai::DEFAULT_MODEL.to_string()),
            persona: file
                .persona
                .unwrap_or_else(|| openai::DEFAULT_PERSONA.to_string()),
            huggingface_api_key,
            huggingface_model_url: file
                .huggingface_model_url
                .unwrap_or_else(|| huggingface::DEFAULT_MODEL_URL.to_string()),
            requests_per_minute: file.requests_per_minute,
            request_timeout: Duration::from_secs(file.request_timeout_secs),
            data_dir,
        })
    }
}
