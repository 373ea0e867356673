//! Configuration loading and management for readit.
//!
//! Loads settings from `config.json` with environment variable overrides for API keys.

use crate::agent::{Backend, UnsupportedBackend};
use crate::speech::{UnknownVoice, Voice};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Keys that every config file has to define.
pub const REQUIRED_KEYS: [&str; 8] = [
    "CLAUDE_KEY",
    "OPENAI_KEY",
    "OUTPUT_DIR",
    "SELECTED_MODEL",
    "SELECTED_MODEL_TYPE",
    "OLLAMA_HOST",
    "AUDIO_VOICE",
    "MAX_RESPONSE_TOKENS",
];

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_CLAUDE_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_TTS_MODEL: &str = "tts-1-hd";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("config root must be a JSON object")]
    NotAnObject,
    #[error("missing required config key: {0}")]
    MissingKey(&'static str),
    #[error(transparent)]
    Backend(#[from] UnsupportedBackend),
    #[error(transparent)]
    Voice(#[from] UnknownVoice),
}

/// Raw shape of `config.json`. Field names follow the file's upper-case keys.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct RawConfig {
    claude_key: String,
    openai_key: String,
    output_dir: PathBuf,
    selected_model: String,
    selected_model_type: String,
    ollama_host: String,
    audio_voice: String,
    #[serde(deserialize_with = "number_or_string")]
    max_response_tokens: u32,
    #[serde(default = "default_temperature")]
    temperature: f32,
    #[serde(default)]
    tts_model: Option<String>,
    #[serde(default)]
    sounds_dir: Option<PathBuf>,
    #[serde(default)]
    openai_base_url: Option<String>,
    #[serde(default)]
    claude_base_url: Option<String>,
}

fn default_temperature() -> f32 {
    1.0
}

/// Accept `720` as well as `"720"`.
fn number_or_string<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u32),
        Text(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// API keys for the cloud providers
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub claude_key: String,
    pub openai_key: String,
    pub openai_base_url: String,
    pub claude_base_url: String,
}

/// Summarization backend settings
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub backend: Backend,
    /// Model identifier (e.g., "gpt-4-0125-preview")
    pub model: String,
    /// Base URL of the local OpenAI-compatible server
    pub ollama_host: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Text-to-speech settings
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub voice: Voice,
    pub model: String,
}

/// Root configuration, immutable once loaded.
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub agent: AgentConfig,
    pub speech: SpeechConfig,
    pub output_dir: PathBuf,
    /// Directory holding the notification cue files
    pub sounds_dir: PathBuf,
}

impl Config {
    /// Load configuration from an explicit path, or the default location
    /// (config.json in cwd or ~/.config/readit/config.json)
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from(path),
            None => Self::load_from(&Self::find_config_file()),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json(&content)?;

        // Override API keys from environment variables
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            config.api.claude_key = key;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.api.openai_key = key;
        }

        Ok(config)
    }

    /// Parse and validate a config document.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(content)?;
        let object = value.as_object().ok_or(ConfigError::NotAnObject)?;
        check_required_keys(object)?;

        let raw: RawConfig = serde_json::from_value(value)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let backend: Backend = raw.selected_model_type.parse()?;
        let voice = Voice::from_config(&raw.audio_voice)?;

        Ok(Self {
            api: ApiConfig {
                claude_key: raw.claude_key,
                openai_key: raw.openai_key,
                openai_base_url: raw
                    .openai_base_url
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                claude_base_url: raw
                    .claude_base_url
                    .unwrap_or_else(|| DEFAULT_CLAUDE_BASE_URL.to_string()),
            },
            agent: AgentConfig {
                backend,
                model: raw.selected_model,
                ollama_host: raw.ollama_host,
                max_tokens: raw.max_response_tokens,
                temperature: raw.temperature,
            },
            speech: SpeechConfig {
                voice,
                model: raw.tts_model.unwrap_or_else(|| DEFAULT_TTS_MODEL.to_string()),
            },
            output_dir: raw.output_dir,
            sounds_dir: raw.sounds_dir.unwrap_or_else(|| PathBuf::from(".")),
        })
    }

    /// Find the config file in standard locations
    fn find_config_file() -> PathBuf {
        // Check current directory first
        let local_config = PathBuf::from("config.json");
        if local_config.exists() {
            return local_config;
        }

        // Check home directory
        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config").join("readit").join("config.json");
            if home_config.exists() {
                return home_config;
            }
        }

        // Default to local path (will error on read)
        local_config
    }

    /// API key for the configured summarization backend
    pub fn api_key(&self) -> &str {
        match self.agent.backend {
            Backend::OpenAi => &self.api.openai_key,
            Backend::Claude => &self.api.claude_key,
            Backend::Ollama => "ollama",
        }
    }

    /// Base URL requests for the configured backend are sent to
    pub fn base_url(&self) -> String {
        match self.agent.backend {
            Backend::OpenAi => self.api.openai_base_url.clone(),
            Backend::Claude => self.api.claude_base_url.clone(),
            Backend::Ollama => format!("{}/v1", self.agent.ollama_host.trim_end_matches('/')),
        }
    }
}

fn check_required_keys(object: &Map<String, Value>) -> Result<(), ConfigError> {
    for key in REQUIRED_KEYS {
        match object.get(key) {
            None | Some(Value::Null) => return Err(ConfigError::MissingKey(key)),
            Some(_) => {}
        }
    }
    Ok(())
}
