//! Text-to-speech via the OpenAI `audio/speech` endpoint.

use crate::agent::PROVIDER_TIMEOUT;
use crate::config::Config;
use crate::storage::{self, StorageError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

/// Longest input the speech endpoint accepts, in characters
pub const MAX_INPUT_CHARS: usize = 4096;

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("speech request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("speech endpoint returned HTTP {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("speech endpoint returned no audio")]
    EmptyAudio,
    #[error("nothing to synthesize")]
    EmptyInput,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown voice '{0}' (expected alloy, echo, fable, onyx, nova or shimmer)")]
pub struct UnknownVoice(pub String);

/// Voices offered by the speech endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Voice {
    Alloy,
    Echo,
    Fable,
    Onyx,
    #[default]
    Nova,
    Shimmer,
}

impl Voice {
    pub const ALL: [Voice; 6] = [
        Voice::Alloy,
        Voice::Echo,
        Voice::Fable,
        Voice::Onyx,
        Voice::Nova,
        Voice::Shimmer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Alloy => "alloy",
            Voice::Echo => "echo",
            Voice::Fable => "fable",
            Voice::Onyx => "onyx",
            Voice::Nova => "nova",
            Voice::Shimmer => "shimmer",
        }
    }

    /// Blank means the default voice.
    pub fn from_config(value: &str) -> Result<Self, UnknownVoice> {
        if value.trim().is_empty() {
            Ok(Voice::default())
        } else {
            value.parse()
        }
    }
}

impl FromStr for Voice {
    type Err = UnknownVoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Voice::ALL
            .into_iter()
            .find(|voice| voice.as_str() == wanted)
            .ok_or_else(|| UnknownVoice(s.to_string()))
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turns text into an audio file
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, output: &Path) -> Result<PathBuf, SpeechError>;
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: Voice,
    response_format: &'static str,
}

impl Serialize for Voice {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

pub struct OpenAiSpeech {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    voice: Voice,
}

impl OpenAiSpeech {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        voice: Voice,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(PROVIDER_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            voice,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(
            config.api.openai_base_url.clone(),
            config.api.openai_key.clone(),
            config.speech.model.clone(),
            config.speech.voice,
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    async fn synthesize(&self, text: &str, output: &Path) -> Result<PathBuf, SpeechError> {
        let input = fit_to_limit(text.trim(), MAX_INPUT_CHARS);
        if input.is_empty() {
            return Err(SpeechError::EmptyInput);
        }
        if input.len() < text.trim().len() {
            warn!(
                "Summary is longer than {} characters, reading the first {} bytes only",
                MAX_INPUT_CHARS,
                input.len()
            );
        }

        info!("Generating audio with {} voice", self.voice);
        let body = SpeechRequest {
            model: &self.model,
            input,
            voice: self.voice,
            response_format: "mp3",
        };

        let response = self
            .http
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::Api { status, body });
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }

        storage::write_atomic(output, &audio)?;
        info!("Wrote {} bytes of audio to {}", audio.len(), output.display());
        Ok(output.to_path_buf())
    }
}

/// Cut `text` to at most `max_chars` characters. The cut moves back to a
/// sentence end, or failing that a word break, only when one lies in the
/// last quarter of what is kept.
pub fn fit_to_limit(text: &str, max_chars: usize) -> &str {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text;
    };
    let head = &text[..cut];
    let window_start = head.len() - head.len() / 4;

    if let Some(end) = head.rfind(['.', '!', '?']).filter(|&i| i >= window_start) {
        return &head[..=end];
    }
    match head.rfind(char::is_whitespace).filter(|&i| i >= window_start) {
        Some(space) => head[..space].trim_end(),
        None => head,
    }
}
