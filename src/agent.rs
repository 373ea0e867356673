//! LLM agent module for summarization.
//!
//! Three interchangeable backends sit behind [`Summarizer`]: OpenAI chat
//! completions, the Anthropic messages API and a local OpenAI-compatible
//! Ollama server.

pub use crate::summary::Summary;

use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// LLM and TTS calls can take minutes on long pages
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(300);

const BASE_SYSTEM_PROMPT: &str = "You are a helpful AI assistant named ROBOT. Provide concise \
     answers to simple questions and thorough responses to complex, open-ended queries.";

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("{backend} request failed: {source}")]
    RequestFailed {
        backend: Backend,
        #[source]
        source: reqwest::Error,
    },
    #[error("{backend} returned HTTP {status}: {body}")]
    Api {
        backend: Backend,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("{0} returned no text")]
    EmptyResponse(Backend),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported summarization backend '{0}' (expected openai, claude or ollama)")]
pub struct UnsupportedBackend(pub String);

/// Summarization providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    OpenAi,
    Claude,
    Ollama,
}

impl FromStr for Backend {
    type Err = UnsupportedBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Backend::OpenAi),
            "claude" => Ok(Backend::Claude),
            "ollama" => Ok(Backend::Ollama),
            _ => Err(UnsupportedBackend(s.to_string())),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::OpenAi => "openai",
            Backend::Claude => "claude",
            Backend::Ollama => "ollama",
        };
        f.write_str(name)
    }
}

impl Backend {
    /// Default system prompt, if the backend takes one
    pub fn system_prompt(&self) -> Option<String> {
        match self {
            Backend::OpenAi => Some(BASE_SYSTEM_PROMPT.replace("ROBOT", "ChatGPT")),
            Backend::Claude => Some(BASE_SYSTEM_PROMPT.replace("ROBOT", "Claude")),
            Backend::Ollama => None,
        }
    }

    /// User prompt wrapping the page text
    pub fn prompt(&self, content: &str) -> String {
        match self {
            Backend::Claude => format!(
                "Please synthesize and provide a detailed overview of the following webpage \
                 content.\nWebpage Content:\n{content}"
            ),
            Backend::OpenAi | Backend::Ollama => format!(
                "Please synthesize and provide a detailed overview of the following textual \
                 content.\nContent:\n{content}"
            ),
        }
    }
}

/// Generation parameters shared by all backends
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Turns page text into a summary
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<Summary, AgentError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// HTTP client for one configured backend
pub struct LlmClient {
    backend: Backend,
    http: Client,
    base_url: String,
    api_key: String,
    params: GenerationParams,
}

impl LlmClient {
    pub fn new(
        backend: Backend,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        params: GenerationParams,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(PROVIDER_TIMEOUT).build()?;
        Ok(Self {
            backend,
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            params,
        })
    }

    /// Client for the backend selected in the config
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(
            config.agent.backend,
            config.base_url(),
            config.api_key(),
            GenerationParams {
                model: config.agent.model.clone(),
                temperature: config.agent.temperature,
                max_tokens: config.agent.max_tokens,
            },
        )
    }

    async fn chat_completion(&self, prompt: &str) -> Result<String, AgentError> {
        let system = self.backend.system_prompt();
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        // The local server only gets model and messages
        let tuned = self.backend == Backend::OpenAi;
        let body = ChatCompletionRequest {
            model: &self.params.model,
            messages,
            temperature: tuned.then_some(self.params.temperature),
            max_tokens: tuned.then_some(self.params.max_tokens),
            top_p: tuned.then_some(1.0),
            frequency_penalty: tuned.then_some(0.0),
            presence_penalty: tuned.then_some(0.0),
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| self.request_failed(source))?;

        let response = self.check_status(response).await?;
        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|source| self.request_failed(source))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(AgentError::EmptyResponse(self.backend))
    }

    async fn messages(&self, prompt: &str) -> Result<String, AgentError> {
        let system = self.backend.system_prompt();
        let body = MessagesRequest {
            model: &self.params.model,
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
            system: system.as_deref(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|source| self.request_failed(source))?;

        let response = self.check_status(response).await?;
        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|source| self.request_failed(source))?;

        let text: String = parsed
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");

        if text.is_empty() {
            Err(AgentError::EmptyResponse(self.backend))
        } else {
            Ok(text)
        }
    }

    async fn check_status(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, AgentError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AgentError::Api {
            backend: self.backend,
            status,
            body,
        })
    }

    fn request_failed(&self, source: reqwest::Error) -> AgentError {
        AgentError::RequestFailed {
            backend: self.backend,
            source,
        }
    }
}

#[async_trait]
impl Summarizer for LlmClient {
    async fn summarize(&self, text: &str) -> Result<Summary, AgentError> {
        info!("Using {} model {} for summary", self.backend, self.params.model);
        let prompt = self.backend.prompt(text);
        debug!("Prompt is {} chars", prompt.len());

        let output = match self.backend {
            Backend::OpenAi | Backend::Ollama => self.chat_completion(&prompt).await?,
            Backend::Claude => self.messages(&prompt).await?,
        };

        let summary = Summary::new(output.trim(), self.params.model.clone(), self.backend);
        if summary.is_empty() {
            return Err(AgentError::EmptyResponse(self.backend));
        }
        Ok(summary)
    }
}
