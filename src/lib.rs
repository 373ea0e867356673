//! # readit
//!
//! Read it to me: fetch a webpage, summarise it with an LLM and listen to the
//! summary.
//!
//! ## Features
//!
//! - **Provider Agnostic**: OpenAI, Claude or a local Ollama server behind one `Summarizer`
//! - **Spoken Summaries**: OpenAI text-to-speech, written atomically as mp3
//! - **Playlists**: a file of URLs processed one after another

pub mod agent;
pub mod config;
pub mod filename;
pub mod pipeline;
pub mod player;
pub mod scraper;
pub mod speech;
pub mod storage;
pub mod summary;
pub mod ui;

pub use agent::{Backend, LlmClient, Summarizer};
pub use config::Config;
pub use filename::generate_filename_from_url;
pub use pipeline::{JobError, Pipeline, RunOptions, Stages};
pub use scraper::{estimate_tokens, word_count};
pub use summary::Summary;
