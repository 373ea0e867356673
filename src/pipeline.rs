//! The read-it-to-me run: fetch, summarize, synthesize and play, once per URL.

use crate::agent::{AgentError, LlmClient, Summarizer};
use crate::config::Config;
use crate::filename::{resolve_output_path, FilenameError};
use crate::player::{AudioPlayer, Cue, RodioPlayer};
use crate::scraper::{estimate_tokens, word_count, ContentFetcher, FetchError, HttpFetcher};
use crate::speech::{OpenAiSpeech, SpeechError, SpeechSynthesizer};
use crate::storage::{self, StorageError};
use crate::ui::StatusReporter;
use std::fmt::Display;
use std::future::Future;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Failures that end a single job
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Input(#[from] FilenameError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("summarization failed: {0}")]
    Summarize(#[from] AgentError),
    #[error("speech synthesis failed: {0}")]
    Speech(#[from] SpeechError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum PlaylistError {
    #[error("cannot read playlist {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Per-run switches from the command line
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Use this file name instead of deriving one from the URL
    pub fixed_filename: Option<String>,
    /// Write the summary next to the audio as `.txt`
    pub save_summaries: bool,
    /// Synthesize but do not play the result
    pub download_only: bool,
    /// No notification cues
    pub silent: bool,
}

/// The external capabilities a job is built from
pub struct Stages {
    pub fetcher: Box<dyn ContentFetcher>,
    pub summarizer: Box<dyn Summarizer>,
    pub synthesizer: Box<dyn SpeechSynthesizer>,
    pub player: Box<dyn AudioPlayer>,
    pub status: Box<dyn StatusReporter>,
}

/// Outcome of one finished job
#[derive(Debug, Clone)]
pub struct JobReport {
    pub url: String,
    pub audio_path: PathBuf,
    pub summary_path: Option<PathBuf>,
    pub page_words: usize,
    pub summary_words: usize,
    pub played: bool,
}

/// Outcome of a playlist run, in playlist order
#[derive(Debug, Default)]
pub struct PlaylistReport {
    pub completed: Vec<JobReport>,
    pub failed: Vec<(String, JobError)>,
}

impl PlaylistReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.completed.len() + self.failed.len()
    }
}

pub struct Pipeline {
    stages: Stages,
    output_dir: PathBuf,
    sounds_dir: PathBuf,
    options: RunOptions,
}

impl Pipeline {
    pub fn new(
        stages: Stages,
        output_dir: PathBuf,
        sounds_dir: PathBuf,
        options: RunOptions,
    ) -> Self {
        Self {
            stages,
            output_dir,
            sounds_dir,
            options,
        }
    }

    /// Wire up the real HTTP backends and the default audio device.
    pub fn from_config(
        config: &Config,
        options: RunOptions,
        status: Box<dyn StatusReporter>,
    ) -> Result<Self, reqwest::Error> {
        let stages = Stages {
            fetcher: Box::new(HttpFetcher::new()?),
            summarizer: Box::new(LlmClient::from_config(config)?),
            synthesizer: Box::new(OpenAiSpeech::from_config(config)?),
            player: Box::new(RodioPlayer),
            status,
        };
        Ok(Self::new(
            stages,
            config.output_dir.clone(),
            config.sounds_dir.clone(),
            options,
        ))
    }

    /// Run every non-empty line of the playlist file, in order. A failed job
    /// is logged and the next one starts.
    pub async fn run_playlist(&self, path: &Path) -> Result<PlaylistReport, PlaylistError> {
        let urls = read_playlist(path)?;
        info!("Playlist {} has {} entries", path.display(), urls.len());

        let mut report = PlaylistReport::default();
        for (index, url) in urls.iter().enumerate() {
            self.stages
                .status
                .info(&format!("[{}/{}] {}", index + 1, urls.len(), url));

            match self.run_job(url).await {
                Ok(job) => report.completed.push(job),
                Err(e) => {
                    warn!("Skipping {url}: {e}");
                    report.failed.push((url.clone(), e));
                }
            }
        }
        Ok(report)
    }

    /// Fetch, summarize, synthesize and (unless download-only) play one URL.
    pub async fn run_job(&self, url: &str) -> Result<JobReport, JobError> {
        let status = self.stages.status.as_ref();

        let audio_path =
            resolve_output_path(&self.output_dir, url, self.options.fixed_filename.as_deref())?;
        status.info(&format!("Output file: {}", audio_path.display()));

        self.cue(Cue::Fetching).await;
        let content = self
            .stage(
                &format!("Fetching {url}"),
                "Page fetched",
                self.stages.fetcher.fetch(url),
            )
            .await
            .inspect_err(|e| warn!("Fetch failed, skipping job: {e}"))?;

        if let Some(title) = &content.title {
            status.info(&format!("Title: {title}"));
        }
        let page_words = word_count(&content.text);
        status.info(&format!("Word count from page: {page_words}"));
        status.info(&format!("Tokens estimate: {}", estimate_tokens(&content.text)));

        self.cue(Cue::Summarizing).await;
        let summary = self
            .stage(
                &format!("Summarizing {url}"),
                "Summary ready",
                self.stages.summarizer.summarize(&content.text),
            )
            .await?;
        status.info(&format!("SUMMARY ({}): {}", summary.model, summary.text));

        let summary_path = if self.options.save_summaries {
            let path = storage::save_summary(&audio_path, &summary.text)?;
            info!("Summary saved to {}", path.display());
            Some(path)
        } else {
            None
        };

        self.cue(Cue::GeneratingAudio).await;
        self.stage(
            "Generating audio",
            "Audio generated",
            self.stages.synthesizer.synthesize(&summary.text, &audio_path),
        )
        .await?;

        let played = if self.options.download_only {
            status.info(&format!("Saved {}", audio_path.display()));
            false
        } else {
            self.stage("Now playing", "Done!", self.stages.player.play(&audio_path))
                .await
                .inspect_err(|e| warn!("Playback failed: {e}"))
                .is_ok()
        };

        Ok(JobReport {
            url: url.to_string(),
            audio_path,
            summary_path,
            page_words,
            summary_words: summary.word_count(),
            played,
        })
    }

    /// Keep the spinner up while `work` runs and close it either way.
    async fn stage<T, E, F>(&self, start: &str, done: &str, work: F) -> Result<T, E>
    where
        E: Display,
        F: Future<Output = Result<T, E>>,
    {
        let status = self.stages.status.as_ref();
        status.start(start);
        let result = work.await;
        match &result {
            Ok(_) => status.stop(done),
            Err(e) => status.fail(&e.to_string()),
        }
        result
    }

    /// Notification sound; failures only warn.
    async fn cue(&self, cue: Cue) {
        if self.options.silent {
            return;
        }
        let path = cue.path_in(&self.sounds_dir);
        if let Err(e) = self.stages.player.play(&path).await {
            warn!("Notification sound {} not played: {e}", path.display());
        }
    }
}

/// URLs of a playlist file, blank lines skipped
pub fn read_playlist(path: &Path) -> Result<Vec<String>, PlaylistError> {
    let content = std::fs::read_to_string(path).map_err(|source| PlaylistError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_playlist(&content))
}

pub fn parse_playlist(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
