//! Local audio playback through rodio.

use async_trait::async_trait;
use rodio::{Decoder, OutputStreamBuilder, Sink};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: rodio::decoder::DecoderError,
    },
    #[error("no audio output device: {0}")]
    Device(#[from] rodio::StreamError),
    #[error("playback task failed: {0}")]
    Task(String),
}

/// Short sounds marking stage transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Fetching,
    Summarizing,
    GeneratingAudio,
}

impl Cue {
    pub fn file_name(&self) -> &'static str {
        match self {
            Cue::Fetching => "gettingcontent.mp3",
            Cue::Summarizing => "summary.mp3",
            Cue::GeneratingAudio => "genaudio.mp3",
        }
    }

    pub fn path_in(&self, sounds_dir: &Path) -> PathBuf {
        sounds_dir.join(self.file_name())
    }
}

/// Plays a local audio file to completion
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play(&self, path: &Path) -> Result<(), PlaybackError>;
}

/// Default output device via rodio.
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioPlayer;

impl RodioPlayer {
    /// Blocks until the whole file has played.
    pub fn play_blocking(path: &Path) -> Result<(), PlaybackError> {
        let file = File::open(path).map_err(|source| PlaybackError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let source = Decoder::new(BufReader::new(file)).map_err(|source| PlaybackError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

        let mut stream = OutputStreamBuilder::open_default_stream()?;
        stream.log_on_drop(false);

        let sink = Sink::connect_new(stream.mixer());
        sink.append(source);
        debug!("Playing {}", path.display());
        sink.sleep_until_end();
        Ok(())
    }
}

#[async_trait]
impl AudioPlayer for RodioPlayer {
    async fn play(&self, path: &Path) -> Result<(), PlaybackError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::play_blocking(&path))
            .await
            .map_err(|e| PlaybackError::Task(e.to_string()))?
    }
}
