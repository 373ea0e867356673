//! readit CLI - Read it to me
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments and handling top-level errors.

use anyhow::Context;
use clap::{ArgGroup, Parser};
use colored::Colorize;
use readit::pipeline::{JobReport, PlaylistError, PlaylistReport};
use readit::ui::ConsoleStatus;
use readit::{Config, JobError, Pipeline, RunOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// How a run ended, mapped onto the process exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    JobFailed,
    ConfigError,
    PlaylistUnreadable,
}

impl Outcome {
    fn code(self) -> u8 {
        match self {
            Outcome::Success => 0,
            Outcome::JobFailed => 1,
            Outcome::ConfigError => 2,
            Outcome::PlaylistUnreadable => 3,
        }
    }

    fn of_job(result: &Result<JobReport, JobError>) -> Self {
        match result {
            Ok(_) => Outcome::Success,
            Err(_) => Outcome::JobFailed,
        }
    }

    /// Any failed entry fails the whole run.
    fn of_playlist(result: &Result<PlaylistReport, PlaylistError>) -> Self {
        match result {
            Ok(report) if report.all_succeeded() => Outcome::Success,
            Ok(_) => Outcome::JobFailed,
            Err(_) => Outcome::PlaylistUnreadable,
        }
    }
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        ExitCode::from(outcome.code())
    }
}

/// What a run works through
#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Url(String),
    Playlist(PathBuf),
}

#[derive(Parser)]
#[command(name = "readit")]
#[command(author, version, about = "Summarise a webpage and read the summary aloud", long_about = None)]
#[command(group(ArgGroup::new("source").required(true).multiple(true).args(["url", "playlist"])))]
struct Cli {
    /// URL of the webpage to summarise
    #[arg(long)]
    url: Option<String>,
    /// File with one URL per line (ignored when --url is given)
    #[arg(long)]
    playlist: Option<PathBuf>,
    /// Use this output file name instead of deriving one from the URL
    #[arg(long)]
    fixed_filename: Option<String>,
    /// Also write each summary as a .txt next to its audio
    #[arg(long)]
    save_summaries: bool,
    /// Generate the audio but do not play it
    #[arg(long)]
    download_only: bool,
    /// Do not play notification sounds
    #[arg(long)]
    silent: bool,
    /// Path to config.json
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// `--url` wins when both are given.
    fn source(&self) -> Option<Source> {
        match (&self.url, &self.playlist) {
            (Some(url), _) => Some(Source::Url(url.clone())),
            (None, Some(playlist)) => Some(Source::Playlist(playlist.clone())),
            (None, None) => None,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug,hyper=info,reqwest=info,symphonia=warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,symphonia=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    println!("{}", "READIT To ME".bold());

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(outcome) => return outcome.into(),
    };
    info!(
        "Env: SELECTED_MODEL:{}, AUDIO_VOICE:{}, MAX_TOKENS:{}",
        config.agent.model, config.speech.voice, config.agent.max_tokens
    );

    let Some(source) = cli.source() else {
        eprintln!("{} either --url or --playlist is required", "Error:".red());
        return Outcome::ConfigError.into();
    };
    let options = RunOptions {
        fixed_filename: cli.fixed_filename,
        save_summaries: cli.save_summaries,
        download_only: cli.download_only,
        silent: cli.silent,
    };

    match run(&config, options, source).await {
        Ok(outcome) => outcome.into(),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red(), e);
            Outcome::JobFailed.into()
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, Outcome> {
    Config::load(path).map_err(|e| {
        eprintln!("{} {}", "Configuration error:".red(), e);
        Outcome::ConfigError
    })
}

async fn run(config: &Config, options: RunOptions, source: Source) -> anyhow::Result<Outcome> {
    let pipeline = Pipeline::from_config(config, options, Box::new(ConsoleStatus::new()))
        .context("failed to build HTTP clients")?;

    let outcome = match source {
        Source::Url(url) => {
            let result = pipeline.run_job(&url).await;
            match &result {
                Ok(report) => info!("Finished {} -> {}", report.url, report.audio_path.display()),
                Err(e) => eprintln!("{} {}", "Job failed:".red(), e),
            }
            Outcome::of_job(&result)
        }
        Source::Playlist(path) => {
            let result = pipeline.run_playlist(&path).await;
            match &result {
                Ok(report) => {
                    println!(
                        "{} of {} playlist entries done",
                        report.completed.len(),
                        report.total()
                    );
                    for (url, e) in &report.failed {
                        eprintln!("{} {} ({})", "Failed:".red(), url, e);
                    }
                }
                Err(e) => eprintln!("{} {}", "Playlist error:".red(), e),
            }
            Outcome::of_playlist(&result)
        }
    };
    Ok(outcome)
}
