use async_trait::async_trait;
use readit::agent::{AgentError, Backend, Summarizer};
use readit::pipeline::{JobError, Pipeline, RunOptions, Stages};
use readit::player::{AudioPlayer, PlaybackError};
use readit::scraper::{ContentFetcher, FetchError, HttpFetcher, WebContent};
use readit::speech::{SpeechError, SpeechSynthesizer};
use readit::ui::StatusReporter;
use readit::Summary;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Everything the fakes were asked to do, in order.
#[derive(Default)]
struct Log {
    fetched: Vec<String>,
    summarized: Vec<String>,
    synthesized: Vec<PathBuf>,
    played: Vec<PathBuf>,
    status: Vec<String>,
}

type SharedLog = Arc<Mutex<Log>>;

struct FakeFetcher {
    log: SharedLog,
    failing: Vec<String>,
}

#[async_trait]
impl ContentFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<WebContent, FetchError> {
        self.log.lock().unwrap().fetched.push(url.to_string());
        if self.failing.iter().any(|f| f == url) {
            return Err(FetchError::NoContent(url.to_string()));
        }
        Ok(WebContent {
            url: url.to_string(),
            title: Some(format!("Title of {url}")),
            text: format!("text of {url} with some words"),
        })
    }
}

/// Keeps the plain status lines, ignores spinner traffic.
struct RecordingStatus {
    log: SharedLog,
}

impl StatusReporter for RecordingStatus {
    fn info(&self, message: &str) {
        self.log.lock().unwrap().status.push(message.to_string());
    }
    fn start(&self, _message: &str) {}
    fn update(&self, _message: &str) {}
    fn stop(&self, _message: &str) {}
    fn fail(&self, _message: &str) {}
}

struct FakeSummarizer {
    log: SharedLog,
    fail: bool,
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, text: &str) -> Result<Summary, AgentError> {
        self.log.lock().unwrap().summarized.push(text.to_string());
        if self.fail {
            return Err(AgentError::EmptyResponse(Backend::Claude));
        }
        Ok(Summary::new("A tidy summary.", "fake-model", Backend::Claude))
    }
}

struct FakeSynthesizer {
    log: SharedLog,
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str, output: &Path) -> Result<PathBuf, SpeechError> {
        self.log.lock().unwrap().synthesized.push(output.to_path_buf());
        std::fs::create_dir_all(output.parent().unwrap()).unwrap();
        std::fs::write(output, text).unwrap();
        Ok(output.to_path_buf())
    }
}

struct FakePlayer {
    log: SharedLog,
    fail: bool,
}

#[async_trait]
impl AudioPlayer for FakePlayer {
    async fn play(&self, path: &Path) -> Result<(), PlaybackError> {
        self.log.lock().unwrap().played.push(path.to_path_buf());
        if self.fail {
            return Err(PlaybackError::Task("no device".to_string()));
        }
        Ok(())
    }
}

struct Harness {
    log: SharedLog,
    output: TempDir,
    failing_urls: Vec<String>,
    summarizer_fails: bool,
    player_fails: bool,
}

impl Harness {
    fn new() -> Self {
        Self {
            log: SharedLog::default(),
            output: TempDir::new().unwrap(),
            failing_urls: Vec::new(),
            summarizer_fails: false,
            player_fails: false,
        }
    }

    fn stages(&self, fetcher: Box<dyn ContentFetcher>) -> Stages {
        Stages {
            fetcher,
            summarizer: Box::new(FakeSummarizer {
                log: self.log.clone(),
                fail: self.summarizer_fails,
            }),
            synthesizer: Box::new(FakeSynthesizer {
                log: self.log.clone(),
            }),
            player: Box::new(FakePlayer {
                log: self.log.clone(),
                fail: self.player_fails,
            }),
            status: Box::new(RecordingStatus {
                log: self.log.clone(),
            }),
        }
    }

    fn pipeline(&self, options: RunOptions) -> Pipeline {
        let fetcher = Box::new(FakeFetcher {
            log: self.log.clone(),
            failing: self.failing_urls.clone(),
        });
        self.pipeline_with(fetcher, options)
    }

    fn pipeline_with(&self, fetcher: Box<dyn ContentFetcher>, options: RunOptions) -> Pipeline {
        Pipeline::new(
            self.stages(fetcher),
            self.output.path().to_path_buf(),
            PathBuf::from("sounds"),
            options,
        )
    }

    fn files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.output.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

fn silent() -> RunOptions {
    RunOptions {
        silent: true,
        ..RunOptions::default()
    }
}

#[tokio::test]
async fn single_job_runs_every_stage_in_order() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(silent());

    let report = pipeline.run_job("https://example.com/a/b?x=1&y=2").await.unwrap();

    let expected = harness.output.path().join("example_a_b_1_2.mp3");
    assert_eq!(report.audio_path, expected);
    assert!(report.played);
    assert_eq!(report.summary_path, None);
    assert_eq!(report.summary_words, 3);

    let log = harness.log.lock().unwrap();
    assert_eq!(log.fetched, vec!["https://example.com/a/b?x=1&y=2"]);
    assert_eq!(log.summarized, vec!["text of https://example.com/a/b?x=1&y=2 with some words"]);
    assert_eq!(log.synthesized, vec![expected.clone()]);
    assert_eq!(log.played, vec![expected]);
}

#[tokio::test]
async fn page_title_and_counts_are_reported() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(silent());

    pipeline.run_job("https://example.com/a").await.unwrap();

    let log = harness.log.lock().unwrap();
    assert!(log.status.contains(&"Title: Title of https://example.com/a".to_string()));
    assert!(log.status.contains(&"Word count from page: 6".to_string()));
    let title_at = log.status.iter().position(|line| line.starts_with("Title:"));
    let count_at = log.status.iter().position(|line| line.starts_with("Word count"));
    assert!(title_at < count_at);
}

#[tokio::test]
async fn notification_cues_play_unless_silent() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(RunOptions::default());

    let report = pipeline.run_job("https://example.com/a").await.unwrap();

    let log = harness.log.lock().unwrap();
    assert_eq!(
        log.played,
        vec![
            PathBuf::from("sounds/gettingcontent.mp3"),
            PathBuf::from("sounds/summary.mp3"),
            PathBuf::from("sounds/genaudio.mp3"),
            report.audio_path,
        ]
    );
}

#[tokio::test]
async fn download_only_still_plays_cues_but_not_the_result() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(RunOptions {
        download_only: true,
        ..RunOptions::default()
    });

    let report = pipeline.run_job("https://example.com/a").await.unwrap();

    assert!(!report.played);
    assert!(report.audio_path.exists());
    let log = harness.log.lock().unwrap();
    assert_eq!(log.played.len(), 3);
    assert!(!log.played.contains(&report.audio_path));
}

#[tokio::test]
async fn fixed_filename_is_used_verbatim() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(RunOptions {
        fixed_filename: Some("latest.mp3".to_string()),
        save_summaries: true,
        ..silent()
    });

    for url in ["https://example.com/a?x=1", "https://other.org/zzz/yyy"] {
        let report = pipeline.run_job(url).await.unwrap();
        assert_eq!(report.audio_path, harness.output.path().join("latest.mp3"));
    }
    assert_eq!(harness.files(), vec!["latest.mp3", "latest.txt"]);
}

#[tokio::test]
async fn save_summaries_writes_sibling_text_file() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(RunOptions {
        save_summaries: true,
        ..silent()
    });

    let report = pipeline.run_job("https://example.com/a/b").await.unwrap();

    let summary_path = report.summary_path.unwrap();
    assert_eq!(summary_path, harness.output.path().join("example_a_b.txt"));
    assert_eq!(std::fs::read_to_string(summary_path).unwrap(), "A tidy summary.");
}

#[tokio::test]
async fn playback_failure_does_not_fail_the_job() {
    let mut harness = Harness::new();
    harness.player_fails = true;
    let pipeline = harness.pipeline(RunOptions::default());

    let report = pipeline.run_job("https://example.com/a").await.unwrap();

    assert!(!report.played);
    assert!(report.audio_path.exists());
}

#[tokio::test]
async fn provider_failure_aborts_the_job_before_synthesis() {
    let mut harness = Harness::new();
    harness.summarizer_fails = true;
    let pipeline = harness.pipeline(silent());

    let err = pipeline.run_job("https://example.com/a").await.unwrap_err();

    assert!(matches!(err, JobError::Summarize(_)));
    assert!(harness.log.lock().unwrap().synthesized.is_empty());
    assert!(harness.files().is_empty());
}

#[tokio::test]
async fn malformed_query_fails_fast_without_fetching() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(silent());

    let err = pipeline.run_job("https://example.com/a?flag").await.unwrap_err();

    assert!(matches!(err, JobError::Input(_)));
    assert!(harness.log.lock().unwrap().fetched.is_empty());
}

#[tokio::test]
async fn unreachable_host_skips_job_and_writes_nothing() {
    let harness = Harness::new();
    let pipeline = harness.pipeline_with(
        Box::new(HttpFetcher::new().unwrap()),
        RunOptions {
            save_summaries: true,
            ..silent()
        },
    );

    let err = pipeline.run_job("http://127.0.0.1:1/page").await.unwrap_err();

    assert!(matches!(err, JobError::Fetch(FetchError::Request { .. })));
    let log = harness.log.lock().unwrap();
    assert!(log.summarized.is_empty());
    assert!(log.synthesized.is_empty());
    drop(log);
    assert!(harness.files().is_empty());
}

#[tokio::test]
async fn playlist_runs_each_non_empty_line_in_order() {
    let harness = Harness::new();
    let playlist_dir = TempDir::new().unwrap();
    let playlist = playlist_dir.path().join("list.txt");
    std::fs::write(
        &playlist,
        "https://one.com/a\n\nhttps://two.com/b\n   \nhttps://three.com/c\nhttps://one.com/a\n",
    )
    .unwrap();

    let pipeline = harness.pipeline(silent());
    let report = pipeline.run_playlist(&playlist).await.unwrap();

    assert!(report.all_succeeded());
    assert_eq!(report.total(), 4);
    let log = harness.log.lock().unwrap();
    assert_eq!(
        log.fetched,
        vec![
            "https://one.com/a",
            "https://two.com/b",
            "https://three.com/c",
            "https://one.com/a",
        ]
    );
    assert_eq!(log.synthesized.len(), 4);
}

#[tokio::test]
async fn playlist_skips_failed_jobs_and_continues() {
    let mut harness = Harness::new();
    harness.failing_urls = vec!["https://two.com/b".to_string()];
    let playlist_dir = TempDir::new().unwrap();
    let playlist = playlist_dir.path().join("list.txt");
    std::fs::write(
        &playlist,
        "https://one.com/a\nhttps://two.com/b\nhttps://three.com/c\n",
    )
    .unwrap();

    let pipeline = harness.pipeline(silent());
    let report = pipeline.run_playlist(&playlist).await.unwrap();

    assert!(!report.all_succeeded());
    assert_eq!(report.completed.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "https://two.com/b");
    assert!(matches!(report.failed[0].1, JobError::Fetch(_)));
    assert_eq!(harness.files(), vec!["one_a.mp3", "three_c.mp3"]);
}
