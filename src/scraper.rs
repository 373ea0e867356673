//! Web scraping module for content extraction.
//!
//! Uses reqwest for fetching and scraper for HTML parsing.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Desktop browser User-Agent; some sites refuse obvious bots.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";

/// Default timeout for HTTP requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Elements whose text never reaches the reader
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to fetch {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: StatusCode },
    #[error("no readable content found at {0}")]
    NoContent(String),
}

/// Extracted content from a webpage
#[derive(Debug, Clone)]
pub struct WebContent {
    /// The original URL
    pub url: String,
    /// Page title
    pub title: Option<String>,
    /// Visible text, words separated by single spaces
    pub text: String,
}

/// Create a configured HTTP client for scraping
pub fn create_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
}

/// Retrieves a page and returns its readable text
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<WebContent, FetchError>;
}

/// reqwest-backed fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: create_client()?,
        })
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<WebContent, FetchError> {
        fetch_content(&self.client, url).await
    }
}

/// Fetch a URL and reduce its HTML to visible text
pub async fn fetch_content(client: &Client, url: &str) -> Result<WebContent, FetchError> {
    let request_error = |source: reqwest::Error| FetchError::Request {
        url: url.to_string(),
        source,
    };

    let response = client.get(url).send().await.map_err(request_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status,
        });
    }

    let html = response.text().await.map_err(request_error)?;
    debug!("Fetched {} bytes of HTML from {}", html.len(), url);

    let document = Html::parse_document(&html);
    let text = extract_text(&document);

    if text.is_empty() {
        return Err(FetchError::NoContent(url.to_string()));
    }

    Ok(WebContent {
        url: url.to_string(),
        title: extract_title(&document),
        text,
    })
}

/// Extract the page title from <title>
fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<Vec<_>>().join(" "))
        .map(|title| title.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|title| !title.is_empty())
}

/// All text nodes outside script/style, whitespace-normalized
pub fn extract_text(document: &Html) -> String {
    let mut words: Vec<&str> = Vec::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.name()))
        });
        if hidden {
            continue;
        }

        words.extend(text.split_whitespace());
    }

    words.join(" ")
}

/// Number of whitespace-delimited words
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Rough token estimate: one token per four characters of text.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}
