//! Output file naming.
//!
//! Derives a short, descriptive and filesystem-safe name from a page URL:
//! `https://example.com/a/b?x=1&y=2` becomes `example_a_b_1_2.mp3`.

use reqwest::Url;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extension of every synthesized audio file
pub const AUDIO_EXTENSION: &str = "mp3";

/// Maximum length of a single name component
pub const MAX_COMPONENT_LEN: usize = 10;

/// Number of leading path segments that make it into the name
const PATH_SEGMENTS: usize = 2;

const FALLBACK_NAME: &str = "page";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilenameError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("URL has no host: {0}")]
    MissingHost(String),
    #[error("malformed query parameter '{param}' in {url} (expected key=value)")]
    MalformedQuery { url: String, param: String },
}

/// Keep ASCII alphanumerics only and cut the result to `max_len` characters.
pub fn clean_and_shorten_text(text: &str, max_len: usize) -> String {
    text.chars()
        .filter(char::is_ascii_alphanumeric)
        .take(max_len)
        .collect()
}

/// Build `<domain>_<seg1>_<seg2>_<query values...>.mp3` from a URL.
pub fn generate_filename_from_url(url: &str) -> Result<String, FilenameError> {
    let parsed = Url::parse(url).map_err(|e| FilenameError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| FilenameError::MissingHost(url.to_string()))?;

    let mut parts = vec![domain_label(host).to_string()];

    if let Some(segments) = parsed.path_segments() {
        parts.extend(
            segments
                .filter(|s| !s.is_empty())
                .take(PATH_SEGMENTS)
                .map(str::to_string),
        );
    }

    if let Some(query) = parsed.query() {
        parts.extend(query_values(url, query)?);
    }

    let mut name = parts
        .iter()
        .map(|p| clean_and_shorten_text(p, MAX_COMPONENT_LEN))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    if name.is_empty() {
        name = FALLBACK_NAME.to_string();
    }

    Ok(format!("{name}.{AUDIO_EXTENSION}"))
}

/// Where the audio for `url` goes. A fixed filename is taken verbatim.
pub fn resolve_output_path(
    output_dir: &Path,
    url: &str,
    fixed_filename: Option<&str>,
) -> Result<PathBuf, FilenameError> {
    let name = match fixed_filename {
        Some(fixed) => fixed.to_string(),
        None => generate_filename_from_url(url)?,
    };
    Ok(output_dir.join(name))
}

/// The meaningful part of a host: `news` for `news.ycombinator.com` is skipped
/// in favour of the label left of the TLD.
fn domain_label(host: &str) -> &str {
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    match labels.len() {
        0 => host,
        1 => labels[0],
        n => labels[n - 2],
    }
}

fn query_values(url: &str, query: &str) -> Result<Vec<String>, FilenameError> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((_, value)) => Ok(value.to_string()),
            None => Err(FilenameError::MalformedQuery {
                url: url.to_string(),
                param: pair.to_string(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_drops_punctuation_and_truncates() {
        assert_eq!(clean_and_shorten_text("item-id.html", 10), "itemidhtml");
        assert_eq!(clean_and_shorten_text("abcdefghijklmnop", 10), "abcdefghij");
        assert_eq!(clean_and_shorten_text("--", 10), "");
    }

    #[test]
    fn domain_label_picks_second_level() {
        assert_eq!(domain_label("news.ycombinator.com"), "ycombinator");
        assert_eq!(domain_label("example.com"), "example");
        assert_eq!(domain_label("localhost"), "localhost");
    }

    #[test]
    fn example_url_scenario() {
        assert_eq!(
            generate_filename_from_url("https://example.com/a/b?x=1&y=2").unwrap(),
            "example_a_b_1_2.mp3"
        );
    }

    #[test]
    fn hacker_news_item() {
        assert_eq!(
            generate_filename_from_url("https://news.ycombinator.com/item?id=39765718").unwrap(),
            "ycombinato_item_39765718.mp3"
        );
    }

    #[test]
    fn only_two_path_segments_are_used() {
        assert_eq!(
            generate_filename_from_url("https://blog.rust-lang.org/2024/03/21/Rust-1.77.0.html")
                .unwrap(),
            "rustlang_2024_03.mp3"
        );
    }

    #[test]
    fn query_without_value_separator_is_an_input_error() {
        let err = generate_filename_from_url("https://example.com/a?flag").unwrap_err();
        assert_eq!(
            err,
            FilenameError::MalformedQuery {
                url: "https://example.com/a?flag".to_string(),
                param: "flag".to_string(),
            }
        );
    }

    #[test]
    fn unparsable_url_is_an_input_error() {
        assert!(matches!(
            generate_filename_from_url("not a url"),
            Err(FilenameError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn host_only_url() {
        assert_eq!(
            generate_filename_from_url("https://www.example.org/").unwrap(),
            "example.mp3"
        );
    }

    #[test]
    fn fixed_filename_bypasses_sanitizer() {
        let dir = Path::new("/out");
        let path =
            resolve_output_path(dir, "https://example.com/a?flag", Some("my show.mp3")).unwrap();
        assert_eq!(path, PathBuf::from("/out/my show.mp3"));
    }
}
