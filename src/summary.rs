//! Summary struct - the text the LLM hands back for a page.

use crate::agent::Backend;
use crate::scraper::word_count;

/// Plain-text summary produced by one of the summarization backends.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// The summary itself
    pub text: String,
    /// Model that produced it
    pub model: String,
    pub backend: Backend,
}

impl Summary {
    /// Create a new summary
    pub fn new(text: impl Into<String>, model: impl Into<String>, backend: Backend) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
            backend,
        }
    }

    /// Check if the summary has any content
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn word_count(&self) -> usize {
        word_count(&self.text)
    }
}
