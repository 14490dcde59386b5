use askama::Error as AskamaError;
use thiserror::Error;

use crate::{config::BookSettings, domain::book::HeadingEntry};

/// Fixed labels and document attributes that frame every book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChrome {
    pub language: String,
    pub direction: String,
    pub toc_title: String,
    pub author_caption: String,
    pub page_counter_separator: String,
}

impl From<&BookSettings> for DocumentChrome {
    fn from(settings: &BookSettings) -> Self {
        Self {
            language: settings.language.clone(),
            direction: settings.direction.clone(),
            toc_title: settings.toc_title.clone(),
            author_caption: settings.author_caption.clone(),
            page_counter_separator: settings.page_counter_separator.clone(),
        }
    }
}

impl Default for DocumentChrome {
    fn default() -> Self {
        Self::from(&BookSettings::default())
    }
}

/// Content fragment after heading ids have been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedContent {
    pub html: String,
    pub headings: Vec<HeadingEntry>,
}

impl IndexedContent {
    /// Untouched fragment with no entries, used when the rewriter gives up.
    pub fn passthrough(html: &str) -> Self {
        Self {
            html: html.to_string(),
            headings: Vec::new(),
        }
    }
}

/// Complete HTML document ready for the rasterizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledBook {
    pub html: String,
    pub headings: Vec<HeadingEntry>,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("document processing failed: {message}")]
    Document { message: String },
    #[error("template rendering failed: {0}")]
    Template(#[from] AskamaError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_keeps_fragment_and_drops_entries() {
        let html = "<h1>Intro</h1><p>unchanged</p>";
        let content = IndexedContent::passthrough(html);

        assert_eq!(content.html, html);
        assert!(content.headings.is_empty());
    }
}
