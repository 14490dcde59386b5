//! Book document values shared by the render pipeline.

use serde::Serialize;

use super::style::StyleConfiguration;

/// A heading discovered in the book content, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadingEntry {
    /// 1, 2 or 3, from the heading tag name.
    pub level: u8,
    /// Trimmed, entity-decoded heading text.
    pub text: String,
    /// Value of the heading's `id` attribute after indexing.
    pub anchor_id: String,
}

/// Everything one assembly call needs. Lives only for the duration of that call.
#[derive(Debug, Clone)]
pub struct BookDocument {
    pub title: String,
    /// Formatted HTML fragment; trusted and emitted without escaping.
    pub content_html: String,
    /// URL or `data:` reference; empty means no cover image.
    pub cover_image: String,
    /// Empty means no back-cover page.
    pub back_cover_text: String,
    pub style: StyleConfiguration,
}

impl BookDocument {
    pub fn has_cover_image(&self) -> bool {
        !self.cover_image.trim().is_empty()
    }

    pub fn has_back_cover(&self) -> bool {
        !self.back_cover_text.trim().is_empty()
    }
}
