use askama::Template;

use super::types::RenderError;
use crate::domain::{book::HeadingEntry, style::StyleConfiguration};

#[derive(Template)]
#[template(path = "book/toc.html")]
struct TocTemplate<'a> {
    title: &'a str,
    link_color: &'a str,
    entries: &'a [HeadingEntry],
}

/// Renders the table-of-contents page. No headings means no page at all.
pub fn render_toc(
    entries: &[HeadingEntry],
    style: &StyleConfiguration,
    title: &str,
) -> Result<String, RenderError> {
    if entries.is_empty() {
        return Ok(String::new());
    }

    let template = TocTemplate {
        title,
        link_color: &style.text_color,
        entries,
    };
    Ok(template.render()?)
}
