use askama::Template;
use tracing::warn;

use super::{
    headings::index_headings,
    toc::render_toc,
    types::{AssembledBook, DocumentChrome, IndexedContent, RenderError},
};
use crate::domain::{book::BookDocument, style::StyleConfiguration};

#[derive(Template)]
#[template(path = "book/document.html")]
struct DocumentTemplate<'a> {
    doc: &'a BookDocument,
    style: &'a StyleConfiguration,
    chrome: &'a DocumentChrome,
    toc_html: &'a str,
    content_html: &'a str,
    image_margin: &'a str,
}

/// Composes the printable HTML for one book.
#[derive(Debug, Clone, Default)]
pub struct DocumentAssembler {
    chrome: DocumentChrome,
}

impl DocumentAssembler {
    pub fn new(chrome: DocumentChrome) -> Self {
        Self { chrome }
    }

    /// Cover page, optional contents page, body and optional back cover.
    ///
    /// Deterministic: the same document always yields the same bytes.
    pub fn assemble(&self, doc: &BookDocument) -> Result<AssembledBook, RenderError> {
        let indexed = match index_headings(&doc.content_html) {
            Ok(indexed) => indexed,
            Err(err) => {
                warn!(
                    target = "bookwright::render::document",
                    error = %err,
                    "heading indexing failed; using content as-is"
                );
                IndexedContent::passthrough(&doc.content_html)
            }
        };

        let toc_html = render_toc(&indexed.headings, &doc.style, &self.chrome.toc_title)?;

        let template = DocumentTemplate {
            doc,
            style: &doc.style,
            chrome: &self.chrome,
            toc_html: &toc_html,
            content_html: &indexed.html,
            image_margin: doc.style.image_margin(),
        };

        Ok(AssembledBook {
            html: template.render()?,
            headings: indexed.headings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(title: &str, content: &str) -> BookDocument {
        BookDocument {
            title: title.to_string(),
            content_html: content.to_string(),
            cover_image: String::new(),
            back_cover_text: String::new(),
            style: StyleConfiguration::defaults(title),
        }
    }

    #[test]
    fn minimal_book_lists_its_heading_without_back_cover() {
        let assembler = DocumentAssembler::default();
        let assembled = assembler
            .assemble(&book("My Book", "<h1>Intro</h1><p>Hello</p>"))
            .unwrap();

        assert_eq!(assembled.headings.len(), 1);
        assert_eq!(assembled.headings[0].anchor_id, "section-0-Intro");
        assert!(assembled.html.contains(r#"<h1 id="section-0-Intro">Intro</h1>"#));
        assert!(assembled.html.contains(r#"<h1 class="book-title">My Book</h1>"#));
        assert_eq!(assembled.html.matches(r#"<li class="toc-level-"#).count(), 1);
        assert!(
            assembled
                .html
                .contains(r##"<li class="toc-level-1"><a href="#section-0-Intro""##)
        );
        assert!(!assembled.html.contains(r#"class="page back-cover-page""#));
        assert!(!assembled.html.contains("<img"));
        assert!(assembled.html.contains(r#"<span class="page-number"></span>"#));
        assert!(assembled.html.contains("counter(page)"));
        assert!(assembled.html.contains("counter(pages)"));
    }

    #[test]
    fn headingless_content_has_no_toc() {
        let assembled = DocumentAssembler::default()
            .assemble(&book("Plain", "<p>just text</p>"))
            .unwrap();

        assert!(assembled.headings.is_empty());
        assert!(!assembled.html.contains(r#"<h1 class="toc-title">"#));
    }

    #[test]
    fn toc_lists_every_heading_in_order() {
        let assembled = DocumentAssembler::default()
            .assemble(&book("Two", "<h1>A</h1><h2>B</h2><h1>C</h1>"))
            .unwrap();

        assert_eq!(assembled.html.matches(r#"<li class="toc-level-"#).count(), 3);
        assert!(assembled.html.contains(r##"<li class="toc-level-2"><a href="#section-1-B""##));
        assert!(assembled.html.contains(r#"<h1 class="toc-title">جدول المحتويات</h1>"#));
    }

    #[test]
    fn optional_parts_render_when_present() {
        let mut doc = book("Full", "<p>body</p>");
        doc.cover_image = "data:image/png;base64,AAAA".to_string();
        doc.back_cover_text = "The end <b>really</b>".to_string();

        let html = DocumentAssembler::default().assemble(&doc).unwrap().html;

        assert!(html.contains(r#"<img src="data:image/png;base64,AAAA" class="cover-image""#));
        assert!(html.contains(r#"<p class="back-cover-text">The end <b>really</b></p>"#));
    }

    #[test]
    fn style_values_flow_into_stylesheet() {
        let mut doc = book("Styled", "<p>x</p>");
        doc.style.page_margin_top = "35mm".to_string();
        doc.style.image_alignment = "left".to_string();
        doc.style.back_cover_background_color = "#101010".to_string();

        let html = DocumentAssembler::default().assemble(&doc).unwrap().html;

        assert!(html.contains("margin-top: 35mm;"));
        assert!(html.contains("margin: 1em auto 1em 0;"));
        assert!(html.contains("background-color: #101010;"));
    }

    #[test]
    fn chrome_labels_are_configurable() {
        let chrome = DocumentChrome {
            language: "en".to_string(),
            direction: "ltr".to_string(),
            toc_title: "Contents".to_string(),
            author_caption: "By the machine".to_string(),
            page_counter_separator: "of".to_string(),
        };
        let html = DocumentAssembler::new(chrome)
            .assemble(&book("Book", "<h1>One</h1>"))
            .unwrap()
            .html;

        assert!(html.contains(r#"<html lang="en" dir="ltr">"#));
        assert!(html.contains(r#"<h1 class="toc-title">Contents</h1>"#));
        assert!(html.contains(r#"<p class="author">By the machine</p>"#));
        assert!(html.contains(r#"counter(page) " of " counter(pages)"#));
    }

    #[test]
    fn assembly_is_deterministic() {
        let assembler = DocumentAssembler::default();
        let doc = book("Same", "<h1>A</h1><h2>B</h2><p>c</p>");

        let first = assembler.assemble(&doc).unwrap();
        let second = assembler.assemble(&doc).unwrap();
        assert_eq!(first, second);
    }
}
