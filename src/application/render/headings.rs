//! Heading indexing for book content.
//!
//! Runs in two passes over the fragment: a scan that records every `h1`-`h3`
//! in document order, then a rewrite that sets the planned `id` on headings
//! that lack one. Both passes visit headings in the same order, so the
//! traversal index links a planned id to its element.

use std::{cell::RefCell, collections::HashSet, rc::Rc};

use lol_html::{RewriteStrSettings, element, rewrite_str, text};
use tracing::debug;

use super::types::{IndexedContent, RenderError};
use crate::domain::book::HeadingEntry;

const HEADING_SELECTOR: &str = "h1, h2, h3";
const MAX_SLUG_CHARS: usize = 30;

#[derive(Debug, Default)]
struct ScannedHeading {
    level: u8,
    existing_id: Option<String>,
    raw_text: String,
}

#[derive(Debug)]
struct PlannedHeading {
    entry: HeadingEntry,
    assign: bool,
}

/// Assigns anchor ids to every `h1`/`h2`/`h3` and returns them in order.
pub fn index_headings(html: &str) -> Result<IndexedContent, RenderError> {
    let scanned = scan_headings(html)?;
    let planned = plan_anchors(scanned);

    let html = if planned.iter().any(|heading| heading.assign) {
        apply_anchor_ids(html, &planned)?
    } else {
        html.to_string()
    };

    Ok(IndexedContent {
        html,
        headings: planned.into_iter().map(|heading| heading.entry).collect(),
    })
}

/// `section-{index}-{slug}` where the slug keeps ASCII alphanumerics and `_`.
pub fn anchor_id(index: usize, text: &str) -> String {
    let slug: String = text
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .take(MAX_SLUG_CHARS)
        .collect();
    format!("section-{index}-{slug}")
}

fn scan_headings(html: &str) -> Result<Vec<ScannedHeading>, RenderError> {
    let headings = Rc::new(RefCell::new(Vec::<ScannedHeading>::new()));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!(HEADING_SELECTOR, {
                    let headings = Rc::clone(&headings);
                    move |el| {
                        let level = el
                            .tag_name()
                            .strip_prefix('h')
                            .and_then(|value| value.parse::<u8>().ok())
                            .unwrap_or(1);
                        headings.borrow_mut().push(ScannedHeading {
                            level,
                            existing_id: el.get_attribute("id"),
                            raw_text: String::new(),
                        });
                        Ok(())
                    }
                }),
                text!(HEADING_SELECTOR, {
                    let headings = Rc::clone(&headings);
                    move |chunk| {
                        if let Some(current) = headings.borrow_mut().last_mut() {
                            current.raw_text.push_str(chunk.as_str());
                        }
                        Ok(())
                    }
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::Document {
        message: err.to_string(),
    })?;

    Ok(headings.take())
}

fn plan_anchors(scanned: Vec<ScannedHeading>) -> Vec<PlannedHeading> {
    let supplied: HashSet<String> = scanned
        .iter()
        .filter_map(|heading| heading.existing_id.clone())
        .collect();

    scanned
        .into_iter()
        .enumerate()
        .map(|(index, heading)| {
            let text = html_escape::decode_html_entities(&heading.raw_text)
                .trim()
                .to_string();
            let (anchor_id, assign) = match heading.existing_id {
                Some(id) => (id, false),
                None => {
                    let id = anchor_id(index, &text);
                    if supplied.contains(&id) {
                        debug!(
                            target = "bookwright::render::headings",
                            anchor_id = %id,
                            "generated anchor collides with a supplied heading id"
                        );
                    }
                    (id, true)
                }
            };
            PlannedHeading {
                entry: HeadingEntry {
                    level: heading.level,
                    text,
                    anchor_id,
                },
                assign,
            }
        })
        .collect()
}

fn apply_anchor_ids(html: &str, planned: &[PlannedHeading]) -> Result<String, RenderError> {
    let index = Rc::new(RefCell::new(0usize));
    let error_slot = Rc::new(RefCell::new(None));

    let rewritten = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!(HEADING_SELECTOR, {
                let index = Rc::clone(&index);
                let error_slot = Rc::clone(&error_slot);
                move |el| {
                    let mut idx = index.borrow_mut();
                    let Some(heading) = planned.get(*idx) else {
                        *error_slot.borrow_mut() = Some(RenderError::Document {
                            message: "unexpected extra heading".to_string(),
                        });
                        return Ok(());
                    };
                    *idx += 1;

                    if heading.assign {
                        el.set_attribute("id", &heading.entry.anchor_id)?;
                    }
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::Document {
        message: err.to_string(),
    })?;

    if let Some(err) = error_slot.borrow_mut().take() {
        return Err(err);
    }

    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_sequential_ids_across_levels() {
        let indexed =
            index_headings("<h1>Intro</h1><p>x</p><h2>Part One</h2><h3>Deep</h3>").unwrap();

        let ids: Vec<_> = indexed
            .headings
            .iter()
            .map(|h| h.anchor_id.as_str())
            .collect();
        assert_eq!(ids, ["section-0-Intro", "section-1-PartOne", "section-2-Deep"]);
        assert_eq!(
            indexed.headings.iter().map(|h| h.level).collect::<Vec<_>>(),
            [1, 2, 3]
        );
        assert!(indexed.html.contains(r#"<h2 id="section-1-PartOne">Part One</h2>"#));
    }

    #[test]
    fn keeps_supplied_ids_verbatim() {
        let indexed = index_headings(r#"<h1 id="custom">Title</h1><h2>Next</h2>"#).unwrap();

        assert_eq!(indexed.headings[0].anchor_id, "custom");
        assert_eq!(indexed.headings[1].anchor_id, "section-1-Next");
        assert!(indexed.html.contains(r#"<h1 id="custom">"#));
    }

    #[test]
    fn non_ascii_text_yields_bare_prefix() {
        let indexed = index_headings("<h1>مقدمة</h1><h1>الفصل 2</h1>").unwrap();

        assert_eq!(indexed.headings[0].anchor_id, "section-0-");
        assert_eq!(indexed.headings[0].text, "مقدمة");
        assert_eq!(indexed.headings[1].anchor_id, "section-1-2");
    }

    #[test]
    fn decodes_entities_and_nested_markup() {
        let indexed = index_headings("<h2>  Tom &amp; <em>Jerry</em>  </h2>").unwrap();

        assert_eq!(indexed.headings[0].text, "Tom & Jerry");
        assert_eq!(indexed.headings[0].anchor_id, "section-0-TomJerry");
    }

    #[test]
    fn truncates_long_slugs() {
        let long = "a".repeat(50);
        assert_eq!(anchor_id(4, &long), format!("section-4-{}", "a".repeat(30)));
    }

    #[test]
    fn ignores_lower_level_headings() {
        let indexed = index_headings("<h4>Skip</h4><p>body</p>").unwrap();

        assert!(indexed.headings.is_empty());
        assert_eq!(indexed.html, "<h4>Skip</h4><p>body</p>");
    }

    #[test]
    fn tolerates_malformed_markup() {
        let indexed = index_headings("<h1>Open<p>never closed").unwrap();

        assert_eq!(indexed.headings.len(), 1);
        assert!(indexed.headings[0].anchor_id.starts_with("section-0-Open"));
    }
}
