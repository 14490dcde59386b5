//! Prompt text sent to the text model.

use serde_json::{Value, json};

use super::{COVER_PAIR_EXCERPT_CHARS, COVER_PROMPT_EXCERPT_CHARS, FORMAT_EXCERPT_CHARS, STYLE_EXCERPT_CHARS};
use crate::{application::generative::excerpt, domain::style::StyleOverrides};

pub(super) fn cover_prompt(script: &str) -> String {
    format!(
        "Generate a concise, creative, and highly descriptive prompt for the FRONT book cover based on the following book script.
Focus on key visual themes, mood, central elements, and artistic style. This prompt will be used by an advanced AI image generation model like Imagen.
The prompt should be in English and directly usable.

Book script excerpt:
---
{}
---",
        excerpt(script, COVER_PROMPT_EXCERPT_CHARS)
    )
}

pub(super) fn cover_pair(content: &str) -> String {
    format!(
        "You are a creative book cover designer AI. Based on the following book content, generate two distinct, concise, and compelling prompts:
1. `front_cover_prompt`: A prompt suitable for an AI image generation model (like Imagen) for the FRONT cover. Focus on key visual themes, mood, and central elements.
2. `back_cover_text`: A short, engaging summary or blurb for the BACK cover. This should entice readers and capture the essence of the book. It should be plain text, suitable for print.

Provide the output as a JSON object with keys \"front_cover_prompt\" and \"back_cover_text\".
Book Content:
---
{}
---",
        excerpt(content, COVER_PAIR_EXCERPT_CHARS)
    )
}

pub(super) fn cover_pair_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "front_cover_prompt": {"type": "STRING"},
            "back_cover_text": {"type": "STRING"}
        }
    })
}

pub(super) fn style_suggestion(description: &str) -> String {
    let keys = StyleOverrides::KEYS
        .iter()
        .map(|key| format!("- {key}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Based on the following book description, suggest a JSON object containing professional design settings for a book PDF.
Colors are hex codes, sizes carry CSS units (e.g. '12pt', '20mm', '1.5em'), alignments are one of 'right', 'left', 'center' or 'justify',
and fontFamily names a font such as 'Inter' or 'Amiri' for Arabic.
The settings should include:
{keys}

Ensure the JSON is valid and contains all these keys.
Book description: \"{}...\"",
        excerpt(description, STYLE_EXCERPT_CHARS)
    )
}

pub(super) fn style_schema() -> Value {
    let properties = StyleOverrides::KEYS
        .iter()
        .map(|key| ((*key).to_string(), json!({"type": "STRING"})))
        .collect::<serde_json::Map<_, _>>();
    json!({
        "type": "OBJECT",
        "properties": properties
    })
}

pub(super) fn format_script(raw: &str) -> String {
    format!(
        r#"You are a highly skilled professional book formatter and layout designer.
Your task is to convert the following raw book script into perfectly structured and semantically rich HTML, optimized for PDF generation.
Follow these strict guidelines:
1. Identify and use appropriate HTML tags:
   * Main Chapter Titles: Use `<h1>` for primary chapter titles. Each `<h1>` should implicitly start a new page unless it's a very short section.
   * Section Headings: Use `<h2>` for major sections within a chapter.
   * Sub-headings: Use `<h3>` for smaller sub-sections.
   * Paragraphs: Wrap all body text in `<p>` tags.
   * Lists: Use `<ul>` for unordered lists and `<ol>` for ordered lists, with `<li>` for list items.
   * Emphasis: Use `<strong>` for bold text and `<em>` for italic text.
   * Blockquotes: Use `<blockquote>` for quoted passages.
   * Code Blocks: Use `<pre><code>` for code snippets.
   * Tables: If tabular data is present, convert it into standard `<table>`, `<thead>`, `<tbody>`, `<tr>`, `<th>`, `<td>` tags.
2. Ensure correct Arabic text flow: always apply `dir="rtl"` and `text-align: right;` to the main content div or relevant block elements if the content is Arabic, unless a different alignment is explicitly clear.
3. Image Handling: If the raw script includes image URLs (e.g., "Image: [URL_HERE]"), convert them to `<img src="URL" alt="Description">` tags. Assume images should be centered unless context implies otherwise. You can optionally add a `class="align-center"`, `class="align-left"`, or `class="align-right"` based on context, but do not create image URLs.
4. Preserve Content: Maintain the original content, spelling, grammar, and meaning precisely. Do not add any extra commentary or introductory/concluding remarks outside the generated HTML.
5. Clean HTML: Output clean, valid, and well-indented HTML. Do not include `<html>`, `<head>`, or `<body>` tags; only the content that would go inside `<body>`.
6. Remove any markdown-like backticks or formatting indicators: ensure the output is pure HTML.
7. Handle line breaks: convert significant double line breaks into new paragraphs, and treat single line breaks within paragraphs as part of the flow.

Raw Book Script:
---
{}
---

Example of desired HTML structure:
<h1>عنوان الفصل الأول</h1>
<p>هذه فقرة افتتاحية للفصل. إنها طويلة بما يكفي لإظهار التنسيق.</p>

<h2>قسم فرعي 1.1</h2>
<p>فقرة أخرى هنا، تتحدث عن تفاصيل القسم الفرعي.</p>
<ul>
    <li>عنصر قائمة 1</li>
    <li>عنصر قائمة 2</li>
</ul>

<h3>نقطة محددة</h3>
<blockquote>هذا اقتباس مهم من مصدر خارجي. يجب أن يظهر بشكل مميز.</blockquote>

<p>يمكن أن تظهر <strong>الكلمات المهمة</strong> بشكل <em>مشدد</em>.</p>"#,
        excerpt(raw, FORMAT_EXCERPT_CHARS)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_prompt_and_schema_cover_every_key() {
        let prompt = style_suggestion("a calm travel diary");
        let schema = style_schema();
        for key in StyleOverrides::KEYS {
            assert!(prompt.contains(&format!("- {key}")), "prompt misses {key}");
            assert_eq!(schema["properties"][key]["type"], "STRING");
        }
    }

    #[test]
    fn prompts_truncate_long_input() {
        let long = "x".repeat(COVER_PROMPT_EXCERPT_CHARS + 50);
        let prompt = cover_prompt(&long);
        assert!(prompt.contains(&"x".repeat(COVER_PROMPT_EXCERPT_CHARS)));
        assert!(!prompt.contains(&"x".repeat(COVER_PROMPT_EXCERPT_CHARS + 1)));
    }
}
