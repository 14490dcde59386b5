//! JSON request and response bodies. Field names follow the browser client.

use serde::{Deserialize, Serialize};

use crate::{application::generative::Turn, domain::style::StyleOverrides};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateBookRequest {
    pub ebook_title: Option<String>,
    pub book_script: Option<String>,
    pub cover_prompt: Option<String>,
    pub user_provided_cover_url: Option<String>,
    pub back_cover_text: Option<String>,
    pub settings: Option<StyleOverrides>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBookResponse {
    pub pdf_url: String,
    pub cover_url: String,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub history: Option<Vec<Turn>>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SuggestStyleRequest {
    pub book_description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuggestStyleResponse {
    pub settings: StyleOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormatScriptRequest {
    pub raw_script: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatScriptResponse {
    pub formatted_html: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoverDescriptionsRequest {
    pub book_content: Option<String>,
}

/// Returns `Some` only when the field holds non-whitespace text.
pub fn present(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_request_reads_camel_case_fields() {
        let request: GenerateBookRequest = serde_json::from_value(serde_json::json!({
            "ebookTitle": "T",
            "bookScript": "S",
            "userProvidedCoverUrl": "https://example.com/c.png",
            "settings": {"textColor": "#111111"}
        }))
        .unwrap();

        assert_eq!(request.ebook_title.as_deref(), Some("T"));
        assert_eq!(request.book_script.as_deref(), Some("S"));
        assert_eq!(
            request.user_provided_cover_url.as_deref(),
            Some("https://example.com/c.png")
        );
        assert_eq!(
            request.settings.unwrap().text_color.as_deref(),
            Some("#111111")
        );
    }

    #[test]
    fn null_and_missing_fields_are_absent() {
        let request: GenerateBookRequest =
            serde_json::from_value(serde_json::json!({"settings": null})).unwrap();
        assert!(request.book_script.is_none());
        assert!(request.settings.is_none());
        assert_eq!(present(Some("  ".to_string())), None);
    }
}
