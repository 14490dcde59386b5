//! Authoring helpers backed by the generative collaborators.
//!
//! Every operation here degrades to a fixed fallback instead of failing, so
//! callers always receive a usable value. `Generated::fell_back` tells them
//! whether the model actually answered.

mod prompts;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    application::generative::{
        GenAiError, Generated, ImageGenerator, OrFallback, TextGenerator, Turn,
    },
    domain::style::StyleOverrides,
};

pub const COVER_PROMPT_EXCERPT_CHARS: usize = 10_000;
pub const COVER_PAIR_EXCERPT_CHARS: usize = 4_000;
pub const STYLE_EXCERPT_CHARS: usize = 2_000;
pub const FORMAT_EXCERPT_CHARS: usize = 5_000;

pub const FALLBACK_COVER_PROMPT: &str = "A beautiful abstract book cover with subtle colors.";
pub const FALLBACK_FRONT_COVER_PROMPT: &str = "A generic front cover";
pub const FALLBACK_BACK_COVER_TEXT: &str = "A generic back cover summary.";
pub const FALLBACK_CHAT_REPLY: &str = "عذرا، حدث خطأ اثناء الدردشة مع الذكاء الاصطناعي.";
pub const PLACEHOLDER_COVER_URL: &str =
    "https://placehold.co/600x800/E0E0E0/333333?text=Cover+Placeholder";

/// Front-cover image prompt plus back-cover blurb.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverPair {
    pub front_cover_prompt: String,
    pub back_cover_text: String,
}

impl CoverPair {
    fn fallback() -> Self {
        Self {
            front_cover_prompt: FALLBACK_FRONT_COVER_PROMPT.to_string(),
            back_cover_text: FALLBACK_BACK_COVER_TEXT.to_string(),
        }
    }
}

/// Minimal right-to-left wrapper used when the model cannot format a script.
pub fn fallback_formatted_html(raw: &str) -> String {
    format!("<div dir='rtl' style='text-align: right;'><p>{raw}</p></div>")
}

#[derive(Clone)]
pub struct AuthoringService {
    text: Arc<dyn TextGenerator>,
    images: Arc<dyn ImageGenerator>,
}

impl AuthoringService {
    pub fn new(text: Arc<dyn TextGenerator>, images: Arc<dyn ImageGenerator>) -> Self {
        Self { text, images }
    }

    pub async fn cover_prompt(&self, script: &str) -> Generated<String> {
        let turns = [Turn::user(prompts::cover_prompt(script))];
        non_blank(self.text.generate_text(&turns).await)
            .or_fallback("authoring::cover_prompt", || FALLBACK_COVER_PROMPT.to_string())
    }

    pub async fn cover_pair(&self, content: &str) -> Generated<CoverPair> {
        let turns = [Turn::user(prompts::cover_pair(content))];
        let result = self
            .text
            .generate_json(&turns, &prompts::cover_pair_schema())
            .await
            .and_then(|value| {
                serde_json::from_value::<CoverPair>(value)
                    .map_err(|err| GenAiError::malformed(format!("cover pair: {err}")))
            });
        result.or_fallback("authoring::cover_pair", CoverPair::fallback)
    }

    /// Returns a `data:` URI, or the placeholder picture when generation fails.
    pub async fn cover_image(&self, prompt: &str) -> Generated<String> {
        self.images
            .generate_image(prompt)
            .await
            .or_fallback("authoring::cover_image", || PLACEHOLDER_COVER_URL.to_string())
    }

    pub async fn suggest_style(&self, description: &str) -> Generated<StyleOverrides> {
        let turns = [Turn::user(prompts::style_suggestion(description))];
        let result = self
            .text
            .generate_json(&turns, &prompts::style_schema())
            .await
            .and_then(|value| {
                serde_json::from_value::<StyleOverrides>(value)
                    .map_err(|err| GenAiError::malformed(format!("style suggestion: {err}")))
            });
        let generated = result.or_fallback("authoring::suggest_style", StyleOverrides::default);
        if !generated.fell_back {
            info!(
                target = "bookwright::application::authoring",
                op = "authoring::suggest_style",
                result = "ok",
                empty = generated.value.is_empty(),
                "Style suggestion received"
            );
        }
        generated
    }

    /// Converts a raw script into an HTML fragment suitable for assembly.
    pub async fn format_script(&self, raw: &str) -> Generated<String> {
        let turns = [Turn::user(prompts::format_script(raw))];
        non_blank(self.text.generate_text(&turns).await)
            .or_fallback("authoring::format_script", || fallback_formatted_html(raw))
    }

    /// Continues a conversation with `message` appended as the newest user turn.
    pub async fn chat(&self, message: &str, history: Vec<Turn>) -> Generated<String> {
        let mut turns = history;
        turns.push(Turn::user(message));
        non_blank(self.text.generate_text(&turns).await)
            .or_fallback("authoring::chat", || FALLBACK_CHAT_REPLY.to_string())
    }
}

fn non_blank(result: Result<String, GenAiError>) -> Result<String, GenAiError> {
    result.and_then(|text| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Err(GenAiError::malformed("empty text response"))
        } else {
            Ok(trimmed.to_string())
        }
    })
}
