//! Book style options.
//!
//! Callers send a partial [`StyleOverrides`] bag using the camelCase keys the
//! editor front-end has always used. [`StyleConfiguration::resolve`] folds it
//! over the built-in defaults so every option the document template reads is
//! defined. Values are passed through verbatim; a malformed colour stays
//! malformed.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

macro_rules! style_options {
    ($title:ident; $( $(#[$doc:meta])* $field:ident => $key:literal = $default:expr ),+ $(,)?) => {
        /// Partial style settings as supplied by a caller or suggested by the text model.
        ///
        /// Unknown keys are ignored during deserialisation.
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct StyleOverrides {
            $(
                #[serde(
                    rename = $key,
                    default,
                    deserialize_with = "lenient_string",
                    skip_serializing_if = "Option::is_none"
                )]
                pub $field: Option<String>,
            )+
        }

        impl StyleOverrides {
            /// Wire names of every recognised option, in declaration order.
            pub const KEYS: &'static [&'static str] = &[$($key),+];

            /// True when no option carries a value.
            pub fn is_empty(&self) -> bool {
                true $(&& self.$field.is_none())+
            }
        }

        /// Fully-resolved style settings consumed by the document template.
        #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
        pub struct StyleConfiguration {
            $(
                $(#[$doc])*
                #[serde(rename = $key)]
                pub $field: String,
            )+
        }

        impl StyleConfiguration {
            /// Merge `overrides` over the defaults. `title` feeds the running header default.
            pub fn resolve(overrides: &StyleOverrides, $title: &str) -> Self {
                Self {
                    $( $field: pick(overrides.$field.as_deref(), $default), )+
                }
            }
        }
    };
}

style_options! {
    title;
    text_color => "textColor" = "#000000",
    background_color => "backgroundColor" = "#ffffff",
    font_family => "fontFamily" = "Inter, Arial, sans-serif",
    font_size => "fontSize" = "12pt",
    line_height => "lineHeight" = "1.5",
    text_align => "textAlign" = "right",
    title_color => "titleColor" = "#333333",
    title_font_size => "titleFontSize" = "36pt",
    page_margin_top => "pageMarginTop" = "20mm",
    page_margin_bottom => "pageMarginBottom" = "20mm",
    page_margin_left => "pageMarginLeft" = "20mm",
    page_margin_right => "pageMarginRight" = "20mm",
    paragraph_spacing => "paragraphSpacing" = "1em",
    paragraph_indent => "paragraphIndent" = "1.5em",
    heading1_font_size => "heading1FontSize" = "24pt",
    heading2_font_size => "heading2FontSize" = "18pt",
    heading_color => "headingColor" = "#444444",
    heading1_alignment => "heading1Alignment" = "center",
    heading2_alignment => "heading2Alignment" = "right",
    cover_width => "coverWidth" = "80%",
    cover_height => "coverHeight" = "70%",
    cover_border_radius => "coverBorderRadius" = "15px",
    cover_shadow => "coverShadow" = "0 10px 20px rgba(0,0,0,0.25)",
    /// Defaults to the book title.
    header_text => "headerText" = title,
    footer_text => "footerText" = "صانع الكتب الذكي",
    /// Placement of inline images that carry no `align-*` class.
    image_alignment => "imageAlignment" = "center",
    header_font_size => "headerFontSize" = "10pt",
    footer_font_size => "footerFontSize" = "10pt",
    header_color => "headerColor" = "#888",
    footer_color => "footerColor" = "#888",
    back_cover_font_size => "backCoverFontSize" = "12pt",
    back_cover_text_color => "backCoverTextColor" = "#000000",
    back_cover_background_color => "backCoverBackgroundColor" = "#ffffff",
}

impl StyleConfiguration {
    /// Style with every option at its default.
    pub fn defaults(title: &str) -> Self {
        Self::resolve(&StyleOverrides::default(), title)
    }

    /// CSS `margin` shorthand placing an unclassed inline image.
    pub fn image_margin(&self) -> &'static str {
        match self.image_alignment.trim().to_ascii_lowercase().as_str() {
            "left" => "1em auto 1em 0",
            "right" => "1em 0 1em auto",
            _ => "1em auto",
        }
    }
}

fn pick(value: Option<&str>, default: &str) -> String {
    match value {
        Some(value) if !value.trim().is_empty() => value.to_string(),
        _ => default.to_string(),
    }
}

/// Accept strings, numbers and booleans; anything else reads as "not set".
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        _ => None,
    })
}
