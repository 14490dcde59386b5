//! HTTP clients for the Gemini text and Imagen image endpoints.

use std::time::Instant;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};
use url::Url;

use crate::{
    application::generative::{GenAiError, ImageGenerator, TextGenerator, Turn},
    config::AiSettings,
    infra::error::InfraError,
};

const API_KEY_HEADER: &str = "x-goog-api-key";

fn build_http_client(settings: &AiSettings) -> Result<Client, InfraError> {
    Client::builder()
        .user_agent(concat!("bookwright/", env!("CARGO_PKG_VERSION")))
        .timeout(settings.request_timeout)
        .build()
        .map_err(|err| InfraError::configuration(format!("failed to build HTTP client: {err}")))
}

fn model_endpoint(base: &Url, model: &str, method: &str) -> Result<Url, InfraError> {
    // A leading `./` keeps `model:method` from parsing as a URL scheme.
    base.join(&format!("./{model}:{method}")).map_err(|err| {
        InfraError::configuration(format!("invalid endpoint for model `{model}`: {err}"))
    })
}

/// Text generation through `models/{model}:generateContent`.
#[derive(Debug, Clone)]
pub struct GeminiTextClient {
    http: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl GeminiTextClient {
    pub fn new(settings: &AiSettings) -> Result<Self, InfraError> {
        Ok(Self {
            http: build_http_client(settings)?,
            endpoint: model_endpoint(&settings.api_base_url, &settings.text_model, "generateContent")?,
            api_key: settings.gemini_api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call(&self, request: &GenerateContentRequest<'_>) -> Result<String, GenAiError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GenAiError::MissingCredential { service: "gemini" })?;

        let started_at = Instant::now();
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(API_KEY_HEADER, api_key)
            .json(request)
            .send()
            .await
            .map_err(GenAiError::transport)?;
        let body = read_success_body(response).await?;

        let text = extract_candidate_text(&body)?;
        info!(
            target = "bookwright::infra::gemini",
            op = "gemini::generate_content",
            result = "ok",
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            response_chars = text.chars().count(),
            "Gemini call completed"
        );
        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for GeminiTextClient {
    async fn generate_text(&self, turns: &[Turn]) -> Result<String, GenAiError> {
        let request = GenerateContentRequest {
            contents: turns,
            generation_config: GenerationConfig {
                response_mime_type: "text/plain",
                response_schema: None,
            },
        };
        self.call(&request).await
    }

    async fn generate_json(&self, turns: &[Turn], schema: &Value) -> Result<Value, GenAiError> {
        let request = GenerateContentRequest {
            contents: turns,
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: Some(schema),
            },
        };
        let text = self.call(&request).await?;
        serde_json::from_str(&text)
            .map_err(|err| GenAiError::malformed(format!("structured output is not JSON: {err}")))
    }
}

/// Image generation through `models/{model}:predict`.
#[derive(Debug, Clone)]
pub struct ImagenClient {
    http: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl ImagenClient {
    pub fn new(settings: &AiSettings) -> Result<Self, InfraError> {
        Ok(Self {
            http: build_http_client(settings)?,
            endpoint: model_endpoint(&settings.api_base_url, &settings.image_model, "predict")?,
            api_key: settings.imagen_api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ImageGenerator for ImagenClient {
    async fn generate_image(&self, prompt: &str) -> Result<String, GenAiError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GenAiError::MissingCredential { service: "imagen" })?;

        let started_at = Instant::now();
        let payload = json!({
            "instances": [{"prompt": prompt}],
            "parameters": {"sampleCount": 1}
        });
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(API_KEY_HEADER, api_key)
            .json(&payload)
            .send()
            .await
            .map_err(GenAiError::transport)?;
        let body = read_success_body(response).await?;

        let data_uri = extract_image_data_uri(&body)?;
        info!(
            target = "bookwright::infra::gemini",
            op = "imagen::predict",
            result = "ok",
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            data_uri_bytes = data_uri.len(),
            "Imagen call completed"
        );
        Ok(data_uri)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: &'a [Turn],
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<&'a Value>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

async fn read_success_body(response: Response) -> Result<String, GenAiError> {
    let status = response.status();
    let body = response.text().await.map_err(GenAiError::transport)?;
    if status.is_success() {
        return Ok(body);
    }

    let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(body);
    warn!(
        target = "bookwright::infra::gemini",
        op = "gemini::read_response",
        result = "error",
        status = status.as_u16(),
        error = %message,
        "Upstream model returned an error status"
    );
    Err(GenAiError::Upstream {
        status: status.as_u16(),
        message,
    })
}

fn extract_candidate_text(body: &str) -> Result<String, GenAiError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|err| GenAiError::malformed(format!("unexpected response body: {err}")))?;

    let text = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text);

    match (text, parsed.error) {
        (Some(text), _) => Ok(text.trim().to_string()),
        (None, Some(error)) => Err(GenAiError::malformed(format!(
            "no candidates returned: {}",
            error.message
        ))),
        (None, None) => Err(GenAiError::malformed("no candidates returned")),
    }
}

fn extract_image_data_uri(body: &str) -> Result<String, GenAiError> {
    let parsed: PredictResponse = serde_json::from_str(body)
        .map_err(|err| GenAiError::malformed(format!("unexpected response body: {err}")))?;

    let prediction = parsed
        .predictions
        .into_iter()
        .next()
        .ok_or_else(|| GenAiError::malformed("no predictions returned"))?;
    let encoded = prediction
        .bytes_base64_encoded
        .filter(|encoded| !encoded.is_empty())
        .ok_or_else(|| GenAiError::malformed("prediction carries no image bytes"))?;
    STANDARD
        .decode(encoded.as_bytes())
        .map_err(|err| GenAiError::malformed(format!("image bytes are not base64: {err}")))?;

    let mime = prediction.mime_type.unwrap_or_else(|| "image/png".to_string());
    Ok(format!("data:{mime};base64,{encoded}"))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn settings() -> AiSettings {
        AiSettings {
            gemini_api_key: None,
            imagen_api_key: None,
            api_base_url: Url::parse("https://generativelanguage.googleapis.com/v1beta/models/")
                .unwrap(),
            text_model: "gemini-pro".to_string(),
            image_model: "imagen-3.0-generate-002".to_string(),
            request_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn endpoints_append_model_and_method() {
        let text = GeminiTextClient::new(&settings()).unwrap();
        let image = ImagenClient::new(&settings()).unwrap();

        assert_eq!(
            text.endpoint().as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent"
        );
        assert_eq!(
            image.endpoint().as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/imagen-3.0-generate-002:predict"
        );
    }

    #[tokio::test]
    async fn missing_keys_short_circuit() {
        let text = GeminiTextClient::new(&settings()).unwrap();
        let image = ImagenClient::new(&settings()).unwrap();

        let err = text.generate_text(&[Turn::user("hi")]).await.unwrap_err();
        assert!(matches!(err, GenAiError::MissingCredential { service: "gemini" }));
        let err = image.generate_image("a cat").await.unwrap_err();
        assert!(matches!(err, GenAiError::MissingCredential { service: "imagen" }));
    }

    #[test]
    fn request_body_matches_wire_format() {
        let schema = json!({"type": "OBJECT"});
        let turns = [Turn::user("hello")];
        let request = GenerateContentRequest {
            contents: &turns,
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: Some(&schema),
            },
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "contents": [{"role": "user", "parts": [{"text": "hello"}]}],
                "generationConfig": {
                    "responseMimeType": "application/json",
                    "responseSchema": {"type": "OBJECT"}
                }
            })
        );
    }

    #[test]
    fn extracts_first_candidate_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"  <p>ok</p>\n"}]}}]}"#;
        assert_eq!(extract_candidate_text(body).unwrap(), "<p>ok</p>");
    }

    #[test]
    fn reports_upstream_error_message_without_candidates() {
        let body = r#"{"error":{"message":"quota exceeded"}}"#;
        let err = extract_candidate_text(body).unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));

        let err = extract_candidate_text("not json").unwrap_err();
        assert!(matches!(err, GenAiError::MalformedResponse(_)));
    }

    #[test]
    fn builds_data_uri_from_prediction() {
        let body = r#"{"predictions":[{"bytesBase64Encoded":"aGVsbG8="}]}"#;
        assert_eq!(
            extract_image_data_uri(body).unwrap(),
            "data:image/png;base64,aGVsbG8="
        );

        let body = r#"{"predictions":[{"bytesBase64Encoded":"!!!"}]}"#;
        assert!(extract_image_data_uri(body).is_err());
        assert!(extract_image_data_uri(r#"{"predictions":[]}"#).is_err());
    }
}
