//! End-to-end book generation: format, cover, assemble, rasterize.

use std::{sync::Arc, time::Instant};

use metrics::{counter, histogram};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::{
    application::{
        authoring::AuthoringService,
        render::{DocumentAssembler, RenderError},
    },
    domain::{
        book::BookDocument,
        error::DomainError,
        style::{StyleConfiguration, StyleOverrides},
    },
    infra::{
        pdf::{RasterizeError, Rasterizer},
        storage::PdfStorage,
    },
};

pub const DEFAULT_BOOK_TITLE: &str = "كتاب بدون عنوان";

pub(crate) const METRIC_BOOKS_GENERATED_TOTAL: &str = "bookwright_books_generated_total";
pub(crate) const METRIC_BOOK_GENERATION_MS: &str = "bookwright_book_generation_ms";

#[derive(Debug, Clone, Default)]
pub struct BookRequest {
    pub title: Option<String>,
    pub script: String,
    pub cover_prompt: Option<String>,
    pub cover_url: Option<String>,
    pub back_cover_text: Option<String>,
    pub settings: StyleOverrides,
}

impl BookRequest {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.script.trim().is_empty() {
            return Err(DomainError::validation("book script is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedBook {
    pub pdf_filename: String,
    pub cover_url: String,
}

#[derive(Debug, Error)]
pub enum BookError {
    #[error(transparent)]
    Invalid(#[from] DomainError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Rasterize(#[from] RasterizeError),
    #[error("rasterization task failed: {0}")]
    Task(String),
}

impl BookError {
    fn kind(&self) -> &'static str {
        match self {
            BookError::Invalid(_) => "invalid_request",
            BookError::Render(_) => "render",
            BookError::Rasterize(_) => "rasterize",
            BookError::Task(_) => "task",
        }
    }
}

#[derive(Clone)]
pub struct BookService {
    authoring: AuthoringService,
    assembler: DocumentAssembler,
    rasterizer: Arc<dyn Rasterizer>,
    storage: PdfStorage,
}

impl BookService {
    pub fn new(
        authoring: AuthoringService,
        assembler: DocumentAssembler,
        rasterizer: Arc<dyn Rasterizer>,
        storage: PdfStorage,
    ) -> Self {
        Self {
            authoring,
            assembler,
            rasterizer,
            storage,
        }
    }

    pub fn authoring(&self) -> &AuthoringService {
        &self.authoring
    }

    pub fn storage(&self) -> &PdfStorage {
        &self.storage
    }

    #[instrument(skip_all, fields(script_chars = request.script.chars().count()))]
    pub async fn generate(&self, request: BookRequest) -> Result<GeneratedBook, BookError> {
        let started_at = Instant::now();
        let result = self.generate_inner(request).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(err) => err.kind(),
        };
        counter!(METRIC_BOOKS_GENERATED_TOTAL, "result" => outcome).increment(1);
        histogram!(METRIC_BOOK_GENERATION_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        match &result {
            Ok(book) => info!(
                target = "bookwright::application::books",
                op = "books::generate",
                result = "ok",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                pdf = %book.pdf_filename,
                "Book generated"
            ),
            Err(err) => warn!(
                target = "bookwright::application::books",
                op = "books::generate",
                result = "error",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                error_code = err.kind(),
                error = %err,
                "Book generation failed"
            ),
        }
        result
    }

    async fn generate_inner(&self, request: BookRequest) -> Result<GeneratedBook, BookError> {
        request.validate()?;

        let title = request
            .title
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BOOK_TITLE.to_string());

        let content_html = self.authoring.format_script(&request.script).await.into_inner();
        let cover_url = self
            .resolve_cover(&request.script, request.cover_url, request.cover_prompt)
            .await;
        let style = StyleConfiguration::resolve(&request.settings, &title);

        let document = BookDocument {
            title,
            content_html,
            cover_image: cover_url.clone(),
            back_cover_text: request.back_cover_text.unwrap_or_default(),
            style,
        };
        let assembled = self.assembler.assemble(&document)?;

        let slot = self.storage.allocate();
        let rasterizer = Arc::clone(&self.rasterizer);
        let destination = slot.path.clone();
        tokio::task::spawn_blocking(move || rasterizer.rasterize(&assembled.html, &destination))
            .await
            .map_err(|err| BookError::Task(err.to_string()))??;

        Ok(GeneratedBook {
            pdf_filename: slot.filename,
            cover_url,
        })
    }

    /// Caller URL first, then the caller prompt, then a prompt drafted from the script.
    async fn resolve_cover(
        &self,
        script: &str,
        cover_url: Option<String>,
        cover_prompt: Option<String>,
    ) -> String {
        if let Some(url) = cover_url.filter(|url| !url.trim().is_empty()) {
            return url;
        }

        let prompt = match cover_prompt.filter(|prompt| !prompt.trim().is_empty()) {
            Some(prompt) => prompt,
            None => self.authoring.cover_prompt(script).await.into_inner(),
        };
        self.authoring.cover_image(&prompt).await.into_inner()
    }
}
