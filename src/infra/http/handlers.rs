use axum::{
    Json,
    body::Body,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

use super::{
    AppState,
    error::{ApiError, codes},
    models::*,
};
use crate::{
    application::books::{BookError, BookRequest},
    infra::storage::PdfStorageError,
};

const BOOK_GENERATED_MESSAGE: &str = "تم توليد الكتاب بنجاح!";
const MISSING_SCRIPT_MESSAGE: &str = "الرجاء توفير نص الكتاب.";
const MISSING_CHAT_MESSAGE: &str = "الرجاء توفير رسالة.";
const MISSING_DESCRIPTION_MESSAGE: &str = "الرجاء توفير وصف للكتاب لاقتراح النمط.";
const MISSING_RAW_SCRIPT_MESSAGE: &str = "الرجاء توفير نص خام للتنسيق.";
const MISSING_CONTENT_MESSAGE: &str = "الرجاء توفير محتوى الكتاب لتوليد أوصاف الغلاف.";
const PDF_NOT_FOUND_MESSAGE: &str = "ملف PDF غير موجود.";

pub async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn generate_book(
    State(state): State<AppState>,
    payload: Result<Json<GenerateBookRequest>, JsonRejection>,
) -> Result<Json<GenerateBookResponse>, ApiError> {
    let Json(payload) = payload?;
    let script = present(payload.book_script)
        .ok_or_else(|| ApiError::bad_request(MISSING_SCRIPT_MESSAGE))?;

    let request = BookRequest {
        title: present(payload.ebook_title),
        script,
        cover_prompt: present(payload.cover_prompt),
        cover_url: present(payload.user_provided_cover_url),
        back_cover_text: payload.back_cover_text,
        settings: payload.settings.unwrap_or_default(),
    };

    let book = state.books.generate(request).await.map_err(book_error_to_api)?;

    Ok(Json(GenerateBookResponse {
        pdf_url: format!("/download-pdf/{}", book.pdf_filename),
        cover_url: book.cover_url,
        message: BOOK_GENERATED_MESSAGE.to_string(),
    }))
}

pub async fn download_pdf(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = state
        .books
        .storage()
        .read(&filename)
        .await
        .map_err(|err| match err {
            err @ (PdfStorageError::InvalidName | PdfStorageError::NotFound) => {
                ApiError::not_found(PDF_NOT_FOUND_MESSAGE).with_detail(format!("{filename}: {err}"))
            }
            PdfStorageError::Io(io) => {
                ApiError::internal(codes::STORAGE, PDF_NOT_FOUND_MESSAGE).with_detail(io.to_string())
            }
        })?;

    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\"")) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(payload) = payload?;
    let message =
        present(payload.message).ok_or_else(|| ApiError::bad_request(MISSING_CHAT_MESSAGE))?;

    let reply = state
        .authoring
        .chat(&message, payload.history.unwrap_or_default())
        .await;
    Ok(Json(ChatResponse {
        response: reply.into_inner(),
    }))
}

pub async fn suggest_style(
    State(state): State<AppState>,
    payload: Result<Json<SuggestStyleRequest>, JsonRejection>,
) -> Result<Json<SuggestStyleResponse>, ApiError> {
    let Json(payload) = payload?;
    let description = present(payload.book_description)
        .ok_or_else(|| ApiError::bad_request(MISSING_DESCRIPTION_MESSAGE))?;

    let suggestion = state.authoring.suggest_style(&description).await;
    Ok(Json(SuggestStyleResponse {
        settings: suggestion.into_inner(),
    }))
}

pub async fn format_script(
    State(state): State<AppState>,
    payload: Result<Json<FormatScriptRequest>, JsonRejection>,
) -> Result<Json<FormatScriptResponse>, ApiError> {
    let Json(payload) = payload?;
    let raw_script = present(payload.raw_script)
        .ok_or_else(|| ApiError::bad_request(MISSING_RAW_SCRIPT_MESSAGE))?;

    let formatted = state.authoring.format_script(&raw_script).await;
    Ok(Json(FormatScriptResponse {
        formatted_html: formatted.into_inner(),
    }))
}

pub async fn generate_cover_descriptions(
    State(state): State<AppState>,
    payload: Result<Json<CoverDescriptionsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let content = present(payload.book_content)
        .ok_or_else(|| ApiError::bad_request(MISSING_CONTENT_MESSAGE))?;

    let pair = state.authoring.cover_pair(&content).await;
    Ok(Json(pair.into_inner()))
}

fn book_error_to_api(err: BookError) -> ApiError {
    match err {
        BookError::Invalid(invalid) => {
            ApiError::bad_request(MISSING_SCRIPT_MESSAGE).with_detail(invalid.to_string())
        }
        other => ApiError::internal(
            codes::GENERATION,
            format!("حدث خطأ أثناء توليد الكتاب: {other}"),
        ),
    }
}
