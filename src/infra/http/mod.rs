mod error;
mod handlers;
mod middleware;
mod models;

pub use error::{ApiError, ApiErrorBody, codes};
pub use middleware::{CorsPolicy, RequestContext};

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::application::{authoring::AuthoringService, books::BookService};

#[derive(Clone)]
pub struct AppState {
    pub authoring: AuthoringService,
    pub books: BookService,
}

pub fn build_router(state: AppState, cors: CorsPolicy) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/generate-book", post(handlers::generate_book))
        .route("/download-pdf/{filename}", get(handlers::download_pdf))
        .route("/chat", post(handlers::chat))
        .route("/suggest-style", post(handlers::suggest_style))
        .route("/format-script-with-ai", post(handlers::format_script))
        .route(
            "/generate-cover-descriptions",
            post(handlers::generate_cover_descriptions),
        )
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(
            cors,
            middleware::apply_cors,
        ))
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
