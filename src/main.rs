use std::{process, sync::Arc, time::Duration};

use apalis::prelude::{Monitor, WorkerBuilder, WorkerFactoryFn};
use apalis_cron::CronStream;
use bookwright::{
    application::{
        authoring::AuthoringService,
        books::BookService,
        error::AppError,
        generative::{ImageGenerator, TextGenerator},
        jobs::{RetentionContext, process_purge_pdfs_job, purge_expired_pdfs, retention_schedule},
        render::{DocumentAssembler, DocumentChrome},
    },
    config,
    infra::{
        error::InfraError,
        gemini::{GeminiTextClient, ImagenClient},
        http::{self, AppState, CorsPolicy},
        pdf::CliRasterizer,
        storage::PdfStorage,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Purge(_) => run_purge(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let storage = open_storage(&settings)?;
    let books = build_book_service(&settings, storage.clone())?;
    let cors = CorsPolicy::new(&settings.server.allowed_origin)?;

    if settings.ai.gemini_api_key.is_none() {
        warn!(
            target = "bookwright::startup",
            "Text generation key is not configured; AI features will use fallbacks"
        );
    }
    if settings.ai.imagen_api_key.is_none() {
        warn!(
            target = "bookwright::startup",
            "Image generation key is not configured; covers will use the placeholder"
        );
    }

    let monitor_handle = match settings.pdf.retention {
        Some(max_age) => Some(spawn_retention_monitor(storage, max_age)?),
        None => None,
    };

    let state = AppState {
        authoring: books.authoring().clone(),
        books,
    };
    let result = serve_http(&settings, state, cors).await;

    if let Some(handle) = monitor_handle {
        handle.abort();
        let _ = handle.await;
    }

    result
}

async fn run_purge(settings: config::Settings) -> Result<(), AppError> {
    let storage = open_storage(&settings)?;
    let Some(max_age) = settings.pdf.retention else {
        info!(
            target = "bookwright::purge",
            "Retention is disabled; nothing to purge"
        );
        return Ok(());
    };

    let summary = purge_expired_pdfs(&storage, max_age)
        .await
        .map_err(|err| AppError::unexpected(format!("purge failed: {err}")))?;
    info!(
        target = "bookwright::purge",
        removed = summary.removed,
        kept = summary.kept,
        directory = %storage.root().display(),
        "Purge completed"
    );
    Ok(())
}

fn open_storage(settings: &config::Settings) -> Result<PdfStorage, AppError> {
    PdfStorage::new(settings.pdf.output_directory.clone())
        .map_err(|err| AppError::from(InfraError::Io(err)))
}

fn build_book_service(
    settings: &config::Settings,
    storage: PdfStorage,
) -> Result<BookService, AppError> {
    let text: Arc<dyn TextGenerator> = Arc::new(GeminiTextClient::new(&settings.ai)?);
    let images: Arc<dyn ImageGenerator> = Arc::new(ImagenClient::new(&settings.ai)?);
    let authoring = AuthoringService::new(text, images);
    let assembler = DocumentAssembler::new(DocumentChrome::from(&settings.book));
    let rasterizer = Arc::new(CliRasterizer::new(settings.pdf.rasterizer_path.clone()));

    Ok(BookService::new(authoring, assembler, rasterizer, storage))
}

fn spawn_retention_monitor(
    storage: PdfStorage,
    max_age: Duration,
) -> Result<tokio::task::JoinHandle<()>, AppError> {
    let schedule = retention_schedule()?;
    let worker = WorkerBuilder::new("purge-pdfs-worker")
        .data(RetentionContext { storage, max_age })
        .backend(CronStream::new(schedule))
        .build_fn(process_purge_pdfs_job);

    let monitor = Monitor::new().register(worker);

    Ok(tokio::spawn(async move {
        if let Err(err) = monitor.run().await {
            error!(error = %err, "job monitor stopped");
        }
    }))
}

async fn serve_http(
    settings: &config::Settings,
    state: AppState,
    cors: CorsPolicy,
) -> Result<(), AppError> {
    let router = http::build_router(state, cors);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "bookwright::startup",
        addr = %settings.server.addr,
        "Listening"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}
