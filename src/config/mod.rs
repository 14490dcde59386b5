//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroU64, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "bookwright";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_ALLOWED_ORIGIN: &str = "*";
const DEFAULT_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models/";
const DEFAULT_TEXT_MODEL: &str = "gemini-pro";
const DEFAULT_IMAGE_MODEL: &str = "imagen-3.0-generate-002";
const DEFAULT_AI_TIMEOUT_SECS: u64 = 120;
const DEFAULT_PDF_DIR: &str = "uploads/pdfs";
const DEFAULT_RASTERIZER_PATH: &str = "weasyprint";
const DEFAULT_RETENTION_HOURS: u64 = 168;
pub(crate) const DEFAULT_BOOK_LANGUAGE: &str = "ar";
pub(crate) const DEFAULT_BOOK_DIRECTION: &str = "rtl";
pub(crate) const DEFAULT_TOC_TITLE: &str = "جدول المحتويات";
pub(crate) const DEFAULT_AUTHOR_CAPTION: &str = "تأليف: صانع الكتب الذكي";
pub(crate) const DEFAULT_PAGE_COUNTER_SEPARATOR: &str = "من";

/// Command-line arguments for the Bookwright binary.
#[derive(Debug, Parser)]
#[command(name = "bookwright", version, about = "Bookwright book publishing server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "BOOKWRIGHT_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub credentials: CredentialArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service and the PDF retention job.
    Serve(Box<ServeArgs>),
    /// Remove generated PDFs older than the retention window, then exit.
    Purge(PurgeArgs),
}

/// Generative-AI credentials. Read from the conventional provider variables as well.
#[derive(Debug, Args, Default, Clone)]
pub struct CredentialArgs {
    /// API key for the generative-text provider.
    #[arg(
        long = "gemini-api-key",
        env = "GEMINI_API_KEY",
        value_name = "KEY",
        hide_env_values = true
    )]
    pub gemini_api_key: Option<String>,

    /// API key for the generative-image provider.
    #[arg(
        long = "imagen-api-key",
        env = "IMAGEN_API_KEY",
        value_name = "KEY",
        hide_env_values = true
    )]
    pub imagen_api_key: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct PdfOverrides {
    /// Override the directory generated PDFs are written to.
    #[arg(long = "pdf-output-directory", value_name = "PATH")]
    pub output_directory: Option<PathBuf>,

    /// Override the retention window in hours (0 keeps files forever).
    #[arg(long = "pdf-retention-hours", value_name = "HOURS")]
    pub retention_hours: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub pdf: PdfOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the HTML-to-PDF executable.
    #[arg(long = "rasterizer-path", value_name = "PATH")]
    pub rasterizer_path: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct PurgeArgs {
    #[command(flatten)]
    pub pdf: PdfOverrides,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub ai: AiSettings,
    pub pdf: PdfSettings,
    pub book: BookSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub allowed_origin: String,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Clone)]
pub struct AiSettings {
    pub gemini_api_key: Option<String>,
    pub imagen_api_key: Option<String>,
    pub api_base_url: Url,
    pub text_model: String,
    pub image_model: String,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for AiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiSettings")
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<redacted>"))
            .field("imagen_api_key", &self.imagen_api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url.as_str())
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PdfSettings {
    pub output_directory: PathBuf,
    pub rasterizer_path: PathBuf,
    /// `None` disables the retention sweep.
    pub retention: Option<Duration>,
}

/// Fixed document chrome: language, direction and the captions printed on every book.
#[derive(Debug, Clone)]
pub struct BookSettings {
    pub language: String,
    pub direction: String,
    pub toc_title: String,
    pub author_caption: String,
    pub page_counter_separator: String,
}

impl Default for BookSettings {
    fn default() -> Self {
        Self {
            language: DEFAULT_BOOK_LANGUAGE.to_string(),
            direction: DEFAULT_BOOK_DIRECTION.to_string(),
            toc_title: DEFAULT_TOC_TITLE.to_string(),
            author_caption: DEFAULT_AUTHOR_CAPTION.to_string(),
            page_counter_separator: DEFAULT_PAGE_COUNTER_SEPARATOR.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("BOOKWRIGHT").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    raw.apply_credentials(&cli.credentials);
    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Purge(args)) => raw.apply_pdf_overrides(&args.pdf),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    ai: RawAiSettings,
    pdf: RawPdfSettings,
    book: RawBookSettings,
}

impl RawSettings {
    fn apply_credentials(&mut self, credentials: &CredentialArgs) {
        if let Some(key) = credentials.gemini_api_key.as_ref() {
            self.ai.gemini_api_key = Some(key.clone());
        }
        if let Some(key) = credentials.imagen_api_key.as_ref() {
            self.ai.imagen_api_key = Some(key.clone());
        }
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(path) = overrides.rasterizer_path.as_ref() {
            self.pdf.rasterizer_path = Some(path.clone());
        }

        self.apply_pdf_overrides(&overrides.pdf);
    }

    fn apply_pdf_overrides(&mut self, overrides: &PdfOverrides) {
        if let Some(directory) = overrides.output_directory.as_ref() {
            self.pdf.output_directory = Some(directory.clone());
        }
        if let Some(hours) = overrides.retention_hours {
            self.pdf.retention_hours = Some(hours);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            ai,
            pdf,
            book,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            ai: build_ai_settings(ai)?,
            pdf: build_pdf_settings(pdf)?,
            book: build_book_settings(book),
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let allowed_origin = non_blank(server.allowed_origin)
        .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGIN.to_string());

    Ok(ServerSettings {
        addr,
        allowed_origin,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_ai_settings(ai: RawAiSettings) -> Result<AiSettings, LoadError> {
    let base = non_blank(ai.api_base_url).unwrap_or_else(|| DEFAULT_AI_BASE_URL.to_string());
    // Model names are joined onto the base, so it must end with a slash.
    let base = if base.ends_with('/') {
        base
    } else {
        format!("{base}/")
    };
    let api_base_url = Url::parse(&base)
        .map_err(|err| LoadError::invalid("ai.api_base_url", format!("invalid url: {err}")))?;

    let text_model = non_blank(ai.text_model).unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string());
    let image_model = non_blank(ai.image_model).unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string());

    let timeout_secs = ai
        .request_timeout_seconds
        .unwrap_or(DEFAULT_AI_TIMEOUT_SECS);
    let timeout_secs = NonZeroU64::new(timeout_secs).ok_or_else(|| {
        LoadError::invalid("ai.request_timeout_seconds", "must be greater than zero")
    })?;

    Ok(AiSettings {
        gemini_api_key: non_blank(ai.gemini_api_key),
        imagen_api_key: non_blank(ai.imagen_api_key),
        api_base_url,
        text_model,
        image_model,
        request_timeout: Duration::from_secs(timeout_secs.get()),
    })
}

fn build_pdf_settings(pdf: RawPdfSettings) -> Result<PdfSettings, LoadError> {
    let output_directory = pdf
        .output_directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PDF_DIR));
    if output_directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "pdf.output_directory",
            "path must not be empty",
        ));
    }

    let rasterizer_path = pdf
        .rasterizer_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RASTERIZER_PATH));
    if rasterizer_path.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "pdf.rasterizer_path",
            "path must not be empty",
        ));
    }

    let hours = pdf.retention_hours.unwrap_or(DEFAULT_RETENTION_HOURS);
    let retention = match hours {
        0 => None,
        hours => {
            let seconds = hours.checked_mul(3600).ok_or_else(|| {
                LoadError::invalid("pdf.retention_hours", "value exceeds supported range")
            })?;
            Some(Duration::from_secs(seconds))
        }
    };

    Ok(PdfSettings {
        output_directory,
        rasterizer_path,
        retention,
    })
}

fn build_book_settings(book: RawBookSettings) -> BookSettings {
    let defaults = BookSettings::default();
    BookSettings {
        language: non_blank(book.language).unwrap_or(defaults.language),
        direction: non_blank(book.direction).unwrap_or(defaults.direction),
        toc_title: non_blank(book.toc_title).unwrap_or(defaults.toc_title),
        author_caption: non_blank(book.author_caption).unwrap_or(defaults.author_caption),
        page_counter_separator: non_blank(book.page_counter_separator)
            .unwrap_or(defaults.page_counter_separator),
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    allowed_origin: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAiSettings {
    gemini_api_key: Option<String>,
    imagen_api_key: Option<String>,
    api_base_url: Option<String>,
    text_model: Option<String>,
    image_model: Option<String>,
    request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPdfSettings {
    output_directory: Option<PathBuf>,
    rasterizer_path: Option<PathBuf>,
    retention_hours: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBookSettings {
    language: Option<String>,
    direction: Option<String>,
    toc_title: Option<String>,
    author_caption: Option<String>,
    page_counter_separator: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = RawSettings::default();
        raw.server.port = Some(4000);
        raw.logging.level = Some("info".to_string());

        let overrides = ServeOverrides {
            server_port: Some(4321),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };

        raw.apply_serve_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.server.addr.port(), 4321);
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    }

    #[test]
    fn defaults_cover_every_section() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

        assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
        assert_eq!(settings.server.allowed_origin, "*");
        assert!(settings.ai.gemini_api_key.is_none());
        assert_eq!(settings.ai.text_model, DEFAULT_TEXT_MODEL);
        assert_eq!(settings.ai.request_timeout, Duration::from_secs(120));
        assert_eq!(settings.pdf.output_directory, PathBuf::from(DEFAULT_PDF_DIR));
        assert_eq!(
            settings.pdf.retention,
            Some(Duration::from_secs(DEFAULT_RETENTION_HOURS * 3600))
        );
        assert_eq!(settings.book.direction, "rtl");
    }

    #[test]
    fn zero_retention_disables_sweep() {
        let mut raw = RawSettings::default();
        raw.apply_pdf_overrides(&PdfOverrides {
            retention_hours: Some(0),
            ..Default::default()
        });

        let settings = Settings::from_raw(raw).expect("valid settings");
        assert!(settings.pdf.retention.is_none());
    }

    #[test]
    fn blank_credentials_are_treated_as_missing() {
        let mut raw = RawSettings::default();
        raw.apply_credentials(&CredentialArgs {
            gemini_api_key: Some("   ".to_string()),
            imagen_api_key: Some("img-key".to_string()),
        });

        let settings = Settings::from_raw(raw).expect("valid settings");
        assert!(settings.ai.gemini_api_key.is_none());
        assert_eq!(settings.ai.imagen_api_key.as_deref(), Some("img-key"));
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let mut raw = RawSettings::default();
        raw.ai.api_base_url = Some("http://127.0.0.1:9000/v1beta/models".to_string());

        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(
            settings.ai.api_base_url.as_str(),
            "http://127.0.0.1:9000/v1beta/models/"
        );
    }

    #[test]
    fn rejects_zero_port() {
        let mut raw = RawSettings::default();
        raw.server.port = Some(0);

        let err = Settings::from_raw(raw).expect_err("zero port rejected");
        assert!(matches!(err, LoadError::Invalid { key: "server.port", .. }));
    }

    #[test]
    fn cli_json_logging_enforces_format() {
        let mut raw = RawSettings::default();
        let overrides = ServeOverrides {
            log_json: Some(true),
            ..Default::default()
        };

        raw.apply_serve_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert!(matches!(settings.logging.format, LogFormat::Json));
    }

    #[test]
    fn default_to_serve_command() {
        let args = CliArgs::parse_from(["bookwright"]);
        let command = args
            .command
            .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
        assert!(matches!(command, Command::Serve(_)));
    }

    #[test]
    fn parse_purge_arguments() {
        let args = CliArgs::parse_from([
            "bookwright",
            "purge",
            "--pdf-output-directory",
            "/tmp/books",
            "--pdf-retention-hours",
            "12",
        ]);

        match args.command.expect("purge command") {
            Command::Purge(purge) => {
                assert_eq!(
                    purge.pdf.output_directory.as_deref(),
                    Some(std::path::Path::new("/tmp/books"))
                );
                assert_eq!(purge.pdf.retention_hours, Some(12));
            }
            _ => panic!("wrong command parsed"),
        }
    }

    #[test]
    fn parse_serve_overrides() {
        let args = CliArgs::parse_from([
            "bookwright",
            "--gemini-api-key",
            "text-key",
            "serve",
            "--server-host",
            "0.0.0.0",
            "--rasterizer-path",
            "/usr/local/bin/weasyprint",
        ]);

        assert_eq!(args.credentials.gemini_api_key.as_deref(), Some("text-key"));
        match args.command.expect("serve command") {
            Command::Serve(serve) => {
                assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
                assert_eq!(
                    serve.overrides.rasterizer_path.as_deref(),
                    Some(std::path::Path::new("/usr/local/bin/weasyprint"))
                );
            }
            _ => panic!("wrong command parsed"),
        }
    }
}
