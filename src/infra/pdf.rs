//! HTML to PDF rasterization through an external command.
//!
//! The command is invoked as `<cli> <input.html> <output.pdf>`, which is the
//! calling convention of `weasyprint`.

use std::{
    fs,
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::Instant,
};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RasterizeError {
    #[error("failed to stage HTML for rasterization: {0}")]
    Io(io::Error),
    #[error("rasterizer unavailable: {0}")]
    NotFound(io::Error),
    #[error("rasterizer failed (exit {exit_code:?}): {stderr}")]
    Cli {
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("rasterizer produced no output at {path}")]
    MissingOutput { path: PathBuf },
}

/// Turns a complete HTML document into a PDF file at `destination`.
///
/// Blocking. Async callers should run it on the blocking pool.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, html: &str, destination: &Path) -> Result<(), RasterizeError>;
}

#[derive(Debug, Clone)]
pub struct CliRasterizer {
    cli_path: PathBuf,
}

impl CliRasterizer {
    pub fn new(cli_path: PathBuf) -> Self {
        Self { cli_path }
    }
}

impl Rasterizer for CliRasterizer {
    fn rasterize(&self, html: &str, destination: &Path) -> Result<(), RasterizeError> {
        let started_at = Instant::now();

        let mut input_file = tempfile::Builder::new()
            .prefix("bookwright-")
            .suffix(".html")
            .tempfile()
            .map_err(RasterizeError::Io)?;
        input_file
            .write_all(html.as_bytes())
            .map_err(RasterizeError::Io)?;
        input_file.flush().map_err(RasterizeError::Io)?;

        let result = self.run_cli(&input_file, destination, started_at);
        if result.is_err() {
            remove_partial_output(destination);
        }
        result
    }
}

impl CliRasterizer {
    fn run_cli(
        &self,
        input_file: &NamedTempFile,
        destination: &Path,
        started_at: Instant,
    ) -> Result<(), RasterizeError> {
        let output = Command::new(&self.cli_path)
            .arg(input_file.path())
            .arg(destination)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|err| {
                warn!(
                    target = "bookwright::infra::pdf",
                    op = "rasterizer::rasterize",
                    result = "error",
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    error_code = "spawn_cli",
                    error = %err,
                    "Failed to spawn rasterizer"
                );
                if err.kind() == ErrorKind::NotFound {
                    RasterizeError::NotFound(err)
                } else {
                    RasterizeError::Io(err)
                }
            })?;

        if !output.status.success() {
            let exit_code = output.status.code();
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            warn!(
                target = "bookwright::infra::pdf",
                op = "rasterizer::rasterize",
                result = "error",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                exit_code = exit_code.map(i64::from).unwrap_or(-1),
                error_code = "rasterizer_cli",
                stderr = %stderr,
                "Rasterizer invocation failed"
            );
            return Err(RasterizeError::Cli { exit_code, stderr });
        }

        let pdf_bytes = match fs::metadata(destination) {
            Ok(metadata) if metadata.is_file() => metadata.len(),
            _ => {
                warn!(
                    target = "bookwright::infra::pdf",
                    op = "rasterizer::rasterize",
                    result = "error",
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    error_code = "missing_output",
                    destination = %destination.display(),
                    "Rasterizer exited cleanly without writing output"
                );
                return Err(RasterizeError::MissingOutput {
                    path: destination.to_path_buf(),
                });
            }
        };

        info!(
            target = "bookwright::infra::pdf",
            op = "rasterizer::rasterize",
            result = "ok",
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            destination = %destination.display(),
            pdf_bytes,
            "PDF rasterized"
        );
        Ok(())
    }
}

fn remove_partial_output(destination: &Path) {
    match fs::remove_file(destination) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => warn!(
            target = "bookwright::infra::pdf",
            destination = %destination.display(),
            error = %err,
            "Failed to remove partial PDF output"
        ),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn fake_cli(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("fake-weasyprint");
        fs::write(&path, format!("#!/bin/sh\n{body}")).expect("write script");
        let mut perms = fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("set perms");
        path
    }

    #[test]
    fn writes_pdf_via_cli() {
        let dir = TempDir::new().expect("temp dir");
        let captured = dir.path().join("captured.html");
        let script = fake_cli(
            &dir,
            &format!(
                "set -eu\ncp \"$1\" \"{}\"\nprintf '%%PDF-1.7' > \"$2\"\n",
                captured.display()
            ),
        );
        let destination = dir.path().join("book.pdf");

        CliRasterizer::new(script)
            .rasterize("<html><body>hi</body></html>", &destination)
            .expect("rasterized");

        assert_eq!(fs::read(&destination).expect("pdf"), b"%PDF-1.7");
        assert_eq!(
            fs::read_to_string(&captured).expect("captured html"),
            "<html><body>hi</body></html>"
        );
    }

    #[test]
    fn surfaces_cli_errors_and_removes_partial_output() {
        let dir = TempDir::new().expect("temp dir");
        let script = fake_cli(&dir, "echo partial > \"$2\"\necho \"boom\" >&2\nexit 42\n");
        let destination = dir.path().join("book.pdf");

        let err = CliRasterizer::new(script)
            .rasterize("<html></html>", &destination)
            .expect_err("expected cli failure");

        match err {
            RasterizeError::Cli { exit_code, stderr } => {
                assert_eq!(exit_code, Some(42));
                assert!(stderr.contains("boom"), "stderr did not propagate: {stderr}");
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
        assert!(!destination.exists());
    }

    #[test]
    fn missing_output_is_an_error() {
        let dir = TempDir::new().expect("temp dir");
        let script = fake_cli(&dir, "exit 0\n");
        let destination = dir.path().join("book.pdf");

        let err = CliRasterizer::new(script)
            .rasterize("<html></html>", &destination)
            .expect_err("expected missing output");
        assert!(matches!(err, RasterizeError::MissingOutput { .. }));
    }

    #[test]
    fn missing_binary_reports_not_found() {
        let dir = TempDir::new().expect("temp dir");
        let err = CliRasterizer::new(dir.path().join("does-not-exist"))
            .rasterize("<html></html>", &dir.path().join("book.pdf"))
            .expect_err("expected spawn failure");
        assert!(matches!(err, RasterizeError::NotFound(_)));
    }
}
