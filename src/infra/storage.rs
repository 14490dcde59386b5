//! Filesystem storage for generated PDFs.

use std::{
    path::{Component, Path, PathBuf},
    time::{Duration, SystemTime},
};

use bytes::Bytes;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

const FILE_PREFIX: &str = "book_";
const FILE_EXTENSION: &str = "pdf";

#[derive(Debug, Error)]
pub enum PdfStorageError {
    #[error("invalid PDF file name")]
    InvalidName,
    #[error("PDF not found")]
    NotFound,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A freshly allocated output slot. Nothing exists on disk yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfSlot {
    pub filename: String,
    pub path: PathBuf,
}

/// Counts from one retention sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeSummary {
    pub removed: usize,
    pub kept: usize,
}

/// Output directory holding `book_{uuid}.pdf` files.
#[derive(Debug, Clone)]
pub struct PdfStorage {
    root: PathBuf,
}

impl PdfStorage {
    /// Creates the directory if it does not exist yet.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn allocate(&self) -> PdfSlot {
        let filename = format!("{FILE_PREFIX}{}.{FILE_EXTENSION}", Uuid::new_v4().simple());
        let path = self.root.join(&filename);
        PdfSlot { filename, path }
    }

    pub async fn read(&self, filename: &str) -> Result<Bytes, PdfStorageError> {
        let absolute = self.resolve(filename)?;
        match fs::read(&absolute).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(PdfStorageError::NotFound),
            Err(err) => Err(PdfStorageError::Io(err)),
        }
    }

    /// Removes generated PDFs whose modification time is at least `max_age` ago.
    pub async fn purge_older_than(&self, max_age: Duration) -> Result<PurgeSummary, PdfStorageError> {
        let now = SystemTime::now();
        let mut summary = PurgeSummary::default();
        let mut entries = fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !is_generated_name(name) {
                continue;
            }

            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();

            if age < max_age {
                summary.kept += 1;
                continue;
            }

            match fs::remove_file(entry.path()).await {
                Ok(()) => {
                    debug!(
                        target = "bookwright::infra::storage",
                        file = name,
                        age_secs = age.as_secs(),
                        "Removed expired PDF"
                    );
                    summary.removed += 1;
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    warn!(
                        target = "bookwright::infra::storage",
                        file = name,
                        error = %err,
                        "Failed to remove expired PDF"
                    );
                    summary.kept += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Maps a bare file name into the output directory.
    pub fn resolve(&self, filename: &str) -> Result<PathBuf, PdfStorageError> {
        if filename.is_empty() || filename.contains(['/', '\\']) || filename.contains("..") {
            return Err(PdfStorageError::InvalidName);
        }

        let relative = Path::new(filename);
        let mut components = relative.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(relative)),
            _ => Err(PdfStorageError::InvalidName),
        }
    }
}

fn is_generated_name(name: &str) -> bool {
    name.strip_prefix(FILE_PREFIX)
        .and_then(|rest| rest.strip_suffix(&format!(".{FILE_EXTENSION}")))
        .is_some_and(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn allocates_unique_uuid_names() {
        let dir = TempDir::new().expect("temp dir");
        let storage = PdfStorage::new(dir.path().join("pdfs")).expect("storage");

        let first = storage.allocate();
        let second = storage.allocate();

        assert_ne!(first.filename, second.filename);
        assert!(first.filename.starts_with("book_"));
        assert!(first.filename.ends_with(".pdf"));
        assert_eq!(first.filename.len(), "book_".len() + 32 + ".pdf".len());
        assert_eq!(first.path, dir.path().join("pdfs").join(&first.filename));
        assert!(dir.path().join("pdfs").is_dir());
    }

    #[test]
    fn rejects_traversal_and_separators() {
        let dir = TempDir::new().expect("temp dir");
        let storage = PdfStorage::new(dir.path().to_path_buf()).expect("storage");

        for name in ["", "..", "../secret.pdf", "a/b.pdf", "a\\b.pdf", "/etc/passwd", "x..pdf"] {
            assert!(
                matches!(storage.resolve(name), Err(PdfStorageError::InvalidName)),
                "accepted {name:?}"
            );
        }
        assert!(storage.resolve("book_abc.pdf").is_ok());
    }

    #[tokio::test]
    async fn reads_existing_and_reports_missing() {
        let dir = TempDir::new().expect("temp dir");
        let storage = PdfStorage::new(dir.path().to_path_buf()).expect("storage");
        let slot = storage.allocate();
        std::fs::write(&slot.path, b"%PDF-1.7").expect("write pdf");

        let data = storage.read(&slot.filename).await.expect("read");
        assert_eq!(&data[..], b"%PDF-1.7");

        let missing = storage.read("book_missing.pdf").await;
        assert!(matches!(missing, Err(PdfStorageError::NotFound)));
    }

    #[tokio::test]
    async fn purge_only_touches_generated_files() {
        let dir = TempDir::new().expect("temp dir");
        let storage = PdfStorage::new(dir.path().to_path_buf()).expect("storage");
        let slot = storage.allocate();
        std::fs::write(&slot.path, b"pdf").expect("write pdf");
        std::fs::write(dir.path().join("notes.txt"), b"keep").expect("write other");

        let kept = storage
            .purge_older_than(Duration::from_secs(3600))
            .await
            .expect("purge");
        assert_eq!(kept, PurgeSummary { removed: 0, kept: 1 });
        assert!(slot.path.exists());

        let purged = storage.purge_older_than(Duration::ZERO).await.expect("purge");
        assert_eq!(purged, PurgeSummary { removed: 1, kept: 0 });
        assert!(!slot.path.exists());
        assert!(dir.path().join("notes.txt").exists());
    }
}
