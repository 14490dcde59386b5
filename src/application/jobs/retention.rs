//! Cron job that deletes generated PDFs past the retention window.

use std::{str::FromStr, time::Duration};

use apalis::prelude::*;
use apalis_cron::Schedule;
use metrics::counter;
use tracing::{info, warn};

use crate::infra::{
    error::InfraError,
    storage::{PdfStorage, PdfStorageError, PurgeSummary},
};

pub(crate) const METRIC_PDFS_PURGED_TOTAL: &str = "bookwright_pdfs_purged_total";

/// Top of every hour.
const RETENTION_CRON: &str = "0 0 * * * *";

/// Marker for the cron-triggered sweep.
#[derive(Default, Debug, Clone)]
pub struct PurgePdfsJob;

impl From<chrono::DateTime<chrono::Utc>> for PurgePdfsJob {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self
    }
}

#[derive(Clone)]
pub struct RetentionContext {
    pub storage: PdfStorage,
    pub max_age: Duration,
}

pub async fn process_purge_pdfs_job(
    _job: PurgePdfsJob,
    ctx: Data<RetentionContext>,
) -> Result<(), apalis::prelude::Error> {
    if let Err(err) = purge_expired_pdfs(&ctx.storage, ctx.max_age).await {
        warn!(
            target = "bookwright::application::jobs::retention",
            error = %err,
            "Failed to purge expired PDFs"
        );
    }
    Ok(())
}

/// One sweep over the output directory.
pub async fn purge_expired_pdfs(
    storage: &PdfStorage,
    max_age: Duration,
) -> Result<PurgeSummary, PdfStorageError> {
    let summary = storage.purge_older_than(max_age).await?;
    counter!(METRIC_PDFS_PURGED_TOTAL).increment(summary.removed as u64);
    if summary.removed > 0 {
        info!(
            target = "bookwright::application::jobs::retention",
            removed = summary.removed,
            kept = summary.kept,
            max_age_secs = max_age.as_secs(),
            "Purged expired PDFs"
        );
    }
    Ok(summary)
}

pub fn retention_schedule() -> Result<Schedule, InfraError> {
    Schedule::from_str(RETENTION_CRON)
        .map_err(|err| InfraError::job(format!("invalid retention schedule: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn schedule_parses_correctly() {
        let schedule = retention_schedule().expect("schedule");
        let upcoming: Vec<_> = schedule.upcoming(chrono::Utc).take(3).collect();
        assert_eq!(upcoming.len(), 3);
    }

    #[tokio::test]
    async fn sweep_removes_expired_files() {
        let dir = TempDir::new().expect("temp dir");
        let storage = PdfStorage::new(dir.path().to_path_buf()).expect("storage");
        let slot = storage.allocate();
        std::fs::write(&slot.path, b"pdf").expect("write");

        let summary = purge_expired_pdfs(&storage, Duration::ZERO)
            .await
            .expect("purge");

        assert_eq!(summary.removed, 1);
        assert!(!slot.path.exists());
    }
}
