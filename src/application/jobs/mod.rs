mod retention;

pub use retention::{
    PurgePdfsJob, RetentionContext, process_purge_pdfs_job, purge_expired_pdfs,
    retention_schedule,
};
pub(crate) use retention::METRIC_PDFS_PURGED_TOTAL;
