//! Storage for query artifacts.
//!
//! A completed query produces a spreadsheet and, optionally, a JSON copy of
//! the report. A failed query produces the screenshot taken when it stopped.
//!
//! ## File Names
//!
//! ```text
//! kstat_{code}_{YYYYMM}.xlsx     # YYYYMM is the current period
//! kstat_{code}_{YYYYMM}.json
//! failure_{code}_{YYYYMMDD-HHMMSS}.png
//! ```

pub mod local;
pub mod xlsx;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Local;

use crate::error::Result;
use crate::models::{Period, PeriodLabel, QueryFailure, QueryReport};

// Re-export for convenience
pub use local::LocalStorage;
pub use xlsx::render_workbook;

/// Trait for artifact storage backends.
#[async_trait]
pub trait ArtifactStorage: Send + Sync {
    /// Write the spreadsheet for a completed query.
    async fn write_spreadsheet(&self, report: &QueryReport) -> Result<PathBuf>;

    /// Write the report as JSON.
    async fn write_report(&self, report: &QueryReport) -> Result<PathBuf>;

    /// Write the failure screenshot, if one was captured.
    async fn write_failure(&self, failure: &QueryFailure) -> Result<Option<PathBuf>>;
}

/// File stem shared by a report's artifacts.
pub fn artifact_stem(report: &QueryReport) -> String {
    let period = report
        .row(PeriodLabel::Current)
        .map(|row| row.period)
        .unwrap_or_else(|| Period::from_date(report.started_at.date_naive()));
    format!("kstat_{}_{}", report.code, period.compact())
}

/// Screenshot file name, stamped with the local time of the write.
pub fn failure_key(failure: &QueryFailure) -> String {
    format!(
        "failure_{}_{}.png",
        failure.code,
        Local::now().format("%Y%m%d-%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_without_rows_uses_start_date() {
        let started = Local::now();
        let report = QueryReport {
            code: "0101".into(),
            rows: Vec::new(),
            started_at: started,
            finished_at: started,
        };
        let expected = format!("kstat_0101_{}", started.format("%Y%m"));
        assert_eq!(artifact_stem(&report), expected);
    }
}
