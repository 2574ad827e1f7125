//! Local filesystem storage for query artifacts.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── kstat_847950_202601.xlsx              # Spreadsheet of a completed query
//! ├── kstat_847950_202601.json              # Same report as JSON
//! └── failure_847950_20260115-093012.png    # Screenshot of a failed query
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::models::{QueryFailure, QueryReport};
use crate::storage::{ArtifactStorage, artifact_stem, failure_key, xlsx};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    sheet_name: String,
    headers: Vec<String>,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        let output = crate::models::OutputConfig::default();
        Self::with_layout(root_dir, output.sheet_name, output.headers)
    }

    /// Create a LocalStorage with a custom spreadsheet layout.
    pub fn with_layout(
        root_dir: impl Into<PathBuf>,
        sheet_name: impl Into<String>,
        headers: Vec<String>,
    ) -> Self {
        Self {
            root_dir: root_dir.into(),
            sheet_name: sheet_name.into(),
            headers,
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(path)
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<PathBuf> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }
}

#[async_trait]
impl ArtifactStorage for LocalStorage {
    async fn write_spreadsheet(&self, report: &QueryReport) -> Result<PathBuf> {
        let bytes = xlsx::render_workbook(report, &self.headers, &self.sheet_name)?;
        let key = format!("{}.xlsx", artifact_stem(report));
        let path = self.write_bytes(&key, &bytes).await?;
        log::info!("Spreadsheet written to {}", path.display());
        Ok(path)
    }

    async fn write_report(&self, report: &QueryReport) -> Result<PathBuf> {
        let key = format!("{}.json", artifact_stem(report));
        let path = self.write_json(&key, report).await?;
        log::info!("Report written to {}", path.display());
        Ok(path)
    }

    async fn write_failure(&self, failure: &QueryFailure) -> Result<Option<PathBuf>> {
        let Some(png) = failure.screenshot.as_deref() else {
            log::warn!("No screenshot captured for {}", failure.code);
            return Ok(None);
        };
        let path = self.write_bytes(&failure_key(failure), png).await?;
        log::info!("Failure screenshot written to {}", path.display());
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ExtractionMethod, ExtractionRow, Period, PeriodLabel, PeriodValue, Stage,
    };
    use chrono::Local;
    use tempfile::TempDir;

    fn report() -> QueryReport {
        let now = Local::now();
        QueryReport {
            code: "847950".into(),
            rows: vec![
                ExtractionRow {
                    label: PeriodLabel::Current,
                    period: Period::new(2026, 1).unwrap(),
                    value: PeriodValue::Found("1,230,456".into()),
                    method: ExtractionMethod::TableScan,
                },
                ExtractionRow {
                    label: PeriodLabel::Previous,
                    period: Period::new(2025, 12).unwrap(),
                    value: PeriodValue::Found("1,150,321".into()),
                    method: ExtractionMethod::TableScan,
                },
            ],
            started_at: now,
            finished_at: now,
        }
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let path = storage.write_bytes("test.txt", b"hello").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
        assert!(!tmp.path().join("test.tmp").exists());
    }

    #[tokio::test]
    async fn test_write_creates_missing_dirs() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("a").join("b"));

        let path = storage.write_bytes("test.txt", b"x").await.unwrap();
        assert!(path.starts_with(tmp.path().join("a").join("b")));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_report_artifacts() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("out"));

        let xlsx = storage.write_spreadsheet(&report()).await.unwrap();
        assert_eq!(xlsx.file_name().unwrap(), "kstat_847950_202601.xlsx");
        assert!(xlsx.exists());

        let path = storage.write_report(&report()).await.unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(json["rows"][1]["period"], "2025-12");
        assert_eq!(json["rows"][1]["value"], "1,150,321");
    }

    #[tokio::test]
    async fn test_failure_screenshot() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let mut failure = QueryFailure {
            code: "847950".into(),
            stage: Stage::MenuNavigated,
            message: "could not locate the input field".into(),
            screenshot: None,
        };
        assert!(storage.write_failure(&failure).await.unwrap().is_none());

        failure.screenshot = Some(b"\x89PNG".to_vec());
        let path = storage.write_failure(&failure).await.unwrap().unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("failure_847950_"));
        assert!(name.ends_with(".png"));
    }
}
