// src/pipeline/export.rs

//! Presenting and persisting query outcomes.

use std::path::PathBuf;

use crate::error::Result;
use crate::models::{ExtractionRow, OutputConfig, QueryOutcome};
use crate::storage::ArtifactStorage;
use crate::utils::log;

/// Print the result table, or the failure stage and message.
pub fn print_outcome(output: &OutputConfig, outcome: &QueryOutcome) {
    match outcome {
        QueryOutcome::Completed(report) => {
            let headers: Vec<&str> = output.headers.iter().map(String::as_str).collect();
            log::table(&headers, &table_rows(&report.rows));
            log::summary(
                &format!("HSK {}", report.code),
                &[
                    (
                        "Values found",
                        format!("{}/{}", report.found_count(), report.rows.len()),
                    ),
                    (
                        "Elapsed",
                        format!(
                            "{:.1}s",
                            (report.finished_at - report.started_at).num_milliseconds() as f64
                                / 1000.0
                        ),
                    ),
                ],
            );
        }
        QueryOutcome::Failed(failure) => {
            log::error(&format!(
                "HSK {} failed after {}: {}",
                failure.code, failure.stage, failure.message
            ));
        }
    }
}

/// Cells of the result table: label, period, value.
pub fn table_rows(rows: &[ExtractionRow]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| {
            vec![
                row.label.to_string(),
                row.period.to_string(),
                row.value.to_string(),
            ]
        })
        .collect()
}

/// Write the artifacts enabled in `output`. Returns the written paths.
pub async fn export_outcome(
    output: &OutputConfig,
    storage: &dyn ArtifactStorage,
    outcome: &QueryOutcome,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    match outcome {
        QueryOutcome::Completed(report) => {
            if output.write_xlsx {
                written.push(storage.write_spreadsheet(report).await?);
            }
            if output.write_json {
                written.push(storage.write_report(report).await?);
            }
        }
        QueryOutcome::Failed(failure) => {
            written.extend(storage.write_failure(failure).await?);
        }
    }
    for path in &written {
        log::sub_item(&format!("Saved {}", path.display()));
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use chrono::Local;
    use tempfile::TempDir;

    use super::*;
    use crate::models::{
        ExtractionMethod, Period, PeriodLabel, PeriodValue, QueryFailure, QueryReport, Stage,
    };
    use crate::storage::LocalStorage;

    fn completed() -> QueryOutcome {
        let now = Local::now();
        QueryOutcome::Completed(QueryReport {
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
                    value: PeriodValue::NotFound,
                    method: ExtractionMethod::None,
                },
            ],
            started_at: now,
            finished_at: now,
        })
    }

    #[test]
    fn test_table_rows() {
        let rows = table_rows(&completed().report().unwrap().rows);
        assert_eq!(rows[0], vec!["current", "2026-01", "1,230,456"]);
        assert_eq!(rows[1], vec!["previous", "2025-12", "not found"]);
    }

    #[tokio::test]
    async fn test_export_respects_toggles() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let mut output = OutputConfig::default();
        output.write_json = false;

        let written = export_outcome(&output, &storage, &completed()).await.unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].ends_with("kstat_847950_202601.xlsx"));
        assert!(!tmp.path().join("kstat_847950_202601.json").exists());
    }

    #[tokio::test]
    async fn test_export_failure_screenshot() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let outcome = QueryOutcome::Failed(QueryFailure {
            code: "847950".into(),
            stage: Stage::CodeSubmitted,
            message: "no results link appeared".into(),
            screenshot: Some(b"\x89PNG".to_vec()),
        });

        let written = export_outcome(&OutputConfig::default(), &storage, &outcome)
            .await
            .unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(std::fs::read(&written[0]).unwrap(), b"\x89PNG");
    }
}
