// src/pipeline/extract.rs

//! Offline table scan of a saved result page.

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::models::{Config, ExtractionMethod, ExtractionRow, Period, PeriodLabel, PeriodValue};
use crate::services::{PeriodMatcher, TableScanner};
use crate::utils::log;

/// Scan `html_path` for `period` and the month before it.
pub fn run_extract(
    config: &Config,
    html_path: &Path,
    period: Period,
) -> Result<Vec<ExtractionRow>> {
    log::header(&format!("Extracting from {}", html_path.display()));
    let html = fs::read_to_string(html_path)?;
    let rows = extract_rows(config, &html, period)?;

    let found = rows.iter().filter(|row| row.value.is_found()).count();
    log::info(&format!("{} of {} periods found", found, rows.len()));
    Ok(rows)
}

/// Current and previous rows for `period` from one document.
pub fn extract_rows(
    config: &Config,
    html: &str,
    period: Period,
) -> Result<Vec<ExtractionRow>> {
    let scanner = TableScanner::new(config.extraction.value_headers.clone())?;

    [
        (PeriodLabel::Current, period),
        (PeriodLabel::Previous, period.previous()),
    ]
    .into_iter()
    .map(|(label, period)| -> Result<ExtractionRow> {
        let matcher = PeriodMatcher::new(period)?;
        let (value, method) = match scanner.scan(html, &matcher) {
            Some(value) => (PeriodValue::Found(value), ExtractionMethod::TableScan),
            None => (PeriodValue::NotFound, ExtractionMethod::None),
        };
        Ok(ExtractionRow {
            label,
            period,
            value,
            method,
        })
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const PAGE: &str = r#"<html><body><table>
        <tr><th>년월</th><th>수출금액</th><th>전년대비</th></tr>
        <tr><td>2026년 02월</td><td>98,100</td><td>1.5%</td></tr>
        <tr><td>2026년 01월</td><td>97,002</td><td>0.4%</td></tr>
    </table></body></html>"#;

    #[test]
    fn test_extract_rows() {
        let period = Period::new(2026, 2).unwrap();
        let rows = extract_rows(&Config::default(), PAGE, period).unwrap();
        assert_eq!(rows[0].value, PeriodValue::Found("98,100".into()));
        assert_eq!(rows[1].period, Period::new(2026, 1).unwrap());
        assert_eq!(rows[1].value, PeriodValue::Found("97,002".into()));
    }

    #[test]
    fn test_run_extract_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("detail.html");
        fs::write(&path, PAGE).unwrap();

        let period = Period::new(2026, 1).unwrap();
        let rows = run_extract(&Config::default(), &path, period).unwrap();
        assert_eq!(rows[0].value, PeriodValue::Found("97,002".into()));
        assert_eq!(rows[1].value, PeriodValue::NotFound);
    }

    #[test]
    fn test_missing_file() {
        let result = run_extract(
            &Config::default(),
            Path::new("/nonexistent/detail.html"),
            Period::new(2026, 1).unwrap(),
        );
        assert!(result.is_err());
    }
}
