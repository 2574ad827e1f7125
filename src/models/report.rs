//! Query results.

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};

use super::{Period, Stage};

/// Which of the two target periods a row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodLabel {
    Current,
    Previous,
}

impl PeriodLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            PeriodLabel::Current => "current",
            PeriodLabel::Previous => "previous",
        }
    }
}

impl fmt::Display for PeriodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An extracted figure. Values are kept exactly as displayed on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodValue {
    Found(String),
    NotFound,
    /// Extraction hit an error; the diagnostic is shown in place of the value.
    Failed(String),
}

impl PeriodValue {
    pub fn is_found(&self) -> bool {
        matches!(self, PeriodValue::Found(_))
    }

    pub fn as_found(&self) -> Option<&str> {
        match self {
            PeriodValue::Found(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for PeriodValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodValue::Found(v) => f.write_str(v),
            PeriodValue::NotFound => f.write_str("not found"),
            PeriodValue::Failed(msg) => write!(f, "error: {msg}"),
        }
    }
}

impl Serialize for PeriodValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Strategy that produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    TableScan,
    FocusTraversal,
    None,
}

/// One line of the result table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionRow {
    pub label: PeriodLabel,
    #[serde(serialize_with = "serialize_display")]
    pub period: Period,
    pub value: PeriodValue,
    pub method: ExtractionMethod,
}

/// Completed query. Rows are ordered current first, then previous.
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub code: String,
    pub rows: Vec<ExtractionRow>,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl QueryReport {
    pub fn row(&self, label: PeriodLabel) -> Option<&ExtractionRow> {
        self.rows.iter().find(|r| r.label == label)
    }

    pub fn found_count(&self) -> usize {
        self.rows.iter().filter(|r| r.value.is_found()).count()
    }
}

/// Aborted query with diagnostics.
#[derive(Debug, Clone)]
pub struct QueryFailure {
    pub code: String,
    /// Last stage reached before the failure
    pub stage: Stage,
    pub message: String,
    /// PNG of the viewport at the time of failure, when one could be captured
    pub screenshot: Option<Vec<u8>>,
}

/// Terminal result of a query.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Completed(QueryReport),
    Failed(QueryFailure),
}

impl QueryOutcome {
    pub fn report(&self) -> Option<&QueryReport> {
        match self {
            QueryOutcome::Completed(report) => Some(report),
            QueryOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&QueryFailure> {
        match self {
            QueryOutcome::Completed(_) => None,
            QueryOutcome::Failed(failure) => Some(failure),
        }
    }
}

fn serialize_display<T: fmt::Display, S: Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_display() {
        assert_eq!(PeriodValue::Found("1,230,456".into()).to_string(), "1,230,456");
        assert_eq!(PeriodValue::NotFound.to_string(), "not found");
        assert_eq!(
            PeriodValue::Failed("no such window".into()).to_string(),
            "error: no such window"
        );
    }

    #[test]
    fn row_serializes_flat() {
        let row = ExtractionRow {
            label: PeriodLabel::Previous,
            period: Period::new(2025, 12).unwrap(),
            value: PeriodValue::Found("1,150,321".into()),
            method: ExtractionMethod::TableScan,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["label"], "previous");
        assert_eq!(json["period"], "2025-12");
        assert_eq!(json["value"], "1,150,321");
        assert_eq!(json["method"], "table-scan");
    }
}
