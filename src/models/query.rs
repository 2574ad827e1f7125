//! A single query: one classification code and its two target periods.

use chrono::{Local, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

use super::Period;

/// Input for one run of the navigator/extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Classification code, entered verbatim
    pub code: String,

    /// Wall-clock month at run start
    pub current: Period,

    /// Month preceding `current`
    pub previous: Period,
}

impl Query {
    /// Build a query whose periods derive from `today`.
    pub fn new(code: impl Into<String>, today: NaiveDate) -> Self {
        let current = Period::from_date(today);
        Self {
            code: code.into(),
            current,
            previous: current.previous(),
        }
    }

    /// Build a query from the local clock.
    pub fn at_now(code: impl Into<String>) -> Self {
        Self::new(code, Local::now().date_naive())
    }

    /// Check the code against the configured pattern.
    pub fn validate_code(&self, pattern: &str) -> Result<()> {
        let re = Regex::new(pattern)
            .map_err(|e| AppError::config(format!("invalid site.code_pattern: {e}")))?;
        if re.is_match(&self.code) {
            Ok(())
        } else {
            Err(AppError::validation(format!(
                "classification code '{}' does not match {}",
                self.code, pattern
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn january_query_targets_december() {
        let q = Query::new("847950", NaiveDate::from_ymd_opt(2026, 1, 15).unwrap());
        assert_eq!(q.current, Period::new(2026, 1).unwrap());
        assert_eq!(q.previous, Period::new(2025, 12).unwrap());
        assert_eq!(q.code, "847950");
    }

    #[test]
    fn code_pattern_validation() {
        let date = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        assert!(Query::new("847950", date).validate_code(r"^\d{4,10}$").is_ok());
        assert!(Query::new("84 79", date).validate_code(r"^\d{4,10}$").is_err());
        assert!(Query::new("847950", date).validate_code("(").is_err());
    }
}
