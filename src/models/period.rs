//! Calendar periods (year, month) used to address monthly figures.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    /// Create a period, rejecting months outside `1..=12`.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(AppError::validation(format!("month out of range: {month}")));
        }
        Ok(Self { year, month })
    }

    /// The period containing the given date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The immediately preceding calendar month.
    pub fn previous(self) -> Self {
        if self.month > 1 {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        } else {
            Self {
                year: self.year - 1,
                month: 12,
            }
        }
    }

    /// Compact form used in file names, e.g. `202512`.
    pub fn compact(self) -> String {
        format!("{}{:02}", self.year, self.month)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = AppError;

    /// Accepts `YYYY-MM`, `YYYY.MM` and `YYYY/MM`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (year, month) = s
            .split_once(['-', '.', '/'])
            .ok_or_else(|| AppError::validation(format!("expected YYYY-MM, got '{s}'")))?;

        let year: i32 = year
            .parse()
            .map_err(|_| AppError::validation(format!("invalid year in '{s}'")))?;
        let month: u32 = month
            .parse()
            .map_err(|_| AppError::validation(format!("invalid month in '{s}'")))?;

        Self::new(year, month)
    }
}
