// src/services/extractor.rs

//! Monthly figure extraction from result tables.
//!
//! ## Row match
//!
//! A row matches a period when one of its cells carries the year-month token
//! (`2025.12`, `2025-12`, `2025/12`, `2025년 12월`), or when a cell reads exactly
//! the month label (`12월`) and the table's year context agrees. The year
//! context is set by year-group rows whose first cell is `2025` or `2025년`.
//!
//! ## Column selection
//!
//! 1. If a header cell names a configured value column and the matched row's
//!    cell in that column is a plain number, use it.
//! 2. Otherwise use the first cell right of the label cell that is a plain
//!    number (digits with optional `,` grouping).
//!
//! Percentages and decimals are never plain numbers, so a change-rate column
//! cannot be picked by accident.
//!
//! ## Aggregate rows
//!
//! Cells spanning several months (`2026.01~2026.06`, `누계`, two or more
//! year-month tokens) never match a single period, even when the range starts
//! at the requested month.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::browser::Browser;
use crate::error::{AppError, Result};
use crate::models::{
    Config, ExtractionMethod, ExtractionRow, FocusConfig, Period, PeriodLabel, PeriodValue,
    WaitConfig,
};
use crate::services::focus;
use crate::services::locate::collect_sources;
use crate::utils::{Poller, is_plain_number, normalize_whitespace};

/// Recognizes the cells that name one period.
#[derive(Debug, Clone)]
pub struct PeriodMatcher {
    period: Period,
    token: Regex,
    month_label: Regex,
    any_token: Regex,
    aggregate: Regex,
}

impl PeriodMatcher {
    pub fn new(period: Period) -> Result<Self> {
        let token = Regex::new(&format!(
            r"(?:^|\D){}\s*(?:[./-]|년)\s*0?{}(?:\s*월)?(?:\D|$)",
            period.year, period.month
        ))
        .map_err(|e| AppError::validation(format!("period token pattern: {e}")))?;
        let month_label = Regex::new(&format!(r"^0?{}\s*월$", period.month))
            .map_err(|e| AppError::validation(format!("month label pattern: {e}")))?;
        let any_token = Regex::new(r"\d{4}\s*(?:[./-]|년)\s*\d{1,2}")
            .map_err(|e| AppError::validation(format!("year-month pattern: {e}")))?;
        let aggregate = Regex::new(r"[~∼～]|누계|누적")
            .map_err(|e| AppError::validation(format!("aggregate pattern: {e}")))?;

        Ok(Self {
            period,
            token,
            month_label,
            any_token,
            aggregate,
        })
    }

    pub fn period(&self) -> Period {
        self.period
    }

    /// Cell carries the full year-month token and names no other month.
    pub fn is_token(&self, text: &str) -> bool {
        self.token.is_match(text) && !self.is_aggregate(text)
    }

    /// Cell labels a multi-month range or a running total.
    pub fn is_aggregate(&self, text: &str) -> bool {
        self.aggregate.is_match(text) || self.any_token.find_iter(text).nth(1).is_some()
    }

    /// Cell reads exactly the month label.
    pub fn is_month_label(&self, text: &str) -> bool {
        self.month_label.is_match(text)
    }

    pub fn matches(&self, text: &str) -> bool {
        self.is_token(text) || self.is_month_label(text)
    }
}

/// Pure table scan over a document.
#[derive(Debug, Clone)]
pub struct TableScanner {
    value_headers: Vec<String>,
    tables: Selector,
    rows: Selector,
    cells: Selector,
    year_row: Regex,
}

impl TableScanner {
    pub fn new(value_headers: Vec<String>) -> Result<Self> {
        Ok(Self {
            value_headers,
            tables: parse_selector("table")?,
            rows: parse_selector("tr")?,
            cells: parse_selector("th, td")?,
            year_row: Regex::new(r"^(\d{4})\s*년?$")
                .map_err(|e| AppError::validation(format!("year row pattern: {e}")))?,
        })
    }

    /// Value for the period, or `None` when no verified row carries one.
    pub fn scan(&self, html: &str, matcher: &PeriodMatcher) -> Option<String> {
        let doc = Html::parse_document(html);
        doc.select(&self.tables)
            .find_map(|table| self.scan_table(table, matcher))
    }

    fn scan_table(&self, table: ElementRef<'_>, matcher: &PeriodMatcher) -> Option<String> {
        let mut value_column: Option<usize> = None;
        let mut year_context: Option<i32> = None;

        let rows = table
            .select(&self.rows)
            .filter(|row| owned_by(*row, "table", table));

        for row in rows {
            let cells: Vec<String> = row
                .select(&self.cells)
                .filter(|cell| owned_by(*cell, "tr", row))
                .map(|cell| normalize_whitespace(&cell.text().collect::<String>()))
                .collect();
            if cells.is_empty() {
                continue;
            }

            if value_column.is_none() {
                if let Some(col) = self.header_column(&cells) {
                    value_column = Some(col);
                    continue;
                }
            }

            if let Some(year) = self
                .year_row
                .captures(&cells[0])
                .and_then(|caps| caps[1].parse::<i32>().ok())
            {
                year_context = Some(year);
            }

            let Some(label_idx) = self.match_label(&cells, matcher, year_context) else {
                continue;
            };

            if let Some(value) = pick_value(&cells, label_idx, value_column) {
                log::debug!(
                    "Row for {} matched at cell {}: {:?}",
                    matcher.period(),
                    label_idx,
                    cells
                );
                return Some(value);
            }
        }
        None
    }

    fn header_column(&self, cells: &[String]) -> Option<usize> {
        cells.iter().position(|text| {
            self.value_headers
                .iter()
                .any(|header| text.contains(header.as_str()))
        })
    }

    /// Index of the cell naming the period, with the month-label match
    /// verified against the year context.
    fn match_label(
        &self,
        cells: &[String],
        matcher: &PeriodMatcher,
        year_context: Option<i32>,
    ) -> Option<usize> {
        if let Some(idx) = cells.iter().position(|text| matcher.is_token(text)) {
            return Some(idx);
        }
        let idx = cells.iter().position(|text| matcher.is_month_label(text))?;
        match year_context {
            Some(year) if year != matcher.period().year => None,
            _ => Some(idx),
        }
    }
}

fn pick_value(cells: &[String], label_idx: usize, value_column: Option<usize>) -> Option<String> {
    let label = &cells[label_idx];

    if let Some(col) = value_column.filter(|&col| col != label_idx) {
        if let Some(text) = cells.get(col).filter(|text| is_plain_number(text)) {
            return Some(text.clone());
        }
    }

    cells
        .iter()
        .skip(label_idx + 1)
        .find(|text| *text != label && is_plain_number(text))
        .cloned()
}

/// Whether the closest `tag` ancestor of `el` is `owner`.
fn owned_by(el: ElementRef<'_>, tag: &str, owner: ElementRef<'_>) -> bool {
    el.ancestors()
        .find(|node| node.value().as_element().is_some_and(|e| e.name() == tag))
        .is_some_and(|node| node.id() == owner.id())
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AppError::selector(css, format!("{e:?}")))
}

/// Extracts one period's figure from the positioned browser.
pub struct Extractor<'a> {
    scanner: TableScanner,
    waits: &'a WaitConfig,
    focus: Option<&'a FocusConfig>,
}

impl<'a> Extractor<'a> {
    pub fn new(config: &'a Config) -> Result<Self> {
        Ok(Self {
            scanner: TableScanner::new(config.extraction.value_headers.clone())?,
            waits: &config.waits,
            focus: config.extraction.focus.as_ref(),
        })
    }

    /// Never fails: errors are reported inline as [`PeriodValue::Failed`].
    ///
    /// `step` counts periods back from the current one (0 = current).
    pub async fn extract(
        &self,
        browser: &mut dyn Browser,
        label: PeriodLabel,
        period: Period,
        step: usize,
    ) -> ExtractionRow {
        let (value, method) = match self.try_extract(browser, period, step).await {
            Ok(Some((value, method))) => (PeriodValue::Found(value), method),
            Ok(None) => (PeriodValue::NotFound, ExtractionMethod::None),
            Err(e) => {
                log::warn!("Extraction for {} failed: {}", period, e);
                (PeriodValue::Failed(e.to_string()), ExtractionMethod::None)
            }
        };
        ExtractionRow {
            label,
            period,
            value,
            method,
        }
    }

    async fn try_extract(
        &self,
        browser: &mut dyn Browser,
        period: Period,
        step: usize,
    ) -> Result<Option<(String, ExtractionMethod)>> {
        let matcher = PeriodMatcher::new(period)?;

        let mut poll = Poller::from_millis(self.waits.extraction_ms, self.waits.interval());
        loop {
            let sources = collect_sources(browser).await?;
            if let Some(value) = sources
                .iter()
                .find_map(|html| self.scanner.scan(html, &matcher))
            {
                return Ok(Some((value, ExtractionMethod::TableScan)));
            }
            if !poll.tick().await {
                break;
            }
        }
        log::info!("No table row for {} after {} polls", period, poll.attempts());

        if let Some(focus) = self.focus {
            let value = focus::traverse(browser, focus, &matcher, step, self.waits).await?;
            return Ok(value.map(|v| (v, ExtractionMethod::FocusTraversal)));
        }
        Ok(None)
    }
}
