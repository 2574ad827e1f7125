// src/pipeline/query.rs

//! One browser session per query, from entry page to extracted rows.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use chrono::Local;
use futures::FutureExt;

use crate::browser::{Browser, BrowserFactory};
use crate::error::Result;
use crate::models::{
    Config, ExtractionRow, PeriodLabel, Query, QueryFailure, QueryOutcome, QueryReport, Stage,
    StageTracker,
};
use crate::services::{Extractor, Navigator};
use crate::utils::log;

const TOTAL_STEPS: usize = 3;

/// Run one query in a fresh browser session.
///
/// Never returns an error: every failure is folded into
/// [`QueryOutcome::Failed`] with the stage reached. Once a session is open it
/// is terminated exactly once, whatever happens in between.
pub async fn run_query(
    config: &Config,
    factory: &dyn BrowserFactory,
    query: &Query,
) -> QueryOutcome {
    let started_at = Local::now();
    let mut tracker = StageTracker::new();

    if let Err(e) = query.validate_code(&config.site.code_pattern) {
        return failed(query, tracker.fail(), e.to_string(), None);
    }

    log::step(
        1,
        TOTAL_STEPS,
        &format!("Opening browser session for {}", query.code),
    );
    let mut browser = match factory.open().await {
        Ok(browser) => browser,
        Err(e) => {
            let message = format!("could not start browser session: {e}");
            log::error(&message);
            return failed(query, tracker.fail(), message, None);
        }
    };

    let driven = AssertUnwindSafe(drive(config, browser.as_mut(), query, &mut tracker))
        .catch_unwind()
        .await;

    let outcome = match driven {
        Ok(Ok(rows)) => {
            tracker.advance(Stage::Done);
            QueryOutcome::Completed(QueryReport {
                code: query.code.clone(),
                rows,
                started_at,
                finished_at: Local::now(),
            })
        }
        Ok(Err(e)) => {
            let stage = tracker.fail();
            log::error(&format!("Query {} failed after {}: {}", query.code, stage, e));
            let screenshot = capture(browser.as_mut()).await;
            failed(query, stage, e.to_string(), screenshot)
        }
        Err(panic) => {
            let stage = tracker.fail();
            let message = format!("query aborted: {}", panic_message(panic.as_ref()));
            log::error(&format!("Query {} {}", query.code, message));
            let screenshot = capture(browser.as_mut()).await;
            failed(query, stage, message, screenshot)
        }
    };

    if let Err(e) = browser.quit().await {
        log::warn(&format!("Browser session did not terminate cleanly: {e}"));
    }
    outcome
}

/// Run queries one after another, each in its own session.
pub async fn run_batch(
    config: &Config,
    factory: &dyn BrowserFactory,
    queries: &[Query],
) -> Vec<QueryOutcome> {
    let mut outcomes = Vec::with_capacity(queries.len());
    for (i, query) in queries.iter().enumerate() {
        log::header(&format!("Query {}/{}: {}", i + 1, queries.len(), query.code));
        outcomes.push(run_query(config, factory, query).await);
    }
    outcomes
}

async fn drive(
    config: &Config,
    browser: &mut dyn Browser,
    query: &Query,
    tracker: &mut StageTracker,
) -> Result<Vec<ExtractionRow>> {
    log::step(2, TOTAL_STEPS, "Navigating to the result page");
    Navigator::new(config)
        .navigate(browser, &query.code, tracker)
        .await?;

    log::step(
        3,
        TOTAL_STEPS,
        &format!("Extracting {} and {}", query.current, query.previous),
    );
    let extractor = Extractor::new(config)?;

    let current = extractor
        .extract(browser, PeriodLabel::Current, query.current, 0)
        .await;
    tracker.advance(Stage::CurrentExtracted);
    log::sub_item(&format!("{}: {}", query.current, current.value));

    let previous = extractor
        .extract(browser, PeriodLabel::Previous, query.previous, 1)
        .await;
    tracker.advance(Stage::PreviousExtracted);
    log::sub_item(&format!("{}: {}", query.previous, previous.value));

    Ok(vec![current, previous])
}

async fn capture(browser: &mut dyn Browser) -> Option<Vec<u8>> {
    match browser.screenshot().await {
        Ok(png) => Some(png),
        Err(e) => {
            log::warn(&format!("Screenshot unavailable: {e}"));
            None
        }
    }
}

fn failed(
    query: &Query,
    stage: Stage,
    message: String,
    screenshot: Option<Vec<u8>>,
) -> QueryOutcome {
    QueryOutcome::Failed(QueryFailure {
        code: query.code.clone(),
        stage,
        message,
        screenshot,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("panic")
}
