// src/services/focus.rs

//! Keyboard focus traversal from a fixed anchor control.
//!
//! Used only when the table scan misses. The label cell reached by tabbing is
//! read back and must name the requested period before the value is trusted.
//!
//! With `toggle_year` set, the year group is expanded first, but only while no
//! cell names the period yet. A second click would collapse it again.

use scraper::Html;

use crate::browser::Browser;
use crate::error::Result;
use crate::models::{FocusConfig, Locator, WaitConfig};
use crate::services::extractor::PeriodMatcher;
use crate::services::locate::{Lookup, wait_for_any};
use crate::utils::{Poller, is_plain_number, normalize_whitespace};

/// Value reached by tabbing, or `None` when the anchor is missing, the label
/// does not verify, or the value cell is not a plain number.
pub async fn traverse(
    browser: &mut dyn Browser,
    focus: &FocusConfig,
    matcher: &PeriodMatcher,
    step: usize,
    waits: &WaitConfig,
) -> Result<Option<String>> {
    let period = matcher.period();
    let lookup = wait_for_any(
        browser,
        std::slice::from_ref(&focus.anchor),
        waits.extraction_ms,
        waits.interval(),
    )
    .await?;
    let Lookup::Found { locator: anchor, .. } = lookup else {
        log::info!("Focus anchor {} not present", focus.anchor);
        return Ok(None);
    };

    if focus.toggle_year {
        reveal_year(browser, matcher, waits).await?;
    }

    browser.click(&anchor).await?;
    browser
        .press_tab(focus.label_tabs + step * focus.period_stride)
        .await?;

    let label = normalize_whitespace(&browser.focused_text().await?);
    if !matcher.matches(&label) {
        log::warn!(
            "Focus traversal for {} landed on {:?}; value discarded",
            period,
            label
        );
        return Ok(None);
    }

    browser.press_tab(focus.value_tabs).await?;
    let value = normalize_whitespace(&browser.focused_text().await?);
    if is_plain_number(&value) {
        log::debug!("Focus traversal for {} read {}", period, value);
        Ok(Some(value))
    } else {
        log::info!("Focus traversal for {} read non-numeric {:?}", period, value);
        Ok(None)
    }
}

/// Expand the year group holding the period unless its label is already shown,
/// then wait for the label to appear.
async fn reveal_year(
    browser: &mut dyn Browser,
    matcher: &PeriodMatcher,
    waits: &WaitConfig,
) -> Result<()> {
    if label_shown(browser, matcher).await? {
        return Ok(());
    }

    let year = Locator::text(matcher.period().year.to_string());
    if !browser.exists(&year).await? {
        log::debug!("No year toggle {} on the page", year);
        return Ok(());
    }
    browser.click(&year).await?;

    let mut poll = Poller::from_millis(waits.extraction_ms, waits.interval());
    loop {
        if label_shown(browser, matcher).await? {
            log::debug!("Year {} expanded", matcher.period().year);
            return Ok(());
        }
        if !poll.tick().await {
            break;
        }
    }
    log::info!(
        "Label for {} still hidden after expanding the year",
        matcher.period()
    );
    Ok(())
}

/// Whether any text node of the current document names the period.
async fn label_shown(browser: &mut dyn Browser, matcher: &PeriodMatcher) -> Result<bool> {
    let html = browser.source().await?;
    let doc = Html::parse_document(&html);
    let shown = doc
        .root_element()
        .text()
        .any(|text| matcher.matches(&normalize_whitespace(text)));
    Ok(shown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{FixtureDocument, FixtureFactory, FixtureSite};
    use crate::models::Period;

    const GRID: &str = r#"<html><body>
        <button id="btnExcel">엑셀</button>
        <span tabindex="0">2026년</span>
        <span tabindex="0">1월</span><span tabindex="0">1,230,456</span>
        <span tabindex="0">12월</span><span tabindex="0">1,150,321</span>
    </body></html>"#;

    fn focus_config() -> FocusConfig {
        FocusConfig {
            anchor: Locator::id("btnExcel"),
            toggle_year: false,
            label_tabs: 2,
            value_tabs: 1,
            period_stride: 2,
        }
    }

    fn waits() -> WaitConfig {
        WaitConfig {
            extraction_ms: 10,
            poll_interval_ms: 5,
            ..WaitConfig::default()
        }
    }

    async fn run(period: Period, step: usize) -> Option<String> {
        run_on(GRID, &focus_config(), period, step).await.1
    }

    async fn run_on(
        html: &str,
        focus: &FocusConfig,
        period: Period,
        step: usize,
    ) -> (Vec<String>, Option<String>) {
        let factory = FixtureFactory::new(FixtureSite {
            entry: FixtureDocument::new(html),
            ..FixtureSite::default()
        });
        let mut browser = factory.open_fixture();
        browser.goto("x").await.unwrap();
        let matcher = PeriodMatcher::new(period).unwrap();
        let value = traverse(&mut browser, focus, &matcher, step, &waits())
            .await
            .unwrap();
        (browser.clicked().to_vec(), value)
    }

    #[tokio::test]
    async fn test_reads_current_and_previous() {
        assert_eq!(
            run(Period::new(2026, 1).unwrap(), 0).await,
            Some("1,230,456".to_string())
        );
        assert_eq!(
            run(Period::new(2025, 12).unwrap(), 1).await,
            Some("1,150,321".to_string())
        );
    }

    #[tokio::test]
    async fn test_wrong_label_is_rejected() {
        // Step 0 lands on "1월", which does not name December
        assert_eq!(run(Period::new(2025, 12).unwrap(), 0).await, None);
    }

    #[tokio::test]
    async fn test_expanded_year_is_not_clicked_again() {
        let focus = FocusConfig {
            toggle_year: true,
            ..focus_config()
        };
        for _ in 0..3 {
            let (clicked, value) = run_on(GRID, &focus, Period::new(2026, 1).unwrap(), 0).await;
            assert_eq!(value, Some("1,230,456".to_string()));
            assert_eq!(clicked, vec!["엑셀".to_string()]);
        }
    }

    #[tokio::test]
    async fn test_collapsed_year_is_clicked_once() {
        let collapsed = r#"<html><body>
            <button id="btnExcel">엑셀</button>
            <span tabindex="0">2025년</span>
        </body></html>"#;
        let focus = FocusConfig {
            toggle_year: true,
            ..focus_config()
        };
        let (clicked, value) = run_on(collapsed, &focus, Period::new(2025, 12).unwrap(), 0).await;
        // The label never appears, so the traversal reads nothing
        assert_eq!(value, None);
        assert_eq!(clicked, vec!["2025년".to_string(), "엑셀".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_anchor() {
        let factory = FixtureFactory::new(FixtureSite {
            entry: FixtureDocument::new("<p>empty</p>"),
            ..FixtureSite::default()
        });
        let mut browser = factory.open_fixture();
        browser.goto("x").await.unwrap();
        let matcher = PeriodMatcher::new(Period::new(2026, 1).unwrap()).unwrap();
        let value = traverse(&mut browser, &focus_config(), &matcher, 0, &waits())
            .await
            .unwrap();
        assert_eq!(value, None);
    }
}
