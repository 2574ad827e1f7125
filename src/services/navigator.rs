// src/services/navigator.rs

//! Drives the portal from the entry page to the result window.

use std::time::Duration;

use crate::browser::Browser;
use crate::error::{AppError, Result};
use crate::models::{Config, EntryMode, Locator, SiteConfig, Stage, StageTracker, WaitConfig};
use crate::services::locate::{Lookup, first_present, wait_for_any};
use crate::utils::Poller;

/// Navigation steps for one configured portal layout.
pub struct Navigator<'a> {
    site: &'a SiteConfig,
    waits: &'a WaitConfig,
}

impl<'a> Navigator<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            site: &config.site,
            waits: &config.waits,
        }
    }

    /// Position `browser` on the result context for `code`.
    ///
    /// Advances `tracker` as stages complete. A lookup that never succeeds
    /// ends in [`AppError::Navigation`] carrying the last stage reached;
    /// browser errors are returned unchanged.
    pub async fn navigate(
        &self,
        browser: &mut dyn Browser,
        code: &str,
        tracker: &mut StageTracker,
    ) -> Result<()> {
        self.open_menu(browser, tracker).await?;
        tracker.advance(Stage::MenuNavigated);

        let field = self.locate_field(browser, tracker).await?;
        tracker.advance(Stage::FrameLocated);

        self.enter_code(browser, &field, code, tracker).await?;
        self.submit(browser, &field).await?;
        tracker.advance(Stage::CodeSubmitted);

        self.open_result(browser, code, tracker).await?;
        tracker.advance(Stage::ResultOpened);
        Ok(())
    }

    async fn open_menu(&self, browser: &mut dyn Browser, tracker: &StageTracker) -> Result<()> {
        log::info!("Loading {}", self.site.entry_url);
        browser.goto(&self.site.entry_url).await?;

        for (step, labels) in self.site.menu_path.iter().enumerate() {
            let candidates: Vec<Locator> = labels.iter().map(Locator::text).collect();
            // The first step doubles as the page-ready check
            let timeout = if step == 0 {
                self.waits.page_ready_ms
            } else {
                self.waits.results_ms
            };

            match wait_for_any(browser, &candidates, timeout, self.interval()).await? {
                Lookup::Found { locator, frame } => {
                    log::debug!("Menu step {} via {} in frame {:?}", step + 1, locator, frame);
                    browser.click(&locator).await?;
                }
                Lookup::NotFound { .. } if step == 0 => {
                    return Err(AppError::navigation(
                        tracker.current(),
                        "entry page did not show the menu",
                    ));
                }
                Lookup::NotFound { .. } => {
                    return Err(AppError::navigation(
                        tracker.current(),
                        format!("menu entry not found: {}", labels.join(" | ")),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Leaves the browser in the frame holding the field.
    async fn locate_field(
        &self,
        browser: &mut dyn Browser,
        tracker: &StageTracker,
    ) -> Result<Locator> {
        let lookup = wait_for_any(
            browser,
            &self.site.code_field,
            self.waits.page_ready_ms,
            self.interval(),
        )
        .await?;

        match lookup {
            Lookup::Found { locator, frame } => {
                log::info!("Code field {} in frame {:?}", locator, frame);
                Ok(locator)
            }
            Lookup::NotFound { frames_searched } => {
                log::warn!("No code field candidate in {} frames", frames_searched);
                Err(AppError::navigation(
                    tracker.current(),
                    "could not locate the input field",
                ))
            }
        }
    }

    async fn enter_code(
        &self,
        browser: &mut dyn Browser,
        field: &Locator,
        code: &str,
        tracker: &StageTracker,
    ) -> Result<()> {
        match self.site.entry_mode {
            EntryMode::Type => browser.type_text(field, code).await?,
            EntryMode::Script => browser.set_value(field, code).await?,
        }

        let mut entered = browser.value(field).await?;
        if entered != code {
            log::debug!(
                "Field holds {:?} after {:?} entry, assigning by script",
                entered,
                self.site.entry_mode
            );
            browser.set_value(field, code).await?;
            entered = browser.value(field).await?;
        }

        if entered == code {
            Ok(())
        } else {
            Err(AppError::navigation(
                tracker.current(),
                format!("code field holds {entered:?} instead of {code:?}"),
            ))
        }
    }

    async fn submit(&self, browser: &mut dyn Browser, field: &Locator) -> Result<()> {
        match first_present(browser, &self.site.submit).await? {
            Some(control) => {
                log::debug!("Submitting via {}", control);
                browser.click(&control).await
            }
            None => {
                log::debug!("No submit control, pressing Enter");
                browser.press_enter(field).await
            }
        }
    }

    async fn open_result(
        &self,
        browser: &mut dyn Browser,
        code: &str,
        tracker: &StageTracker,
    ) -> Result<()> {
        let link = [Locator::link_text(code)];
        let lookup = wait_for_any(browser, &link, self.waits.results_ms, self.interval()).await?;
        let Lookup::Found { locator, .. } = lookup else {
            return Err(AppError::navigation(
                tracker.current(),
                "no results link appeared",
            ));
        };

        let before = browser.window_count().await?;
        browser.click(&locator).await?;

        let mut poll = Poller::from_millis(self.waits.popup_ms, self.interval());
        loop {
            if browser.window_count().await? > before {
                browser.switch_to_newest_window().await?;
                log::info!("Switched to result window");
                return Ok(());
            }
            if !poll.tick().await {
                break;
            }
        }
        log::info!("No new window; reading results in place");
        Ok(())
    }

    fn interval(&self) -> Duration {
        self.waits.interval()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{FixtureBrowser, FixtureDocument, FixtureFactory, FixtureSite};

    const MENU: &str = r##"<html><body>
        <ul><li><a href="#">품목수출입</a></li><li><a href="#">상세정보</a></li></ul>
    </body></html>"##;

    const SEARCH: &str = r#"<html><body>
        <input type="text" id="s_hsk_cd" value="">
        <button type="button" data-fixture-action="submit">조회</button>
    </body></html>"#;

    const RESULTS: &str = r##"<html><body>
        <table><tr><td><a href="#" data-fixture-action="open-popup">847950 기타</a></td></tr></table>
    </body></html>"##;

    fn site() -> FixtureSite {
        FixtureSite {
            entry: FixtureDocument::new(MENU).with_frame(
                FixtureDocument::new("<p>layout</p>").with_frame(FixtureDocument::new(SEARCH)),
            ),
            results: Some(FixtureDocument::new(RESULTS)),
            popup: Some(FixtureDocument::new("<table><tr><td>popup</td></tr></table>")),
            ..FixtureSite::default()
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.waits.poll_interval_ms = 5;
        config.waits.page_ready_ms = 20;
        config.waits.results_ms = 20;
        config.waits.popup_ms = 20;
        config
    }

    async fn navigate(
        site: FixtureSite,
        config: &Config,
        code: &str,
    ) -> (FixtureBrowser, StageTracker, Result<()>) {
        let factory = FixtureFactory::new(site);
        let mut browser = factory.open_fixture();
        let mut tracker = StageTracker::new();
        let result = Navigator::new(config)
            .navigate(&mut browser, code, &mut tracker)
            .await;
        (browser, tracker, result)
    }

    #[tokio::test]
    async fn test_reaches_popup() {
        let config = config();
        let (mut browser, tracker, result) = navigate(site(), &config, "847950").await;
        result.unwrap();

        assert_eq!(tracker.current(), Stage::ResultOpened);
        assert_eq!(browser.visited(), &["https://stat.kita.net/".to_string()]);
        assert_eq!(
            browser.clicked(),
            &["품목수출입", "상세정보", "조회", "847950 기타"].map(String::from)
        );
        assert!(browser.source().await.unwrap().contains("popup"));
    }

    #[tokio::test]
    async fn test_code_is_entered_exactly() {
        let config = config();
        for code in ["847950", "0101", "8542310000"] {
            let mut site = site();
            site.results = None;
            let factory = FixtureFactory::new(site);
            let mut browser = factory.open_fixture();
            let navigator = Navigator::new(&config);
            let mut tracker = StageTracker::new();

            navigator.open_menu(&mut browser, &tracker).await.unwrap();
            let field = navigator.locate_field(&mut browser, &tracker).await.unwrap();
            navigator
                .enter_code(&mut browser, &field, code, &mut tracker)
                .await
                .unwrap();
            assert_eq!(browser.value(&field).await.unwrap(), code);
        }
    }

    #[tokio::test]
    async fn test_script_fallback_when_typing_is_ignored() {
        let config = config();
        let mut site = site();
        site.ignore_typing = true;
        let (_, tracker, result) = navigate(site, &config, "847950").await;
        result.unwrap();
        assert_eq!(tracker.current(), Stage::ResultOpened);
    }

    #[tokio::test]
    async fn test_missing_field_fails_after_menu() {
        let config = config();
        let mut site = site();
        site.entry.frames[0].frames[0] = FixtureDocument::new("<p>maintenance</p>");
        let (_, tracker, result) = navigate(site, &config, "847950").await;

        assert_eq!(tracker.current(), Stage::MenuNavigated);
        match result {
            Err(AppError::Navigation(e)) => {
                assert_eq!(e.stage, Stage::MenuNavigated);
                assert_eq!(e.reason, "could not locate the input field");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_menu_fails_at_init() {
        let config = config();
        let mut site = site();
        site.entry.html = "<p>점검중</p>".to_string();
        let (_, _, result) = navigate(site, &config, "847950").await;
        match result {
            Err(AppError::Navigation(e)) => {
                assert_eq!(e.stage, Stage::Init);
                assert_eq!(e.reason, "entry page did not show the menu");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_results_link() {
        let config = config();
        let mut site = site();
        site.results = Some(FixtureDocument::new("<p>조회 결과가 없습니다</p>"));
        let (_, tracker, result) = navigate(site, &config, "847950").await;

        assert_eq!(tracker.current(), Stage::CodeSubmitted);
        assert!(matches!(
            result,
            Err(AppError::Navigation(ref e)) if e.reason == "no results link appeared"
        ));
    }

    #[tokio::test]
    async fn test_enter_submits_without_control() {
        let config = config();
        let mut site = site();
        site.entry.frames[0].frames[0] =
            FixtureDocument::new(r#"<input type="text" name="hskCode">"#);
        let (browser, tracker, result) = navigate(site, &config, "847950").await;
        result.unwrap();
        assert_eq!(tracker.current(), Stage::ResultOpened);
        assert!(!browser.clicked().contains(&"조회".to_string()));
    }

    #[tokio::test]
    async fn test_result_in_same_window() {
        let config = config();
        let mut site = site();
        site.popup = None;
        let (mut browser, tracker, result) = navigate(site, &config, "847950").await;
        result.unwrap();
        assert_eq!(tracker.current(), Stage::ResultOpened);
        assert_eq!(browser.window_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_browser_errors_propagate() {
        let config = config();
        let mut site = site();
        site.fault = Some(crate::browser::FaultPoint::Goto);
        let (_, _, result) = navigate(site, &config, "847950").await;
        assert!(matches!(result, Err(AppError::Fixture(_))));
    }
}
