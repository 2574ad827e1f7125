// src/browser/fixture.rs

//! Offline replay of saved portal pages.
//!
//! A [`FixtureSite`] is a small tree of HTML documents standing in for the
//! portal at each navigation stage:
//! - `entry`: the document loaded by `goto`, with nested frames
//! - `results`: replaces the frame in which the search was submitted
//! - `popup`: opened as a new window by the result link
//!
//! Transitions are triggered by `data-fixture-action` attributes:
//! `submit` on the search control and `open-popup` on the result link.
//! Pressing Enter in any field also submits.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::Locator;
use crate::utils::normalize_whitespace;

use super::{Browser, BrowserFactory};

const FOCUSABLE: &str = "a, input, button, select, textarea, [tabindex]";
const SCREENSHOT: &[u8] = b"\x89PNG\r\n\x1a\nfixture";

/// A saved document and the frames embedded in it, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixtureDocument {
    pub html: String,
    pub frames: Vec<FixtureDocument>,
}

impl FixtureDocument {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            frames: Vec::new(),
        }
    }

    pub fn with_frame(mut self, frame: FixtureDocument) -> Self {
        self.frames.push(frame);
        self
    }

    fn at(&self, path: &[usize]) -> Option<&FixtureDocument> {
        path.iter().try_fold(self, |doc, &i| doc.frames.get(i))
    }

    fn at_mut(&mut self, path: &[usize]) -> Option<&mut FixtureDocument> {
        path.iter().try_fold(self, |doc, &i| doc.frames.get_mut(i))
    }
}

/// Operations that can be made to fail, to exercise error paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPoint {
    Goto,
    Submit,
    WindowCount,
    Source,
}

/// Documents for each navigation stage.
#[derive(Debug, Clone, Default)]
pub struct FixtureSite {
    pub entry: FixtureDocument,
    pub results: Option<FixtureDocument>,
    pub popup: Option<FixtureDocument>,

    /// Typed text is dropped, as on pages whose scripts ignore key events
    pub ignore_typing: bool,

    pub fault: Option<FaultPoint>,

    /// Day the pages were saved; replays query the periods as of this day
    pub saved_on: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct DocumentFile {
    file: String,
    #[serde(default)]
    frames: Vec<DocumentFile>,
}

#[derive(Debug, Deserialize)]
struct SiteManifest {
    entry: DocumentFile,
    results: Option<DocumentFile>,
    popup: Option<DocumentFile>,
    #[serde(default)]
    ignore_typing: bool,
    fault: Option<FaultPoint>,
    saved_on: Option<NaiveDate>,
}

impl FixtureSite {
    /// Load a site from a directory containing `site.toml` and the HTML files
    /// it references.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let manifest_path = dir.join("site.toml");
        let content = fs::read_to_string(&manifest_path).map_err(|e| {
            AppError::fixture(format!("cannot read {}: {e}", manifest_path.display()))
        })?;
        let manifest: SiteManifest = toml::from_str(&content)?;

        Ok(Self {
            entry: load_document(dir, &manifest.entry)?,
            results: manifest
                .results
                .as_ref()
                .map(|file| load_document(dir, file))
                .transpose()?,
            popup: manifest
                .popup
                .as_ref()
                .map(|file| load_document(dir, file))
                .transpose()?,
            ignore_typing: manifest.ignore_typing,
            fault: manifest.fault,
            saved_on: manifest.saved_on,
        })
    }
}

fn load_document(dir: &Path, doc: &DocumentFile) -> Result<FixtureDocument> {
    let path = dir.join(&doc.file);
    let html = fs::read_to_string(&path)
        .map_err(|e| AppError::fixture(format!("cannot read {}: {e}", path.display())))?;
    let frames = doc
        .frames
        .iter()
        .map(|frame| load_document(dir, frame))
        .collect::<Result<Vec<_>>>()?;
    Ok(FixtureDocument { html, frames })
}

/// Session bookkeeping shared between a factory and the sessions it opened.
#[derive(Debug, Default)]
pub struct FixtureCounters {
    opened: AtomicUsize,
    terminated: AtomicUsize,
}

impl FixtureCounters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn terminated(&self) -> usize {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Sessions opened but not yet terminated.
    pub fn live(&self) -> usize {
        self.opened() - self.terminated()
    }
}

/// Element facts needed by the fixture backend.
#[derive(Debug, Clone)]
struct ElementInfo {
    position: usize,
    tag: String,
    action: Option<String>,
    text: String,
    value_attr: Option<String>,
}

impl ElementInfo {
    fn from_ref(position: usize, el: ElementRef<'_>) -> Self {
        Self {
            position,
            tag: el.value().name().to_lowercase(),
            action: el.value().attr("data-fixture-action").map(str::to_string),
            text: normalize_whitespace(&el.text().collect::<String>()),
            value_attr: el.value().attr("value").map(str::to_string),
        }
    }

    fn is_form_control(&self) -> bool {
        matches!(self.tag.as_str(), "input" | "textarea" | "select")
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AppError::selector(css, format!("{e:?}")))
}

/// All elements in document order, paired with their position.
fn indexed<'a>(doc: &'a Html, all: &'a Selector) -> Vec<(usize, ElementRef<'a>)> {
    doc.select(all).enumerate().collect()
}

fn find_elements(html: &str, locator: &Locator) -> Result<Vec<ElementInfo>> {
    let doc = Html::parse_document(html);
    let all = parse_selector("*")?;
    let elements = indexed(&doc, &all);

    let found = if let Some(css) = locator.to_css() {
        let selector = parse_selector(&css)?;
        let wanted: Vec<_> = doc.select(&selector).map(|el| el.id()).collect();
        elements
            .into_iter()
            .filter(|(_, el)| wanted.contains(&el.id()))
            .map(|(i, el)| ElementInfo::from_ref(i, el))
            .collect()
    } else {
        let needle = locator.text_needle().unwrap_or_default();
        let link_only = matches!(locator, Locator::LinkText { .. });
        elements
            .into_iter()
            .filter(|(_, el)| {
                if link_only {
                    el.value().name() == "a"
                        && normalize_whitespace(&el.text().collect::<String>()).contains(needle)
                } else {
                    el.children()
                        .any(|n| n.value().as_text().is_some_and(|t| t.contains(needle)))
                }
            })
            .map(|(i, el)| ElementInfo::from_ref(i, el))
            .collect()
    };
    Ok(found)
}

fn focusables(html: &str) -> Result<Vec<ElementInfo>> {
    find_elements(html, &Locator::css(FOCUSABLE))
}

/// Browser session over a [`FixtureSite`].
pub struct FixtureBrowser {
    site: Arc<FixtureSite>,
    counters: Arc<FixtureCounters>,
    windows: Vec<FixtureDocument>,
    window: usize,
    frame_path: Vec<usize>,
    /// Field values keyed by (window, frame path, element position)
    values: HashMap<(usize, Vec<usize>, usize), String>,
    /// Focused element position in the current document
    focus: Option<usize>,
    visited: Vec<String>,
    clicked: Vec<String>,
    terminated: bool,
}

impl FixtureBrowser {
    pub fn new(site: Arc<FixtureSite>, counters: Arc<FixtureCounters>) -> Self {
        Self {
            site,
            counters,
            windows: Vec::new(),
            window: 0,
            frame_path: Vec::new(),
            values: HashMap::new(),
            focus: None,
            visited: Vec::new(),
            clicked: Vec::new(),
            terminated: false,
        }
    }

    /// URLs passed to `goto`, in order.
    pub fn visited(&self) -> &[String] {
        &self.visited
    }

    /// Text of every clicked element, in order.
    pub fn clicked(&self) -> &[String] {
        &self.clicked
    }

    fn ensure_live(&self) -> Result<()> {
        if self.terminated {
            Err(AppError::fixture("session terminated"))
        } else {
            Ok(())
        }
    }

    fn check_fault(&self, point: FaultPoint) -> Result<()> {
        if self.site.fault == Some(point) {
            Err(AppError::fixture(format!("injected fault at {point:?}")))
        } else {
            Ok(())
        }
    }

    fn document(&self) -> Result<&FixtureDocument> {
        self.ensure_live()?;
        self.windows
            .get(self.window)
            .and_then(|root| root.at(&self.frame_path))
            .ok_or_else(|| AppError::fixture("no document loaded"))
    }

    fn document_mut(&mut self) -> Result<&mut FixtureDocument> {
        self.ensure_live()?;
        let path = self.frame_path.clone();
        self.windows
            .get_mut(self.window)
            .and_then(|root| root.at_mut(&path))
            .ok_or_else(|| AppError::fixture("no document loaded"))
    }

    fn first(&self, locator: &Locator) -> Result<ElementInfo> {
        find_elements(&self.document()?.html, locator)?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::selector(locator.to_string(), "no matching element"))
    }

    fn value_key(&self, position: usize) -> (usize, Vec<usize>, usize) {
        (self.window, self.frame_path.clone(), position)
    }

    fn submit(&mut self) -> Result<()> {
        self.check_fault(FaultPoint::Submit)?;
        if let Some(results) = self.site.results.clone() {
            *self.document_mut()? = results;
            let (window, path) = (self.window, self.frame_path.clone());
            self.values.retain(|(w, p, _), _| !(*w == window && p.starts_with(&path)));
            self.focus = None;
        }
        Ok(())
    }

    fn open_popup(&mut self) {
        // The driver context stays on the opener, as with a real browser
        if let Some(popup) = self.site.popup.clone() {
            self.windows.push(popup);
        }
    }
}

#[async_trait]
impl Browser for FixtureBrowser {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.ensure_live()?;
        self.check_fault(FaultPoint::Goto)?;
        self.visited.push(url.to_string());
        self.windows = vec![self.site.entry.clone()];
        self.window = 0;
        self.frame_path.clear();
        self.values.clear();
        self.focus = None;
        Ok(())
    }

    async fn frame_count(&mut self) -> Result<usize> {
        Ok(self.document()?.frames.len())
    }

    async fn enter_frame(&mut self, index: usize) -> Result<()> {
        if index >= self.document()?.frames.len() {
            return Err(AppError::fixture(format!("no frame at index {index}")));
        }
        self.frame_path.push(index);
        self.focus = None;
        Ok(())
    }

    async fn enter_parent_frame(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.frame_path.pop();
        self.focus = None;
        Ok(())
    }

    async fn enter_default_frame(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.frame_path.clear();
        self.focus = None;
        Ok(())
    }

    async fn exists(&mut self, locator: &Locator) -> Result<bool> {
        Ok(!find_elements(&self.document()?.html, locator)?.is_empty())
    }

    async fn click(&mut self, locator: &Locator) -> Result<()> {
        let element = self.first(locator)?;
        self.clicked.push(element.text.clone());

        let is_focusable = focusables(&self.document()?.html)?
            .iter()
            .any(|f| f.position == element.position);
        if is_focusable {
            self.focus = Some(element.position);
        }

        match element.action.as_deref() {
            Some("submit") => self.submit(),
            Some("open-popup") => {
                self.open_popup();
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn type_text(&mut self, locator: &Locator, text: &str) -> Result<()> {
        let element = self.first(locator)?;
        let key = self.value_key(element.position);
        if self.site.ignore_typing {
            self.values.insert(key, String::new());
        } else {
            self.values.insert(key, text.to_string());
        }
        self.focus = Some(element.position);
        Ok(())
    }

    async fn set_value(&mut self, locator: &Locator, text: &str) -> Result<()> {
        let element = self.first(locator)?;
        let key = self.value_key(element.position);
        self.values.insert(key, text.to_string());
        Ok(())
    }

    async fn value(&mut self, locator: &Locator) -> Result<String> {
        let element = self.first(locator)?;
        let key = self.value_key(element.position);
        Ok(self
            .values
            .get(&key)
            .cloned()
            .or(element.value_attr)
            .unwrap_or_default())
    }

    async fn press_enter(&mut self, locator: &Locator) -> Result<()> {
        self.first(locator)?;
        self.submit()
    }

    async fn press_tab(&mut self, times: usize) -> Result<()> {
        let order = focusables(&self.document()?.html)?;
        if order.is_empty() {
            return Ok(());
        }
        for _ in 0..times {
            let next = match self.focus {
                Some(pos) => order
                    .iter()
                    .find(|f| f.position > pos)
                    .unwrap_or(&order[0])
                    .position,
                None => order[0].position,
            };
            self.focus = Some(next);
        }
        Ok(())
    }

    async fn focused_text(&mut self) -> Result<String> {
        let Some(pos) = self.focus else {
            return Ok(String::new());
        };
        let element = focusables(&self.document()?.html)?
            .into_iter()
            .find(|f| f.position == pos)
            .ok_or_else(|| AppError::fixture("focused element vanished"))?;

        if element.is_form_control() {
            let key = self.value_key(element.position);
            Ok(self
                .values
                .get(&key)
                .cloned()
                .or(element.value_attr)
                .unwrap_or_default())
        } else {
            Ok(element.text)
        }
    }

    async fn window_count(&mut self) -> Result<usize> {
        self.ensure_live()?;
        self.check_fault(FaultPoint::WindowCount)?;
        Ok(self.windows.len())
    }

    async fn switch_to_newest_window(&mut self) -> Result<()> {
        self.ensure_live()?;
        if self.windows.is_empty() {
            return Err(AppError::fixture("no windows open"));
        }
        self.window = self.windows.len() - 1;
        self.frame_path.clear();
        self.focus = None;
        Ok(())
    }

    async fn source(&mut self) -> Result<String> {
        self.check_fault(FaultPoint::Source)?;
        Ok(self.document()?.html.clone())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        self.ensure_live()?;
        Ok(SCREENSHOT.to_vec())
    }

    async fn quit(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.terminated = true;
        self.counters.terminated.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Opens [`FixtureBrowser`] sessions over one shared site.
#[derive(Clone)]
pub struct FixtureFactory {
    site: Arc<FixtureSite>,
    counters: Arc<FixtureCounters>,
}

impl FixtureFactory {
    pub fn new(site: FixtureSite) -> Self {
        Self {
            site: Arc::new(site),
            counters: Arc::new(FixtureCounters::default()),
        }
    }

    pub fn counters(&self) -> Arc<FixtureCounters> {
        Arc::clone(&self.counters)
    }

    /// Open a concrete session, for callers that need its recorded history.
    pub fn open_fixture(&self) -> FixtureBrowser {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        FixtureBrowser::new(Arc::clone(&self.site), Arc::clone(&self.counters))
    }
}

#[async_trait]
impl BrowserFactory for FixtureFactory {
    async fn open(&self) -> Result<Box<dyn Browser>> {
        Ok(Box::new(self.open_fixture()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site() -> FixtureSite {
        FixtureSite {
            entry: FixtureDocument::new(
                r##"<html><body><a href="#">품목수출입</a></body></html>"##,
            )
            .with_frame(FixtureDocument::new(
                r#"<html><body>
                    <input type="text" id="s_hsk" value="">
                    <button data-fixture-action="submit">조회</button>
                </body></html>"#,
            )),
            results: Some(FixtureDocument::new(
                r#"<html><body><a data-fixture-action="open-popup">847950 기타</a></body></html>"#,
            )),
            popup: Some(FixtureDocument::new("<html><body><table></table></body></html>")),
            ..FixtureSite::default()
        }
    }

    #[tokio::test]
    async fn test_frames_and_values() {
        let factory = FixtureFactory::new(site());
        let mut browser = factory.open_fixture();
        browser.goto("https://example.com").await.unwrap();

        assert_eq!(browser.frame_count().await.unwrap(), 1);
        assert!(!browser.exists(&Locator::id("s_hsk")).await.unwrap());

        browser.enter_frame(0).await.unwrap();
        let field = Locator::id("s_hsk");
        browser.type_text(&field, "847950").await.unwrap();
        assert_eq!(browser.value(&field).await.unwrap(), "847950");

        browser.enter_parent_frame().await.unwrap();
        assert!(browser.enter_frame(3).await.is_err());
    }

    #[tokio::test]
    async fn test_submit_and_popup() {
        let factory = FixtureFactory::new(site());
        let mut browser = factory.open_fixture();
        browser.goto("https://example.com").await.unwrap();
        browser.enter_frame(0).await.unwrap();

        browser.click(&Locator::text("조회")).await.unwrap();
        let link = Locator::link_text("847950");
        assert!(browser.exists(&link).await.unwrap());

        browser.click(&link).await.unwrap();
        assert_eq!(browser.window_count().await.unwrap(), 2);
        browser.switch_to_newest_window().await.unwrap();
        assert!(browser.source().await.unwrap().contains("<table>"));
        assert_eq!(browser.clicked(), &["조회".to_string(), "847950 기타".to_string()]);
    }

    #[tokio::test]
    async fn test_tab_order() {
        let mut site = FixtureSite::default();
        site.entry = FixtureDocument::new(
            r#"<html><body>
                <button id="anchor">go</button>
                <span>skip</span>
                <span tabindex="0">12월</span>
                <input value="256,598">
            </body></html>"#,
        );
        let factory = FixtureFactory::new(site);
        let mut browser = factory.open_fixture();
        browser.goto("x").await.unwrap();

        browser.click(&Locator::id("anchor")).await.unwrap();
        browser.press_tab(1).await.unwrap();
        assert_eq!(browser.focused_text().await.unwrap(), "12월");
        browser.press_tab(1).await.unwrap();
        assert_eq!(browser.focused_text().await.unwrap(), "256,598");
    }

    #[tokio::test]
    async fn test_quit_once() {
        let factory = FixtureFactory::new(site());
        let counters = factory.counters();
        let mut browser = factory.open().await.unwrap();
        assert_eq!(counters.live(), 1);

        browser.quit().await.unwrap();
        assert!(browser.quit().await.is_err());
        assert!(browser.source().await.is_err());
        assert_eq!(counters.terminated(), 1);
        assert_eq!(counters.live(), 0);
    }

    #[test]
    fn test_load_manifest() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("site.toml"),
            r#"
            ignore_typing = true
            saved_on = "2026-10-15"

            [entry]
            file = "entry.html"

            [[entry.frames]]
            file = "search.html"

            [popup]
            file = "detail.html"
            "#,
        )
        .unwrap();
        fs::write(tmp.path().join("entry.html"), "<p>entry</p>").unwrap();
        fs::write(tmp.path().join("search.html"), "<p>search</p>").unwrap();
        fs::write(tmp.path().join("detail.html"), "<p>detail</p>").unwrap();

        let site = FixtureSite::load(tmp.path()).unwrap();
        assert!(site.ignore_typing);
        assert_eq!(site.entry.frames.len(), 1);
        assert_eq!(site.entry.frames[0].html, "<p>search</p>");
        assert!(site.results.is_none());
        assert_eq!(site.popup.unwrap().html, "<p>detail</p>");
        assert_eq!(site.saved_on, NaiveDate::from_ymd_opt(2026, 10, 15));
    }

    #[test]
    fn test_load_manifest_without_saved_on() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("site.toml"), "[entry]\nfile = \"entry.html\"\n").unwrap();
        fs::write(tmp.path().join("entry.html"), "<p>entry</p>").unwrap();
        assert_eq!(FixtureSite::load(tmp.path()).unwrap().saved_on, None);
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("site.toml"), "[entry]\nfile = \"nope.html\"\n").unwrap();
        assert!(matches!(
            FixtureSite::load(tmp.path()),
            Err(AppError::Fixture(_))
        ));
    }
}
