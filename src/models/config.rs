//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

use super::Locator;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// WebDriver session settings
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Portal layout: entry page, menu labels, field candidates
    #[serde(default)]
    pub site: SiteConfig,

    /// Polling bounds for asynchronous page updates
    #[serde(default)]
    pub waits: WaitConfig,

    /// Value extraction rules
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Result file settings
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.browser.user_agent.trim().is_empty() {
            return Err(AppError::validation("browser.user_agent is empty"));
        }
        if self.browser.window_width == 0 || self.browser.window_height == 0 {
            return Err(AppError::validation("browser window size must be > 0"));
        }
        url::Url::parse(&self.browser.webdriver_url)?;
        url::Url::parse(&self.site.entry_url)?;

        if self.site.menu_path.is_empty() {
            return Err(AppError::validation("site.menu_path has no steps"));
        }
        if let Some(step) = self.site.menu_path.iter().position(|labels| labels.is_empty()) {
            return Err(AppError::validation(format!(
                "site.menu_path step {} has no labels",
                step + 1
            )));
        }
        if self.site.code_field.is_empty() {
            return Err(AppError::validation("site.code_field has no candidates"));
        }
        Regex::new(&self.site.code_pattern)
            .map_err(|e| AppError::validation(format!("site.code_pattern: {e}")))?;

        if self.waits.poll_interval_ms == 0 {
            return Err(AppError::validation("waits.poll_interval_ms must be > 0"));
        }
        if self.waits.results_ms == 0 || self.waits.extraction_ms == 0 {
            return Err(AppError::validation(
                "waits.results_ms and waits.extraction_ms must be > 0",
            ));
        }

        if self.output.headers.len() != 3 {
            return Err(AppError::validation(
                "output.headers must name exactly 3 columns",
            ));
        }
        Ok(())
    }
}

/// WebDriver session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// chromedriver endpoint
    #[serde(default = "defaults::webdriver_url")]
    pub webdriver_url: String,

    #[serde(default = "defaults::headless")]
    pub headless: bool,

    #[serde(default = "defaults::window_width")]
    pub window_width: u32,

    #[serde(default = "defaults::window_height")]
    pub window_height: u32,

    /// Client identification string presented to the portal
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Check the driver's /status endpoint before opening a session
    #[serde(default = "defaults::probe_driver")]
    pub probe_driver: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: defaults::webdriver_url(),
            headless: defaults::headless(),
            window_width: defaults::window_width(),
            window_height: defaults::window_height(),
            user_agent: defaults::user_agent(),
            probe_driver: defaults::probe_driver(),
        }
    }
}

/// How the code is put into the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryMode {
    /// Simulated typing, with script assignment as fallback
    #[default]
    Type,
    /// Script assignment plus synthetic input/change events
    Script,
}

/// Portal layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "defaults::entry_url")]
    pub entry_url: String,

    /// Cascading menu steps; each step lists label variants tried in order
    #[serde(default = "defaults::menu_path")]
    pub menu_path: Vec<Vec<String>>,

    /// Candidate locators for the code input field
    #[serde(default = "defaults::code_field")]
    pub code_field: Vec<Locator>,

    /// Candidate locators for the search control; Enter is sent when none match
    #[serde(default = "defaults::submit")]
    pub submit: Vec<Locator>,

    #[serde(default)]
    pub entry_mode: EntryMode,

    /// Accepted classification code format
    #[serde(default = "defaults::code_pattern")]
    pub code_pattern: String,

    #[serde(default = "defaults::default_code")]
    pub default_code: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            entry_url: defaults::entry_url(),
            menu_path: defaults::menu_path(),
            code_field: defaults::code_field(),
            submit: defaults::submit(),
            entry_mode: EntryMode::default(),
            code_pattern: defaults::code_pattern(),
            default_code: defaults::default_code(),
        }
    }
}

/// Polling bounds, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitConfig {
    #[serde(default = "defaults::poll_interval")]
    pub poll_interval_ms: u64,

    /// Entry page readiness (first menu entry present)
    #[serde(default = "defaults::page_ready")]
    pub page_ready_ms: u64,

    /// Result link appearance after submit
    #[serde(default = "defaults::results")]
    pub results_ms: u64,

    /// New window appearance after clicking the result link
    #[serde(default = "defaults::popup")]
    pub popup_ms: u64,

    /// Per-period wait for a matching table row
    #[serde(default = "defaults::extraction")]
    pub extraction_ms: u64,
}

impl WaitConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::poll_interval(),
            page_ready_ms: defaults::page_ready(),
            results_ms: defaults::results(),
            popup_ms: defaults::popup(),
            extraction_ms: defaults::extraction(),
        }
    }
}

/// Value extraction rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Header texts naming the value column
    #[serde(default = "defaults::value_headers")]
    pub value_headers: Vec<String>,

    /// Focus-traversal fallback; disabled when absent
    #[serde(default)]
    pub focus: Option<FocusConfig>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            value_headers: defaults::value_headers(),
            focus: None,
        }
    }
}

/// Keyboard focus traversal from a fixed anchor control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusConfig {
    /// Control that parks focus before tabbing
    pub anchor: Locator,

    /// Click the year label first to expand a collapsed year group
    #[serde(default)]
    pub toggle_year: bool,

    /// Tabs from the anchor to the current period's label cell
    pub label_tabs: usize,

    /// Tabs from the label cell to its value cell
    pub value_tabs: usize,

    /// Extra tabs per period step back (previous = 1)
    pub period_stride: usize,
}

/// Result file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "defaults::output_dir")]
    pub dir: String,

    #[serde(default = "defaults::enabled")]
    pub write_xlsx: bool,

    #[serde(default = "defaults::enabled")]
    pub write_json: bool,

    #[serde(default = "defaults::sheet_name")]
    pub sheet_name: String,

    /// Column titles: label, period, value
    #[serde(default = "defaults::headers")]
    pub headers: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: defaults::output_dir(),
            write_xlsx: defaults::enabled(),
            write_json: defaults::enabled(),
            sheet_name: defaults::sheet_name(),
            headers: defaults::headers(),
        }
    }
}

mod defaults {
    use crate::models::Locator;

    // Browser defaults
    pub fn webdriver_url() -> String {
        "http://localhost:9515".into()
    }
    pub fn headless() -> bool {
        true
    }
    pub fn window_width() -> u32 {
        1920
    }
    pub fn window_height() -> u32 {
        1080
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/110.0.0.0 Safari/537.36"
            .into()
    }
    pub fn probe_driver() -> bool {
        true
    }

    // Site defaults
    pub fn entry_url() -> String {
        "https://stat.kita.net/".into()
    }
    pub fn menu_path() -> Vec<Vec<String>> {
        vec![
            vec!["품목수출입".into(), "품목 수출입".into(), "품목별 수출입".into()],
            vec!["상세정보".into(), "상세 정보".into(), "품목상세".into()],
        ]
    }
    pub fn code_field() -> Vec<Locator> {
        vec![
            Locator::attr_contains("id", "hsk"),
            Locator::attr_contains("name", "hsk"),
            Locator::attr_contains("id", "hs_cd"),
            Locator::attr_contains("title", "HSK"),
            Locator::FirstTextInput,
        ]
    }
    pub fn submit() -> Vec<Locator> {
        vec![
            Locator::css("button[type=\"submit\"], input[type=\"submit\"]"),
            Locator::attr_contains("onclick", "search"),
            Locator::text("조회"),
            Locator::text("검색"),
        ]
    }
    pub fn code_pattern() -> String {
        r"^\d{4,10}$".into()
    }
    pub fn default_code() -> String {
        "847950".into()
    }

    // Wait defaults
    pub fn poll_interval() -> u64 {
        500
    }
    pub fn page_ready() -> u64 {
        15_000
    }
    pub fn results() -> u64 {
        20_000
    }
    pub fn popup() -> u64 {
        5_000
    }
    pub fn extraction() -> u64 {
        15_000
    }

    // Extraction defaults
    pub fn value_headers() -> Vec<String> {
        vec!["수출금액".into(), "수출액".into()]
    }

    // Output defaults
    pub fn output_dir() -> String {
        "output".into()
    }
    pub fn enabled() -> bool {
        true
    }
    pub fn sheet_name() -> String {
        "수출실적".into()
    }
    pub fn headers() -> Vec<String> {
        vec!["구분".into(), "기간".into(), "수출금액".into()]
    }
}
