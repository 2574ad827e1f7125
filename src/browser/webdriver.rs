// src/browser/webdriver.rs

//! Chrome over WebDriver (`thirtyfour`).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thirtyfour::ChromiumLikeCapabilities;
use thirtyfour::prelude::*;

use crate::error::{AppError, Result};
use crate::models::{BrowserConfig, Locator};

use super::{Browser, BrowserFactory};

const SET_VALUE_SCRIPT: &str = r#"
const el = arguments[0];
el.value = arguments[1];
el.dispatchEvent(new Event('input', { bubbles: true }));
el.dispatchEvent(new Event('change', { bubbles: true }));
"#;

const CLICK_SCRIPT: &str = "arguments[0].click();";

/// Live browser session.
pub struct WebDriverBrowser {
    driver: Option<WebDriver>,
}

impl WebDriverBrowser {
    /// Start a Chrome session against the configured driver endpoint.
    pub async fn connect(config: &BrowserConfig) -> Result<Self> {
        let mut caps = DesiredCapabilities::chrome();
        if config.headless {
            caps.add_arg("--headless=new")?;
        }
        caps.add_arg("--no-sandbox")?;
        caps.add_arg("--disable-dev-shm-usage")?;
        caps.add_arg("--disable-gpu")?;
        caps.add_arg(&format!(
            "--window-size={},{}",
            config.window_width, config.window_height
        ))?;
        caps.add_arg(&format!("--user-agent={}", config.user_agent))?;

        // Hide the automation banner and navigator.webdriver
        caps.add_arg("--disable-blink-features=AutomationControlled")?;
        caps.add_exclude_switch("enable-automation")?;

        let driver = WebDriver::new(&config.webdriver_url, caps).await?;
        log::debug!("WebDriver session opened at {}", config.webdriver_url);

        Ok(Self {
            driver: Some(driver),
        })
    }

    fn driver(&self) -> Result<&WebDriver> {
        self.driver
            .as_ref()
            .ok_or_else(|| AppError::config("browser session already terminated"))
    }

    async fn elements(&self, locator: &Locator) -> Result<Vec<WebElement>> {
        let driver = self.driver()?;
        let found = if let Some(css) = locator.to_css() {
            driver.find_all(By::Css(&css)).await?
        } else if let Some(xpath) = locator.to_xpath() {
            driver.find_all(By::XPath(&xpath)).await?
        } else {
            return Err(AppError::selector(locator.to_string(), "unsupported locator"));
        };
        Ok(found)
    }

    async fn element(&self, locator: &Locator) -> Result<WebElement> {
        self.elements(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::selector(locator.to_string(), "no matching element"))
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.driver()?.goto(url).await?;
        Ok(())
    }

    async fn frame_count(&mut self) -> Result<usize> {
        Ok(self
            .driver()?
            .find_all(By::Css("iframe, frame"))
            .await?
            .len())
    }

    async fn enter_frame(&mut self, index: usize) -> Result<()> {
        let index = u16::try_from(index)
            .map_err(|_| AppError::validation(format!("frame index {index} out of range")))?;
        self.driver()?.enter_frame(index).await?;
        Ok(())
    }

    async fn enter_parent_frame(&mut self) -> Result<()> {
        self.driver()?.enter_parent_frame().await?;
        Ok(())
    }

    async fn enter_default_frame(&mut self) -> Result<()> {
        self.driver()?.enter_default_frame().await?;
        Ok(())
    }

    async fn exists(&mut self, locator: &Locator) -> Result<bool> {
        Ok(!self.elements(locator).await?.is_empty())
    }

    async fn click(&mut self, locator: &Locator) -> Result<()> {
        let element = self.element(locator).await?;
        if let Err(e) = element.click().await {
            // Overlapping or zero-size elements reject native clicks
            log::debug!("Native click on {} failed ({}), using script click", locator, e);
            self.driver()?
                .execute(CLICK_SCRIPT, vec![element.to_json()?])
                .await?;
        }
        Ok(())
    }

    async fn type_text(&mut self, locator: &Locator, text: &str) -> Result<()> {
        let element = self.element(locator).await?;
        element.clear().await?;
        element.send_keys(text).await?;
        Ok(())
    }

    async fn set_value(&mut self, locator: &Locator, text: &str) -> Result<()> {
        let element = self.element(locator).await?;
        self.driver()?
            .execute(
                SET_VALUE_SCRIPT,
                vec![element.to_json()?, serde_json::Value::from(text)],
            )
            .await?;
        Ok(())
    }

    async fn value(&mut self, locator: &Locator) -> Result<String> {
        let element = self.element(locator).await?;
        Ok(element.value().await?.unwrap_or_default())
    }

    async fn press_enter(&mut self, locator: &Locator) -> Result<()> {
        let element = self.element(locator).await?;
        element.send_keys(Key::Enter).await?;
        Ok(())
    }

    async fn press_tab(&mut self, times: usize) -> Result<()> {
        let driver = self.driver()?;
        for _ in 0..times {
            driver.active_element().await?.send_keys(Key::Tab).await?;
        }
        Ok(())
    }

    async fn focused_text(&mut self) -> Result<String> {
        let element = self.driver()?.active_element().await?;
        let tag = element.tag_name().await?.to_lowercase();
        let text = match tag.as_str() {
            "input" | "textarea" | "select" => element.value().await?.unwrap_or_default(),
            _ => element.text().await?,
        };
        Ok(text)
    }

    async fn window_count(&mut self) -> Result<usize> {
        Ok(self.driver()?.windows().await?.len())
    }

    async fn switch_to_newest_window(&mut self) -> Result<()> {
        let driver = self.driver()?;
        let handles = driver.windows().await?;
        let newest = handles
            .last()
            .cloned()
            .ok_or_else(|| AppError::config("browser reports no windows"))?;
        driver.switch_to_window(newest).await?;
        Ok(())
    }

    async fn source(&mut self) -> Result<String> {
        Ok(self.driver()?.source().await?)
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        Ok(self.driver()?.screenshot_as_png().await?)
    }

    async fn quit(&mut self) -> Result<()> {
        let driver = self
            .driver
            .take()
            .ok_or_else(|| AppError::config("browser session already terminated"))?;
        driver.quit().await?;
        log::debug!("WebDriver session terminated");
        Ok(())
    }
}

/// Opens a new Chrome session per query.
pub struct WebDriverFactory {
    config: BrowserConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    value: StatusValue,
}

#[derive(Debug, Deserialize)]
struct StatusValue {
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    message: String,
}

impl WebDriverFactory {
    pub fn new(config: BrowserConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self { config, http })
    }

    /// Ask the driver whether it can start a session.
    pub async fn probe(&self) -> Result<()> {
        let mut base = self.config.webdriver_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let url = url::Url::parse(&base)?.join("status")?;
        let status: StatusResponse = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| {
                AppError::config(format!(
                    "WebDriver not reachable at {url} (is chromedriver running?): {e}"
                ))
            })?
            .json()
            .await?;

        if status.value.ready {
            Ok(())
        } else {
            Err(AppError::config(format!(
                "WebDriver at {} is not ready: {}",
                self.config.webdriver_url, status.value.message
            )))
        }
    }
}

#[async_trait]
impl BrowserFactory for WebDriverFactory {
    async fn open(&self) -> Result<Box<dyn Browser>> {
        if self.config.probe_driver {
            self.probe().await?;
        }
        let browser = WebDriverBrowser::connect(&self.config).await?;
        Ok(Box::new(browser))
    }
}
