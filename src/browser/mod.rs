//! Browser session abstraction.
//!
//! The navigator and extractor only talk to a [`Browser`]. Two backends exist:
//! - [`WebDriverBrowser`]: a real Chrome session over WebDriver
//! - [`FixtureBrowser`]: offline replay of saved pages
//!
//! A session is opened per query through a [`BrowserFactory`] and is never
//! reused.

pub mod fixture;
pub mod webdriver;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Locator;

pub use fixture::{
    FaultPoint, FixtureBrowser, FixtureCounters, FixtureDocument, FixtureFactory, FixtureSite,
};
pub use webdriver::{WebDriverBrowser, WebDriverFactory};

/// Operations the query pipeline needs from a browser session.
///
/// Element lookups apply to the current frame of the current window.
#[async_trait]
pub trait Browser: Send {
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Number of frames directly inside the current frame.
    async fn frame_count(&mut self) -> Result<usize>;
    async fn enter_frame(&mut self, index: usize) -> Result<()>;
    async fn enter_parent_frame(&mut self) -> Result<()>;
    async fn enter_default_frame(&mut self) -> Result<()>;

    /// Whether at least one element matches.
    async fn exists(&mut self, locator: &Locator) -> Result<bool>;
    async fn click(&mut self, locator: &Locator) -> Result<()>;

    /// Clear the field and type into it.
    async fn type_text(&mut self, locator: &Locator, text: &str) -> Result<()>;

    /// Assign the value by script and fire `input` and `change` events.
    async fn set_value(&mut self, locator: &Locator, text: &str) -> Result<()>;
    async fn value(&mut self, locator: &Locator) -> Result<String>;
    async fn press_enter(&mut self, locator: &Locator) -> Result<()>;

    /// Move focus forward `times` controls.
    async fn press_tab(&mut self, times: usize) -> Result<()>;

    /// Text (or value, for inputs) of the focused control.
    async fn focused_text(&mut self) -> Result<String>;

    async fn window_count(&mut self) -> Result<usize>;
    async fn switch_to_newest_window(&mut self) -> Result<()>;

    /// HTML of the current frame.
    async fn source(&mut self) -> Result<String>;

    /// PNG of the viewport.
    async fn screenshot(&mut self) -> Result<Vec<u8>>;

    /// End the session. Later calls fail.
    async fn quit(&mut self) -> Result<()>;
}

/// Opens fresh browser sessions.
#[async_trait]
pub trait BrowserFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn Browser>>;
}
