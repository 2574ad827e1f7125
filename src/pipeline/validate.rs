// src/pipeline/validate.rs

use std::path::Path;

use crate::error::Result;
use crate::models::Config;
use crate::utils::log;

/// Load the configuration strictly and check it for basic sanity.
pub fn run_validate(config_path: &Path) -> Result<Config> {
    log::header("Validating configuration");

    let config = if config_path.exists() {
        Config::load(config_path)?
    } else {
        log::warn(&format!(
            "{} not found, checking built-in defaults",
            config_path.display()
        ));
        Config::default()
    };

    match config.validate() {
        Ok(()) => {
            log::success("Configuration is valid");
            log::sub_item(&format!("Entry URL: {}", config.site.entry_url));
            log::sub_item(&format!("WebDriver: {}", config.browser.webdriver_url));
            log::sub_item(&format!("Menu steps: {}", config.site.menu_path.len()));
            log::sub_item(&format!(
                "Code field candidates: {}",
                config.site.code_field.len()
            ));
            log::sub_item(&format!(
                "Focus fallback: {}",
                if config.extraction.focus.is_some() {
                    "enabled"
                } else {
                    "disabled"
                }
            ));
            Ok(config)
        }
        Err(e) => {
            log::error(&format!("Configuration is invalid: {e}"));
            Err(e)
        }
    }
}
