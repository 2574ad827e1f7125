// src/error.rs

//! Unified error handling for the query tool.

use std::fmt;

use thiserror::Error;

use crate::models::Stage;

/// Result type alias for kstat operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebDriver command failed
    #[error("WebDriver error: {0}")]
    WebDriver(#[from] thirtyfour::error::WebDriverError),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Spreadsheet rendering failed
    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Navigator gave up before reaching the results
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    /// Fixture site is malformed or a fixture fault fired
    #[error("Fixture error: {0}")]
    Fixture(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a navigation error for the given stage.
    pub fn navigation(stage: Stage, reason: impl fmt::Display) -> Self {
        Self::Navigation(NavigationError::new(stage, reason))
    }

    /// Create a fixture error.
    pub fn fixture(message: impl Into<String>) -> Self {
        Self::Fixture(message.into())
    }
}

/// Terminal navigation failure: the last stage reached and what could not be found.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("navigation stopped after {stage}: {reason}")]
pub struct NavigationError {
    pub stage: Stage,
    pub reason: String,
}

impl NavigationError {
    pub fn new(stage: Stage, reason: impl fmt::Display) -> Self {
        Self {
            stage,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_error_names_stage() {
        let err = AppError::navigation(Stage::MenuNavigated, "could not locate the input field");
        assert_eq!(
            err.to_string(),
            "navigation stopped after menu-navigated: could not locate the input field"
        );
    }
}
