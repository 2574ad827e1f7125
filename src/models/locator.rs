// src/models/locator.rs

//! Element locators used to find controls on the portal.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One strategy for finding an element.
///
/// In TOML: `{ by = "id", value = "hsk" }`, `{ by = "attr_contains", attr = "name", value = "hs" }`,
/// `{ by = "first_text_input" }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Locator {
    /// Exact element id
    Id { value: String },

    /// Exact `name` attribute
    Name { value: String },

    /// Attribute containing a substring
    AttrContains { attr: String, value: String },

    /// Raw CSS selector
    Css { value: String },

    /// Any element whose own text contains the value
    Text { value: String },

    /// Anchor whose text contains the value
    LinkText { value: String },

    /// First plain text input in the document
    FirstTextInput,
}

impl Locator {
    pub fn id(value: impl Into<String>) -> Self {
        Self::Id {
            value: value.into(),
        }
    }

    pub fn name(value: impl Into<String>) -> Self {
        Self::Name {
            value: value.into(),
        }
    }

    pub fn attr_contains(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self::AttrContains {
            attr: attr.into(),
            value: value.into(),
        }
    }

    pub fn css(value: impl Into<String>) -> Self {
        Self::Css {
            value: value.into(),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            value: value.into(),
        }
    }

    pub fn link_text(value: impl Into<String>) -> Self {
        Self::LinkText {
            value: value.into(),
        }
    }

    /// CSS form of the locator. `None` for text-matching locators.
    pub fn to_css(&self) -> Option<String> {
        match self {
            Locator::Id { value } => Some(format!("[id=\"{}\"]", escape_css(value))),
            Locator::Name { value } => Some(format!("[name=\"{}\"]", escape_css(value))),
            Locator::AttrContains { attr, value } => {
                Some(format!("[{}*=\"{}\"]", attr, escape_css(value)))
            }
            Locator::Css { value } => Some(value.clone()),
            Locator::FirstTextInput => Some("input[type=\"text\"], input:not([type])".to_string()),
            Locator::Text { .. } | Locator::LinkText { .. } => None,
        }
    }

    /// XPath form of the text-matching locators.
    pub fn to_xpath(&self) -> Option<String> {
        match self {
            Locator::Text { value } => Some(format!(
                "//*[contains(text(), {})]",
                xpath_literal(value)
            )),
            Locator::LinkText { value } => Some(format!(
                "//a[contains(normalize-space(.), {})]",
                xpath_literal(value)
            )),
            _ => None,
        }
    }

    /// Text the element must contain, for text-matching locators.
    pub fn text_needle(&self) -> Option<&str> {
        match self {
            Locator::Text { value } | Locator::LinkText { value } => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id { value } => write!(f, "id={value}"),
            Locator::Name { value } => write!(f, "name={value}"),
            Locator::AttrContains { attr, value } => write!(f, "{attr}*={value}"),
            Locator::Css { value } => write!(f, "css={value}"),
            Locator::Text { value } => write!(f, "text~{value}"),
            Locator::LinkText { value } => write!(f, "link~{value}"),
            Locator::FirstTextInput => f.write_str("first-text-input"),
        }
    }
}

fn escape_css(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Quote a string for XPath 1.0, which has no escape sequences.
fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{value}'")
    } else if !value.contains('"') {
        format!("\"{value}\"")
    } else {
        let parts: Vec<String> = value.split('\'').map(|p| format!("'{p}'")).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}
