//! Service layer for the query tool.
//!
//! This module contains the browser-driving logic:
//! - Locator fallback and frame search (`locate`)
//! - Portal navigation up to the result window (`Navigator`)
//! - Monthly value extraction (`Extractor`, `TableScanner`)

pub mod extractor;
mod focus;
pub mod locate;
mod navigator;

pub use extractor::{Extractor, PeriodMatcher, TableScanner};
pub use locate::Lookup;
pub use navigator::Navigator;
