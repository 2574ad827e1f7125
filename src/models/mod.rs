// src/models/mod.rs

//! Domain models for the query tool.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod locator;
mod period;
mod query;
mod report;
mod stage;

// Re-export all public types
pub use config::{
    BrowserConfig, Config, EntryMode, ExtractionConfig, FocusConfig, OutputConfig, SiteConfig,
    WaitConfig,
};
pub use locator::Locator;
pub use period::Period;
pub use query::Query;
pub use report::{
    ExtractionMethod, ExtractionRow, PeriodLabel, PeriodValue, QueryFailure, QueryOutcome,
    QueryReport,
};
pub use stage::{Stage, StageTracker};
