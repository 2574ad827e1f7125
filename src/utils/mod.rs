//! Utility functions and helpers.

pub mod log;
pub mod text;
pub mod wait;

pub use text::{is_plain_number, normalize_whitespace};
pub use wait::Poller;
