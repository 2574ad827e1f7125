//! Pipeline entry points for query operations.
//!
//! - `run_query`: One live or replayed query, session opened and closed
//! - `run_extract`: Offline table scan of a saved result page
//! - `run_validate`: Configuration check

pub mod export;
pub mod extract;
pub mod query;
pub mod validate;

pub use export::{export_outcome, print_outcome, table_rows};
pub use extract::run_extract;
pub use query::{run_batch, run_query};
pub use validate::run_validate;
