//! Database access layer.
//!
//! - Lazily-connecting MySQL pool
//! - Single-statement execution with timeouts
//! - MySQL value to JSON mapping

pub mod executor;
pub mod pool;
pub mod types;

pub use executor::{QueryExecutor, ResultHeader, StatementOutput};
pub use pool::connect_lazy;
