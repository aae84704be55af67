//! Core model and query engine for historical weather observations
//!
//! Parsing of the positional feed, composable filters, sort-key
//! resolution, descriptive statistics and the query orchestrator that
//! ties them to a persistence gateway.

pub mod gateway;
pub mod parser;
pub mod predicate;
pub mod query;
pub mod sort;
pub mod stats;
pub mod types;

pub use gateway::*;
pub use parser::*;
pub use predicate::*;
pub use query::*;
pub use sort::*;
pub use stats::*;
pub use types::*;
