//! Batch ingestion of the historical observation feed
//!
//! Reads the delimited feed once, skips the header, parses every data
//! line and writes the survivors to a persistence gateway in one bulk
//! insert. A malformed line is logged and skipped; it never aborts the
//! batch.

pub mod feed;

pub use feed::*;

use histwx_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to read feed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to store observations: {0}")]
    Store(#[from] StoreError),
}

pub type IngestResult<T> = Result<T, IngestError>;
