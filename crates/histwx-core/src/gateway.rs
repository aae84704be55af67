//! Persistence gateway contract
//!
//! The storage engine is an external collaborator. Anything that can
//! insert observations, look them up by id and scan them can serve the
//! query layer.

use crate::predicate::Predicate;
use crate::sort::SortSpec;
use crate::types::{Observation, ObservationId, StoredObservation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Bulk insert stored {actual} of {expected} records")]
    CountMismatch { expected: u64, actual: u64 },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Zero-indexed page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl PageRequest {
    pub fn new(page: usize, size: usize) -> Self {
        Self { page, size }
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }
}

/// One page of results plus totals over the whole match set
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_matches: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn total_pages_for(total: u64, size: usize) -> u64 {
        if size == 0 {
            return 0;
        }
        total.div_ceil(size as u64)
    }
}

#[async_trait::async_trait]
pub trait ObservationGateway: Send + Sync {
    /// Store every record, assigning ids. Returns how many were stored.
    async fn bulk_insert(&self, records: Vec<Observation>) -> StoreResult<u64>;

    async fn count_all(&self) -> StoreResult<u64>;

    async fn find_by_id(&self, id: ObservationId) -> StoreResult<Option<StoredObservation>>;

    async fn find_page(
        &self,
        predicate: &Predicate,
        sort: SortSpec,
        page: PageRequest,
    ) -> StoreResult<Page<StoredObservation>>;

    /// Full scan. Linear in store size.
    async fn find_all(&self) -> StoreResult<Vec<StoredObservation>>;
}

/// Filter, sort and slice an in-memory scan into a page
pub fn select_page<I>(
    records: I,
    predicate: &Predicate,
    sort: SortSpec,
    page: PageRequest,
) -> Page<StoredObservation>
where
    I: IntoIterator<Item = StoredObservation>,
{
    let mut matches: Vec<StoredObservation> = records
        .into_iter()
        .filter(|r| predicate.matches(&r.observation))
        .collect();
    matches.sort_by(|a, b| sort.compare(a, b));

    let total_matches = matches.len() as u64;
    let items = matches
        .into_iter()
        .skip(page.offset())
        .take(page.size)
        .collect();

    Page {
        items,
        total_matches,
        total_pages: Page::<StoredObservation>::total_pages_for(total_matches, page.size),
    }
}
