//! Query orchestration: sort resolution, predicate composition, paging
//! and response shaping on top of an [`ObservationGateway`].

use crate::gateway::{ObservationGateway, PageRequest, StoreError};
use crate::predicate::ObservationFilter;
use crate::sort::{SortDirection, SortField, SortSpec};
use crate::stats::{condition_counts, ConditionSummary, Statistics};
use crate::types::{ObservationId, StoredObservation, WeatherEvent};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_MAX_PAGE_SIZE: usize = 1000;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ServiceResult<T> = Result<T, QueryError>;

/// Bounds applied to caller-supplied page sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_size: usize,
    pub max_size: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_size: DEFAULT_PAGE_SIZE,
            max_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl PageLimits {
    /// Size 0 is rejected; anything above the maximum is clamped
    pub fn apply(&self, page: usize, size: Option<usize>) -> ServiceResult<PageRequest> {
        let size = size.unwrap_or(self.default_size);
        if size == 0 {
            return Err(QueryError::InvalidParameter(
                "Page size must be at least 1".to_string(),
            ));
        }
        Ok(PageRequest::new(page, size.min(self.max_size)))
    }
}

/// One search as seen by the orchestrator
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub filter: ObservationFilter,
    /// Public sort alias, echoed back unchanged
    pub sort_by: Option<String>,
    pub direction: SortDirection,
    pub page: usize,
    pub size: Option<usize>,
}

/// Response envelope for paged queries
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub total_records: u64,
    pub total_pages: u64,
    pub current_page: usize,
    pub page_size: usize,
    pub sort_by: String,
    pub sort_direction: SortDirection,
    pub data: Vec<StoredObservation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQueryResult {
    pub event_type: WeatherEvent,
    /// Share of the whole store carrying the event, in percent
    pub percentage: f64,
    #[serde(flatten)]
    pub result: QueryResult,
}

/// Per-request query entry point. Holds no mutable state of its own; the
/// gateway handle is shared between requests.
#[derive(Clone)]
pub struct QueryService {
    gateway: Arc<dyn ObservationGateway>,
    limits: PageLimits,
}

impl QueryService {
    pub fn new(gateway: Arc<dyn ObservationGateway>, limits: PageLimits) -> Self {
        Self { gateway, limits }
    }

    pub fn limits(&self) -> PageLimits {
        self.limits
    }

    pub fn gateway(&self) -> &Arc<dyn ObservationGateway> {
        &self.gateway
    }

    #[instrument(skip(self, request), fields(sort_by = ?request.sort_by, page = request.page))]
    pub async fn search(&self, request: &SearchRequest) -> ServiceResult<QueryResult> {
        let field = SortField::resolve(request.sort_by.as_deref());
        let sort = SortSpec::new(field, request.direction);
        let paging = self.limits.apply(request.page, request.size)?;
        let predicate = request.filter.to_predicate();

        let page = self.gateway.find_page(&predicate, sort, paging).await?;
        debug!(
            clauses = predicate.len(),
            sort_field = %field,
            matches = page.total_matches,
            "search complete"
        );

        Ok(QueryResult {
            total_records: page.total_matches,
            total_pages: page.total_pages,
            current_page: paging.page,
            page_size: paging.size,
            sort_by: request
                .sort_by
                .clone()
                .unwrap_or_else(|| field.as_str().to_string()),
            sort_direction: request.direction,
            data: page.items,
        })
    }

    pub async fn find_by_id(&self, id: ObservationId) -> ServiceResult<Option<StoredObservation>> {
        Ok(self.gateway.find_by_id(id).await?)
    }

    /// Observations flagged with `event`, plus the share of the whole store
    pub async fn by_event(
        &self,
        event: WeatherEvent,
        request: &SearchRequest,
    ) -> ServiceResult<EventQueryResult> {
        let mut request = request.clone();
        request.filter = request.filter.with_event(event);

        let result = self.search(&request).await?;
        let total = self.gateway.count_all().await?;
        Ok(EventQueryResult {
            event_type: event,
            percentage: percentage(result.total_records, total),
            result,
        })
    }

    #[instrument(skip(self))]
    pub async fn statistics(&self) -> ServiceResult<Statistics> {
        let all = self.gateway.find_all().await?;
        Ok(Statistics::compute(all.iter().map(|r| &r.observation)))
    }

    #[instrument(skip(self))]
    pub async fn conditions(&self) -> ServiceResult<ConditionSummary> {
        let all = self.gateway.find_all().await?;
        Ok(condition_counts(all.iter().map(|r| &r.observation)))
    }
}

/// `part / whole` as a percentage; 0 for an empty whole
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}
