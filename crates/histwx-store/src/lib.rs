//! Persistence gateway implementations
//!
//! `MemoryStore` is always available. `SqliteStore` is behind the
//! `sqlite` feature.

#[cfg(feature = "sqlite")]
pub mod sqlite;

use histwx_core::{
    select_page, Observation, ObservationGateway, ObservationId, Page, PageRequest, Predicate,
    SortSpec, StoreResult, StoredObservation,
};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// Append-only, in-process store. Ids start at 1 and follow insertion order.
#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<StoredObservation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ObservationGateway for MemoryStore {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn bulk_insert(&self, records: Vec<Observation>) -> StoreResult<u64> {
        let inserted = records.len() as u64;
        let mut rows = self.rows.write().await;
        let next_id = rows.last().map_or(1, |r| r.id + 1);

        rows.extend(
            records
                .into_iter()
                .zip(next_id..)
                .map(|(observation, id)| StoredObservation { id, observation }),
        );

        debug!(inserted, total = rows.len(), "bulk insert complete");
        Ok(inserted)
    }

    async fn count_all(&self) -> StoreResult<u64> {
        Ok(self.rows.read().await.len() as u64)
    }

    async fn find_by_id(&self, id: ObservationId) -> StoreResult<Option<StoredObservation>> {
        let rows = self.rows.read().await;
        // ids are dense and ordered, so a binary search is enough
        Ok(rows
            .binary_search_by_key(&id, |r| r.id)
            .ok()
            .map(|idx| rows[idx].clone()))
    }

    async fn find_page(
        &self,
        predicate: &Predicate,
        sort: SortSpec,
        page: PageRequest,
    ) -> StoreResult<Page<StoredObservation>> {
        let rows = self.rows.read().await;
        Ok(select_page(rows.iter().cloned(), predicate, sort, page))
    }

    async fn find_all(&self) -> StoreResult<Vec<StoredObservation>> {
        Ok(self.rows.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use histwx_core::{ObservationFilter, Range, SortDirection, SortField};

    fn sample(temp: f64) -> Observation {
        let mut obs = Observation::at(Utc.with_ymd_and_hms(2016, 4, 24, 18, 0, 0).unwrap());
        obs.temperature = Some(temp);
        obs.conditions = Some("Haze".into());
        obs.pressure = Some(1005.0);
        obs.rain = Some(0);
        obs
    }

    #[tokio::test]
    async fn assigns_sequential_ids() {
        let store = MemoryStore::new();
        assert_eq!(store.bulk_insert(vec![sample(1.0), sample(2.0)]).await.unwrap(), 2);
        assert_eq!(store.bulk_insert(vec![sample(3.0)]).await.unwrap(), 1);

        let all = store.find_all().await.unwrap();
        let ids: Vec<i64> = all.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(store.count_all().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn round_trips_by_id() {
        let store = MemoryStore::new();
        let original = sample(21.5);
        store.bulk_insert(vec![original.clone()]).await.unwrap();

        let found = store.find_by_id(1).await.unwrap().unwrap();
        assert_eq!(found.observation, original);
        assert!(store.find_by_id(99).await.unwrap().is_none());
        assert!(store.find_by_id(0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pages_filtered_results() {
        let store = MemoryStore::new();
        store
            .bulk_insert(vec![sample(15.0), sample(25.0), sample(35.0)])
            .await
            .unwrap();

        let predicate = ObservationFilter::new()
            .with_temperature(Range::between(20.0, 30.0))
            .to_predicate();
        let page = store
            .find_page(
                &predicate,
                SortSpec::new(SortField::Temperature, SortDirection::Asc),
                PageRequest::new(0, 100),
            )
            .await
            .unwrap();
        assert_eq!(page.total_matches, 1);
        assert_eq!(page.items[0].observation.temperature, Some(25.0));
    }
}
