use chrono::DateTime;
use histwx_core::{
    select_page, Observation, ObservationGateway, ObservationId, Page, PageRequest, Predicate,
    SortSpec, StoreError, StoreResult, StoredObservation,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use tokio::task::spawn_blocking;
use tracing::{debug, info, instrument};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS observations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ts INTEGER NOT NULL,
    conditions TEXT,
    dewpoint REAL,
    fog INTEGER,
    hail INTEGER,
    heat_index REAL,
    humidity INTEGER,
    precipitation REAL,
    pressure REAL,
    rain INTEGER,
    snow INTEGER,
    temperature REAL,
    thunder INTEGER,
    tornado INTEGER,
    visibility REAL,
    wind_direction_degrees INTEGER,
    wind_direction_name TEXT,
    wind_gust REAL,
    wind_chill REAL,
    wind_speed REAL
);";

const COLUMNS: &str = "id, ts, conditions, dewpoint, fog, hail, heat_index, humidity, \
    precipitation, pressure, rain, snow, temperature, thunder, tornado, visibility, \
    wind_direction_degrees, wind_direction_name, wind_gust, wind_chill, wind_speed";

/// SQLite-backed store.
///
/// Filtering runs in process over a table scan because predicates are
/// opaque closures. Every rusqlite call runs on the blocking pool.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open an existing database, keeping whatever it already holds
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(backend)?;
        Self::with_connection(conn)
    }

    /// Open a database and drop any observations left by a previous run,
    /// so that a fresh ingest does not duplicate them.
    pub fn recreate<P: AsRef<std::path::Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(backend)?;
        conn.execute_batch("DROP TABLE IF EXISTS observations;")
            .map_err(backend)?;
        info!(path = %path.display(), "observation table rebuilt");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(backend)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA).map_err(backend)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| StoreError::Backend("connection mutex poisoned".into()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("sqlite task failed: {e}")))?
    }

    async fn scan(&self) -> StoreResult<Vec<StoredObservation>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!("SELECT {COLUMNS} FROM observations ORDER BY id"))
                .map_err(backend)?;
            let rows = stmt
                .query_map([], from_row)
                .map_err(backend)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(backend)?;
            Ok(rows)
        })
        .await
    }
}

fn insert_all(conn: &mut Connection, records: &[Observation]) -> StoreResult<u64> {
    let tx = conn.transaction().map_err(backend)?;
    let mut inserted = 0u64;
    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO observations (ts, conditions, dewpoint, fog, hail, heat_index, \
                 humidity, precipitation, pressure, rain, snow, temperature, thunder, tornado, \
                 visibility, wind_direction_degrees, wind_direction_name, wind_gust, \
                 wind_chill, wind_speed) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, \
                 ?16, ?17, ?18, ?19, ?20)",
            )
            .map_err(backend)?;
        for o in records {
            inserted += stmt
                .execute(params![
                    o.timestamp.timestamp(),
                    o.conditions,
                    o.dewpoint,
                    o.fog,
                    o.hail,
                    o.heat_index,
                    o.humidity,
                    o.precipitation,
                    o.pressure,
                    o.rain,
                    o.snow,
                    o.temperature,
                    o.thunder,
                    o.tornado,
                    o.visibility,
                    o.wind_direction_degrees,
                    o.wind_direction_name,
                    o.wind_gust,
                    o.wind_chill,
                    o.wind_speed,
                ])
                .map_err(backend)? as u64;
        }
    }
    tx.commit().map_err(backend)?;
    Ok(inserted)
}

fn backend(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<StoredObservation> {
    let ts: i64 = row.get(1)?;
    let timestamp = DateTime::from_timestamp(ts, 0).ok_or_else(|| {
        rusqlite::Error::IntegralValueOutOfRange(1, ts)
    })?;

    let mut o = Observation::at(timestamp);
    o.conditions = row.get(2)?;
    o.dewpoint = row.get(3)?;
    o.fog = row.get(4)?;
    o.hail = row.get(5)?;
    o.heat_index = row.get(6)?;
    o.humidity = row.get(7)?;
    o.precipitation = row.get(8)?;
    o.pressure = row.get(9)?;
    o.rain = row.get(10)?;
    o.snow = row.get(11)?;
    o.temperature = row.get(12)?;
    o.thunder = row.get(13)?;
    o.tornado = row.get(14)?;
    o.visibility = row.get(15)?;
    o.wind_direction_degrees = row.get(16)?;
    o.wind_direction_name = row.get(17)?;
    o.wind_gust = row.get(18)?;
    o.wind_chill = row.get(19)?;
    o.wind_speed = row.get(20)?;

    Ok(StoredObservation {
        id: row.get(0)?,
        observation: o,
    })
}

#[async_trait::async_trait]
impl ObservationGateway for SqliteStore {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn bulk_insert(&self, records: Vec<Observation>) -> StoreResult<u64> {
        let expected = records.len() as u64;
        let actual = self
            .with_conn(move |conn| insert_all(conn, &records))
            .await?;
        if actual != expected {
            return Err(StoreError::CountMismatch { expected, actual });
        }
        debug!(inserted = actual, "bulk insert complete");
        Ok(actual)
    }

    async fn count_all(&self) -> StoreResult<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM observations", [], |r| r.get(0))
                .map_err(backend)?;
            Ok(count as u64)
        })
        .await
    }

    async fn find_by_id(&self, id: ObservationId) -> StoreResult<Option<StoredObservation>> {
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM observations WHERE id = ?1"),
                params![id],
                from_row,
            )
            .optional()
            .map_err(backend)
        })
        .await
    }

    async fn find_page(
        &self,
        predicate: &Predicate,
        sort: SortSpec,
        page: PageRequest,
    ) -> StoreResult<Page<StoredObservation>> {
        let rows = self.scan().await?;
        Ok(select_page(rows, predicate, sort, page))
    }

    async fn find_all(&self) -> StoreResult<Vec<StoredObservation>> {
        self.scan().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn full_observation() -> Observation {
        let mut o = Observation::at(Utc.with_ymd_and_hms(1996, 11, 1, 11, 0, 0).unwrap());
        o.conditions = Some("Smoke".into());
        o.dewpoint = Some(9.0);
        o.fog = Some(0);
        o.hail = Some(0);
        o.humidity = Some(27);
        o.pressure = Some(1010.0);
        o.rain = Some(1);
        o.temperature = Some(30.0);
        o.visibility = Some(5.0);
        o.wind_direction_degrees = Some(280);
        o.wind_direction_name = Some("West".into());
        o.wind_speed = Some(7.4);
        o
    }

    #[tokio::test]
    async fn round_trips_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("histwx.db")).unwrap();
        let original = full_observation();
        let sparse = Observation::at(original.timestamp);

        assert_eq!(
            store
                .bulk_insert(vec![original.clone(), sparse.clone()])
                .await
                .unwrap(),
            2
        );
        assert_eq!(store.count_all().await.unwrap(), 2);

        let first = store.find_by_id(1).await.unwrap().unwrap();
        assert_eq!(first.observation, original);
        let second = store.find_by_id(2).await.unwrap().unwrap();
        assert_eq!(second.observation, sparse);
        assert!(store.find_by_id(3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn recreate_discards_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("histwx.db");

        for _ in 0..2 {
            let store = SqliteStore::recreate(&path).unwrap();
            store
                .bulk_insert(vec![full_observation(), full_observation()])
                .await
                .unwrap();
            assert_eq!(store.count_all().await.unwrap(), 2);
            assert!(store.find_by_id(1).await.unwrap().is_some());
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.count_all().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn pages_through_predicate() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut dry = full_observation();
        dry.rain = Some(0);
        store
            .bulk_insert(vec![full_observation(), dry])
            .await
            .unwrap();

        let predicate = histwx_core::ObservationFilter::new()
            .with_event(histwx_core::WeatherEvent::Rain)
            .to_predicate();
        let page = store
            .find_page(&predicate, SortSpec::default(), PageRequest::new(0, 10))
            .await
            .unwrap();
        assert_eq!(page.total_matches, 1);
        assert_eq!(page.items[0].id, 1);
    }
}
