use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use std::{
    num::NonZeroUsize,
    path::Path,
    sync::{Arc, Mutex},
};
use tracing::debug;

use crate::model::{Coordinates, StoredSample, WeatherSample};

use super::{SampleStore, StorageError};

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS weather (
        id                 INTEGER PRIMARY KEY AUTOINCREMENT,
        temperature        REAL,
        wind_speed         REAL,
        wind_direction     TEXT    NOT NULL,
        pressure           INTEGER NOT NULL,
        precipitation      REAL,
        precipitation_type TEXT    NOT NULL,
        latitude           REAL    NOT NULL,
        longitude          REAL    NOT NULL,
        created_at         TEXT    NOT NULL
    )";

const INSERT: &str = "
    INSERT INTO weather (
        temperature, wind_speed, wind_direction, pressure, precipitation,
        precipitation_type, latitude, longitude, created_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

const SELECT_RECENT: &str = "
    SELECT id, temperature, wind_speed, wind_direction, pressure, precipitation,
           precipitation_type, latitude, longitude, created_at
    FROM weather
    ORDER BY id DESC
    LIMIT ?1";

/// SQLite-backed store.
///
/// One connection behind a mutex; every call runs on tokio's blocking pool so
/// the async tasks never stall on disk I/O.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StorageError::Poisoned)?;
            f(&mut *guard)
        })
        .await?
    }
}

/// Raw row, decoded before the labels are validated.
struct WeatherRow {
    id: i64,
    temperature: Option<f64>,
    wind_speed: Option<f64>,
    wind_direction: String,
    pressure: u32,
    precipitation: Option<f64>,
    precipitation_type: String,
    latitude: f64,
    longitude: f64,
    created_at: DateTime<Utc>,
}

impl WeatherRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            temperature: row.get(1)?,
            wind_speed: row.get(2)?,
            wind_direction: row.get(3)?,
            pressure: row.get(4)?,
            precipitation: row.get(5)?,
            precipitation_type: row.get(6)?,
            latitude: row.get(7)?,
            longitude: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    fn into_stored(self) -> Result<StoredSample, StorageError> {
        let id = self.id;
        let corrupt = |source| StorageError::Corrupt { id, source };

        Ok(StoredSample {
            id,
            sample: WeatherSample {
                temperature: self.temperature,
                wind_speed: self.wind_speed,
                wind_direction: self.wind_direction.parse().map_err(corrupt)?,
                pressure: self.pressure,
                precipitation_amount: self.precipitation,
                precipitation_kind: self.precipitation_type.parse().map_err(corrupt)?,
                location: Coordinates::new(self.latitude, self.longitude),
            },
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl SampleStore for SqliteStore {
    async fn initialize_schema(&self) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute_batch(CREATE_TABLE)?;
            Ok(())
        })
        .await
    }

    async fn append(&self, sample: WeatherSample) -> Result<StoredSample, StorageError> {
        self.with_conn(move |conn| {
            let created_at = Utc::now();
            conn.execute(
                INSERT,
                params![
                    sample.temperature,
                    sample.wind_speed,
                    sample.wind_direction.as_str(),
                    sample.pressure,
                    sample.precipitation_amount,
                    sample.precipitation_kind.label(),
                    sample.location.latitude,
                    sample.location.longitude,
                    created_at,
                ],
            )?;
            let id = conn.last_insert_rowid();
            debug!(id, "stored weather sample");

            Ok(StoredSample {
                id,
                sample,
                created_at,
            })
        })
        .await
    }

    async fn query_recent(&self, n: NonZeroUsize) -> Result<Vec<StoredSample>, StorageError> {
        // SQLite limits are signed 64-bit.
        let limit = i64::try_from(n.get()).unwrap_or(i64::MAX);

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(SELECT_RECENT)?;
            let rows = stmt
                .query_map([limit], WeatherRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter().map(WeatherRow::into_stored).collect()
        })
        .await
    }
}
