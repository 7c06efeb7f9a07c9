use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{query, query_as, FromRow, Pool, Sqlite};
use tracing::debug;

use crate::error::Result;
use crate::models::{MarketSnapshot, PropertyType, SecondaryMetrics};

pub type DbPool = Pool<Sqlite>;

/// Provenance tag written with every scraped row
pub const DATA_SOURCE: &str = "zillow_scraper";

/// Create a SQLite connection pool.
///
/// A small pool is plenty for a single scraper instance; connection
/// establishment is eager so misconfiguration surfaces at startup.
pub async fn create_pool(url: &str) -> Result<DbPool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(std::time::Duration::from_secs(15))
        .connect(url)
        .await?;
    Ok(pool)
}

/// Create the market_intelligence table if it does not exist yet
pub async fn init_schema(pool: &DbPool) -> Result<()> {
    query(
        "CREATE TABLE IF NOT EXISTS market_intelligence (
           location               TEXT      NOT NULL,
           property_type          TEXT      NOT NULL,
           median_price           INTEGER   NOT NULL,
           average_days_on_market INTEGER   NOT NULL,
           price_change           REAL      NOT NULL,
           insights               TEXT      NOT NULL,
           data_source            TEXT      NOT NULL,
           last_updated           TIMESTAMP NOT NULL,
           UNIQUE(location, property_type)
         )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Durable row model, one per unique (location, property_type).
///
/// `insights` holds the secondary metrics as a JSON payload.
#[derive(Debug, Clone, FromRow)]
pub struct MarketRecord {
    pub location: String,
    pub property_type: String,
    pub median_price: i64,
    pub average_days_on_market: i64,
    pub price_change: f64,
    pub insights: String,
    pub data_source: String,
    pub last_updated: DateTime<Utc>,
}

impl MarketRecord {
    /// Deserialize the insights JSON back into typed metrics
    pub fn metrics(&self) -> serde_json::Result<SecondaryMetrics> {
        serde_json::from_str(&self.insights)
    }
}

/// Writes normalized market snapshots into the market_intelligence table.
///
/// Writes are keyed upserts: there is no history, only "latest known" per
/// (location, property_type).
pub struct MarketStore {
    pool: DbPool,
}

impl MarketStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert the snapshot, or update all mutable fields in place when the
    /// (location, property_type) key already exists
    pub async fn upsert_snapshot(&self, snapshot: &MarketSnapshot) -> Result<()> {
        let insights = serde_json::to_string(&snapshot.metrics)
            .unwrap_or_else(|_| "{}".to_string());

        query(
            "INSERT INTO market_intelligence \
               (location, property_type, median_price, average_days_on_market, \
                price_change, insights, data_source, last_updated) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
             ON CONFLICT(location, property_type) DO UPDATE SET \
               median_price = excluded.median_price, \
               average_days_on_market = excluded.average_days_on_market, \
               price_change = excluded.price_change, \
               insights = excluded.insights, \
               data_source = excluded.data_source, \
               last_updated = excluded.last_updated",
        )
        .bind(&snapshot.location)
        .bind(snapshot.property_type.as_str())
        .bind(snapshot.median_price)
        .bind(snapshot.average_days_on_market)
        .bind(snapshot.price_change_percent)
        .bind(&insights)
        .bind(DATA_SOURCE)
        .bind(snapshot.last_updated)
        .execute(&self.pool)
        .await?;

        debug!(
            "Upserted market record for {} ({})",
            snapshot.location, snapshot.property_type
        );

        Ok(())
    }

    /// Read back the latest record for a (location, property_type) key
    pub async fn read_record(
        &self,
        location: &str,
        property_type: PropertyType,
    ) -> Result<Option<MarketRecord>> {
        let record = query_as::<_, MarketRecord>(
            "SELECT location, property_type, median_price, average_days_on_market, \
                    price_change, insights, data_source, last_updated \
             FROM market_intelligence \
             WHERE location = ?1 AND property_type = ?2",
        )
        .bind(location)
        .bind(property_type.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    /// Number of rows in the table, used by batch reporting and tests
    pub async fn record_count(&self) -> Result<i64> {
        let (count,): (i64,) = query_as("SELECT COUNT(*) FROM market_intelligence")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
