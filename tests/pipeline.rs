use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use market_scout::error::{MarketError, Result};
use market_scout::models::{CompetitionLevel, MarketCondition, PropertyType};
use market_scout::pipeline::MarketDataService;
use market_scout::scheduler::{run_batch, MarketDataScheduler, SchedulerConfig};
use market_scout::scrapers::{FixedInventory, MarketPageSource};
use market_scout::storage::{init_schema, MarketStore};
use market_scout::trends::{fallback_trends, market_trends};
use sqlx::sqlite::SqlitePoolOptions;

/// Serves canned market pages; any city named in `fail_city` gets a 403.
struct StubSource {
    fail_city: Option<&'static str>,
    page: String,
}

impl StubSource {
    fn new(fail_city: Option<&'static str>, page: &str) -> Self {
        Self {
            fail_city,
            page: page.to_string(),
        }
    }
}

#[async_trait]
impl MarketPageSource for StubSource {
    async fn fetch_market_page(&self, city: &str, state: &str) -> Result<String> {
        if self.fail_city == Some(city) {
            return Err(MarketError::BadStatus {
                location: format!("{}, {}", city, state),
                status: reqwest::StatusCode::FORBIDDEN,
            });
        }
        Ok(self.page.clone())
    }

    fn source_name(&self) -> &'static str {
        "stub"
    }
}

// One connection only: with :memory: every pooled connection would see its
// own empty database.
async fn test_service(source: StubSource) -> Arc<MarketDataService> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_schema(&pool).await.unwrap();
    Arc::new(MarketDataService::new(
        Arc::new(source),
        MarketStore::new(pool),
        Arc::new(FixedInventory(200)),
    ))
}

const PAGE: &str = r#"<html><body>
    <h2>Typical home value: $512,300</h2>
    <p>Homes go pending in about 18 days, values up 3.4% over the past year.</p>
</body></html>"#;

#[tokio::test]
async fn one_failing_city_does_not_abort_the_batch() {
    let service = test_service(StubSource::new(Some("Nashua"), PAGE)).await;

    let cities = [("Manchester", "NH"), ("Nashua", "NH"), ("Concord", "NH")];
    let report = run_batch(
        &service,
        &cities,
        &[PropertyType::SingleFamily],
        Duration::ZERO,
    )
    .await;

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, vec!["Nashua, NH".to_string()]);

    let store = service.store();
    assert!(store
        .read_record("Manchester, NH", PropertyType::SingleFamily)
        .await
        .unwrap()
        .is_some());
    assert!(store
        .read_record("Concord, NH", PropertyType::SingleFamily)
        .await
        .unwrap()
        .is_some());
    assert!(store
        .read_record("Nashua, NH", PropertyType::SingleFamily)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn batch_writes_one_row_per_property_type() {
    let service = test_service(StubSource::new(None, PAGE)).await;

    let report = run_batch(
        &service,
        &[("Manchester", "NH")],
        &[PropertyType::SingleFamily, PropertyType::Condo],
        Duration::ZERO,
    )
    .await;

    assert!(report.all_succeeded());
    let store = service.store();
    assert_eq!(store.record_count().await.unwrap(), 2);

    let record = store
        .read_record("Manchester, NH", PropertyType::Condo)
        .await
        .unwrap()
        .expect("condo record");
    assert_eq!(record.median_price, 512_300);
    assert_eq!(record.average_days_on_market, 18);
}

#[tokio::test]
async fn rerunning_a_batch_keeps_one_row_per_key() {
    let service = test_service(StubSource::new(None, PAGE)).await;
    let cities = [("Manchester", "NH"), ("Concord", "NH")];

    for _ in 0..2 {
        run_batch(&service, &cities, &[PropertyType::SingleFamily], Duration::ZERO).await;
    }

    assert_eq!(service.store().record_count().await.unwrap(), 2);
}

#[tokio::test]
async fn failed_grounding_fetch_returns_static_fallback_trends() {
    let source = StubSource::new(Some("Manchester"), PAGE);
    let trends = market_trends(&source, "Manchester", "NH", &FixedInventory(200)).await;
    assert_eq!(trends, fallback_trends());
}

#[tokio::test]
async fn live_snapshot_drives_trend_classification() {
    let hot_page = r#"<html><body>
        <h2>Typical home value: $480,000</h2>
        <p>Homes go pending in 12 days, values up 6% over the past year.</p>
    </body></html>"#;
    let source = StubSource::new(None, hot_page);

    let trends = market_trends(&source, "Manchester", "NH", &FixedInventory(200)).await;

    assert_eq!(trends.market_conditions.current, MarketCondition::HotSeller);
    assert_eq!(
        trends.market_conditions.competition_level,
        CompetitionLevel::Extreme
    );
    // 12 - 5 would dip under the floor
    assert_eq!(trends.summer.avg_days_on_market, 8);
    assert_eq!(trends.spring.avg_price_change, 8.0);
}

#[tokio::test]
async fn scheduler_start_is_idempotent_and_stop_clears_it() {
    let service = test_service(StubSource::new(None, PAGE)).await;
    let mut scheduler = MarketDataScheduler::new(service, SchedulerConfig::default());

    assert!(!scheduler.is_running());
    scheduler.start();
    assert!(scheduler.is_running());
    scheduler.start(); // no-op while running
    assert!(scheduler.is_running());

    scheduler.stop();
    assert!(!scheduler.is_running());
}

#[tokio::test]
async fn immediate_update_surfaces_per_city_failures() {
    let service = test_service(StubSource::new(Some("Nashua"), PAGE)).await;
    let config = SchedulerConfig {
        full_refresh_pause: Duration::ZERO,
        partial_refresh_pause: Duration::ZERO,
        ..SchedulerConfig::default()
    };
    let scheduler = MarketDataScheduler::new(Arc::clone(&service), config);

    let report = scheduler.run_immediate_update().await;

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, vec!["Nashua, NH".to_string()]);
    assert!(service
        .store()
        .read_record("Concord, NH", PropertyType::SingleFamily)
        .await
        .unwrap()
        .is_some());
}
