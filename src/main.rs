use std::sync::Arc;

use market_scout::pipeline::MarketDataService;
use market_scout::scheduler::{MarketDataScheduler, SchedulerConfig};
use market_scout::scrapers::{RandomInventory, ZillowFetcher};
use market_scout::storage::{self, MarketStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🏠 Market Scout - scheduled market data pipeline");
    info!("================================================");

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://market_scout.db?mode=rwc".to_string());

    let pool = storage::create_pool(&database_url).await?;
    storage::init_schema(&pool).await?;

    let service = Arc::new(MarketDataService::new(
        Arc::new(ZillowFetcher::new()?),
        MarketStore::new(pool),
        Arc::new(RandomInventory),
    ));

    let mut scheduler = MarketDataScheduler::new(service, SchedulerConfig::default());

    // `market-scout once` runs the administrative immediate update and exits
    if std::env::args().nth(1).as_deref() == Some("once") {
        let report = scheduler.run_immediate_update().await;
        println!(
            "Immediate update: {} cities updated, {} failed",
            report.succeeded,
            report.failed.len()
        );
        for city in &report.failed {
            println!("  failed: {}", city);
        }
        return Ok(());
    }

    scheduler.start();
    info!("Scheduler running; press ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    scheduler.stop();

    Ok(())
}
