use std::sync::Arc;

use tracing::info;

use crate::error::{MarketError, Result};
use crate::models::{PropertyType, SeasonalTrends};
use crate::scrapers::{extract_snapshot, InventorySampler, MarketPageSource};
use crate::storage::MarketStore;
use crate::trends::market_trends;

/// Ties the fetch → extract → persist chain together for one source and one
/// store. The scheduler drives this per city; failures come back typed so the
/// caller decides whether to continue or surface them.
pub struct MarketDataService {
    source: Arc<dyn MarketPageSource>,
    store: MarketStore,
    sampler: Arc<dyn InventorySampler>,
}

impl MarketDataService {
    pub fn new(
        source: Arc<dyn MarketPageSource>,
        store: MarketStore,
        sampler: Arc<dyn InventorySampler>,
    ) -> Self {
        Self { source, store, sampler }
    }

    pub fn store(&self) -> &MarketStore {
        &self.store
    }

    /// Refresh one city: fetch its market page once per property type,
    /// extract a snapshot and upsert it
    pub async fn update_city(
        &self,
        city: &str,
        state: &str,
        property_types: &[PropertyType],
    ) -> Result<()> {
        for property_type in property_types {
            let html = self.source.fetch_market_page(city, state).await?;
            let snapshot = extract_snapshot(&html, city, state, *property_type, self.sampler.as_ref())
                .ok_or_else(|| MarketError::Parse {
                    location: format!("{}, {}", city, state),
                })?;
            self.store.upsert_snapshot(&snapshot).await?;
            info!(
                "Updated {} ({}): median ${}, {} days on market",
                snapshot.location,
                property_type,
                snapshot.median_price,
                snapshot.average_days_on_market
            );
        }
        Ok(())
    }

    /// Seasonal trends for a city, grounded on a single live fetch
    pub async fn seasonal_trends(&self, city: &str, state: &str) -> SeasonalTrends {
        market_trends(self.source.as_ref(), city, state, self.sampler.as_ref()).await
    }
}
