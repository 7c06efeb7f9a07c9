use crate::error::Result;
use async_trait::async_trait;

/// Common trait for market page sources
/// This lets the trend synthesizer and scheduler run against stub sources in
/// tests, and allows additional sources (Redfin, Realtor, etc) later
#[async_trait]
pub trait MarketPageSource: Send + Sync {
    /// Fetch the raw market page HTML for a city
    async fn fetch_market_page(&self, city: &str, state: &str) -> Result<String>;

    /// Get the name of the source
    fn source_name(&self) -> &'static str;
}
