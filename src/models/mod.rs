use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Property type tracked per market location
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    SingleFamily,
    Condo,
}

impl PropertyType {
    /// Stable string form used in log lines and the database key
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::SingleFamily => "single_family",
            PropertyType::Condo => "condo",
        }
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Synthetic secondary metrics stored alongside the scraped signals.
///
/// These are acknowledged placeholders: `inventory_count` is sampled within a
/// fixed band and the listing/sale counts are fixed fractions of it, not
/// observed values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecondaryMetrics {
    pub inventory_count: i64,
    pub new_listings: i64,
    pub pending_sales: i64,
    pub sold_properties: i64,
    pub price_per_sqft: i64,
}

/// One point-in-time set of market metrics for a (location, property type) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Display form, e.g. "Manchester, NH"
    pub location: String,
    pub property_type: PropertyType,
    /// Always positive, guaranteed by the fallback chain
    pub median_price: i64,
    pub average_days_on_market: i64,
    pub price_change_percent: f64,
    pub metrics: SecondaryMetrics,
    pub last_updated: DateTime<Utc>,
}

/// Categorical supply-demand pressure label
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MarketCondition {
    HotSeller,
    SellerMarket,
    BalancedMarket,
    BuyerMarket,
}

/// Buyer competition level, co-varies with the market condition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionLevel {
    Extreme,
    High,
    Medium,
    Low,
}

/// Projected figures for a single calendar season
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeasonTrend {
    pub avg_days_on_market: i64,
    pub avg_price_change: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketConditions {
    pub current: MarketCondition,
    pub competition_level: CompetitionLevel,
    pub inventory_months: f64,
}

/// Derived, never-persisted projection of a snapshot across the four seasons
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeasonalTrends {
    pub spring: SeasonTrend,
    pub summer: SeasonTrend,
    pub fall: SeasonTrend,
    pub winter: SeasonTrend,
    pub market_conditions: MarketConditions,
    pub best_listing_months: Vec<String>,
    pub worst_listing_months: Vec<String>,
}
