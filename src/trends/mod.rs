use tracing::{info, warn};

use crate::models::{
    CompetitionLevel, MarketCondition, MarketConditions, MarketSnapshot, PropertyType,
    SeasonTrend, SeasonalTrends,
};
use crate::scrapers::{extract_snapshot, InventorySampler, MarketPageSource};

/// Days-on-market never projects below this floor
const MIN_SEASON_DAYS: i64 = 8;

/// Per-season offsets applied to the grounding snapshot:
/// (days delta, price-change delta)
const SPRING_OFFSET: (i64, f64) = (-10, 2.0);
const SUMMER_OFFSET: (i64, f64) = (-5, 1.0);
const FALL_OFFSET: (i64, f64) = (5, -1.0);
const WINTER_OFFSET: (i64, f64) = (15, -3.0);

const BEST_LISTING_MONTHS: &[&str] = &["April", "May", "June", "July"];
const WORST_LISTING_MONTHS: &[&str] = &["November", "December", "January", "February"];

/// Derive seasonal trends for a city from a single live snapshot.
///
/// The fetch→extract chain runs once for single-family homes as the only
/// grounding data point; a failed fetch falls back to an entirely static
/// trend object rather than an error.
pub async fn market_trends(
    source: &dyn MarketPageSource,
    city: &str,
    state: &str,
    sampler: &dyn InventorySampler,
) -> SeasonalTrends {
    let snapshot = match source.fetch_market_page(city, state).await {
        Ok(html) => extract_snapshot(&html, city, state, PropertyType::SingleFamily, sampler),
        Err(err) => {
            warn!("Trend grounding fetch failed for {}, {}: {}", city, state, err);
            None
        }
    };

    match snapshot {
        Some(snapshot) => {
            info!(
                "Deriving seasonal trends for {} from live snapshot",
                snapshot.location
            );
            trends_from_snapshot(&snapshot)
        }
        None => fallback_trends(),
    }
}

/// Pure derivation from a snapshot, separated from the fetch for testability
pub fn trends_from_snapshot(snapshot: &MarketSnapshot) -> SeasonalTrends {
    let days = snapshot.average_days_on_market;
    let change = snapshot.price_change_percent;

    let season = |(days_delta, change_delta): (i64, f64)| SeasonTrend {
        avg_days_on_market: (days + days_delta).max(MIN_SEASON_DAYS),
        avg_price_change: change + change_delta,
    };

    let (current, competition_level) = classify_market(days, change);

    let sold_floor = snapshot.metrics.sold_properties.max(10);
    let inventory_months =
        (snapshot.metrics.inventory_count as f64 / sold_floor as f64 * 10.0).round() / 10.0;

    SeasonalTrends {
        spring: season(SPRING_OFFSET),
        summer: season(SUMMER_OFFSET),
        fall: season(FALL_OFFSET),
        winter: season(WINTER_OFFSET),
        market_conditions: MarketConditions {
            current,
            competition_level,
            inventory_months,
        },
        best_listing_months: month_list(BEST_LISTING_MONTHS),
        worst_listing_months: month_list(WORST_LISTING_MONTHS),
    }
}

/// Threshold rules evaluated top-down
pub fn classify_market(days_on_market: i64, price_change: f64) -> (MarketCondition, CompetitionLevel) {
    if days_on_market < 15 && price_change > 5.0 {
        (MarketCondition::HotSeller, CompetitionLevel::Extreme)
    } else if days_on_market < 25 && price_change > 0.0 {
        (MarketCondition::SellerMarket, CompetitionLevel::High)
    } else if days_on_market > 60 || price_change < -3.0 {
        (MarketCondition::BuyerMarket, CompetitionLevel::Low)
    } else {
        (MarketCondition::BalancedMarket, CompetitionLevel::Medium)
    }
}

/// Static trend object returned when the grounding fetch yields nothing
pub fn fallback_trends() -> SeasonalTrends {
    SeasonalTrends {
        spring: SeasonTrend { avg_days_on_market: 25, avg_price_change: 2.0 },
        summer: SeasonTrend { avg_days_on_market: 30, avg_price_change: 1.0 },
        fall: SeasonTrend { avg_days_on_market: 40, avg_price_change: -1.0 },
        winter: SeasonTrend { avg_days_on_market: 50, avg_price_change: -3.0 },
        market_conditions: MarketConditions {
            current: MarketCondition::BalancedMarket,
            competition_level: CompetitionLevel::Medium,
            inventory_months: 2.5,
        },
        best_listing_months: month_list(BEST_LISTING_MONTHS),
        worst_listing_months: month_list(WORST_LISTING_MONTHS),
    }
}

fn month_list(months: &[&str]) -> Vec<String> {
    months.iter().map(|m| m.to_string()).collect()
}
