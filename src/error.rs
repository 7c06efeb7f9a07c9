use thiserror::Error;

/// Failure taxonomy for the market-data pipeline.
///
/// Every layer returns typed errors instead of swallowing them; the scheduler
/// is the one place that decides between log-and-continue (scheduled batches)
/// and surfacing the failure (on-demand updates).
#[derive(Debug, Error)]
pub enum MarketError {
    /// Network error, timeout or non-2xx response from the source site
    #[error("fetch failed for {location}: {source}")]
    Fetch {
        location: String,
        #[source]
        source: reqwest::Error,
    },

    /// The source responded but with a non-success status
    #[error("fetch for {location} returned status {status}")]
    BadStatus {
        location: String,
        status: reqwest::StatusCode,
    },

    /// Malformed HTML made extraction impossible
    #[error("could not extract market data for {location}")]
    Parse { location: String },

    /// Database error during upsert or read
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, MarketError>;
