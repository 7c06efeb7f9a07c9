use crate::error::{MarketError, Result};
use crate::scrapers::traits::MarketPageSource;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONNECTION};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Zillow home-values page fetcher
pub struct ZillowFetcher {
    client: Client,
    base_url: String,
}

/// Lower-case and hyphen-join a city/state pair into a URL path segment,
/// e.g. ("Manchester", "NH") -> "manchester-nh"
pub fn location_slug(city: &str, state: &str) -> String {
    format!("{} {}", city, state)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

impl ZillowFetcher {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_base_url("https://www.zillow.com")
    }

    /// Create a fetcher against a custom base URL (used to point at a local
    /// server in tests)
    pub fn with_base_url(base_url: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate, br"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(
            "Upgrade-Insecure-Requests",
            HeaderValue::from_static("1"),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MarketPageSource for ZillowFetcher {
    async fn fetch_market_page(&self, city: &str, state: &str) -> Result<String> {
        let location = format!("{}, {}", city, state);
        let url = format!(
            "{}/{}/home-values/",
            self.base_url,
            location_slug(city, state)
        );

        debug!("Fetching URL: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| MarketError::Fetch {
                location: location.clone(),
                source,
            })?;

        if !response.status().is_success() {
            warn!("Zillow returned status {} for {}", response.status(), location);
            return Err(MarketError::BadStatus {
                location,
                status: response.status(),
            });
        }

        let html = response.text().await.map_err(|source| MarketError::Fetch {
            location: location.clone(),
            source,
        })?;

        debug!("Downloaded {} bytes of HTML for {}", html.len(), location);

        Ok(html)
    }

    fn source_name(&self) -> &'static str {
        "Zillow"
    }
}
