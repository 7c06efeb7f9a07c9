use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::models::PropertyType;
use crate::pipeline::MarketDataService;

/// Full daily refresh covers every major city for both property types
pub const MAJOR_CITIES: &[(&str, &str)] = &[
    ("Manchester", "NH"),
    ("Nashua", "NH"),
    ("Concord", "NH"),
    ("Portsmouth", "NH"),
    ("Salem", "NH"),
    ("Boston", "MA"),
    ("Austin", "TX"),
    ("Phoenix", "AZ"),
    ("Miami", "FL"),
    ("Denver", "CO"),
];

/// Four-times-daily partial refresh, single-family only
pub const POPULAR_CITIES: &[(&str, &str)] = &[
    ("Manchester", "NH"),
    ("Nashua", "NH"),
    ("Boston", "MA"),
    ("Austin", "TX"),
    ("Phoenix", "AZ"),
];

/// Small subset for the operator-triggered immediate update
pub const IMMEDIATE_CITIES: &[(&str, &str)] = &[
    ("Manchester", "NH"),
    ("Nashua", "NH"),
    ("Concord", "NH"),
];

const FULL_REFRESH_TYPES: &[PropertyType] = &[PropertyType::SingleFamily, PropertyType::Condo];
const PARTIAL_REFRESH_TYPES: &[PropertyType] = &[PropertyType::SingleFamily];

/// Wall-clock trigger times and inter-city pauses.
///
/// The pauses are crude self-imposed rate limiting against the source site,
/// not backpressure; tests inject zero.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub full_refresh_hour: u32,
    pub partial_refresh_hours: Vec<u32>,
    pub full_refresh_pause: Duration,
    pub partial_refresh_pause: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            full_refresh_hour: 6,
            partial_refresh_hours: vec![8, 12, 16, 20],
            full_refresh_pause: Duration::from_secs(2),
            partial_refresh_pause: Duration::from_secs(1),
        }
    }
}

/// Outcome of one batch, surfaced to on-demand callers and logged by
/// scheduled runs
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: Vec<String>,
}

impl BatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Next occurrence of `hour`:00:00 strictly after `now`.
///
/// Pure so scheduling arithmetic is testable without real time.
pub fn next_run_at(now: NaiveDateTime, hour: u32) -> NaiveDateTime {
    let time = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or_default();
    let candidate = now.date().and_time(time);
    if candidate > now {
        candidate
    } else {
        candidate + ChronoDuration::days(1)
    }
}

/// Earliest upcoming trigger among a set of daily hours
pub fn next_run_among(now: NaiveDateTime, hours: &[u32]) -> Option<NaiveDateTime> {
    hours.iter().map(|h| next_run_at(now, *h)).min()
}

/// Refresh every city in `cities` sequentially, pausing between cities.
/// One city's failure never aborts the rest of the batch.
pub async fn run_batch(
    service: &MarketDataService,
    cities: &[(&str, &str)],
    property_types: &[PropertyType],
    pause: Duration,
) -> BatchReport {
    let mut report = BatchReport::default();
    for (i, (city, state)) in cities.iter().enumerate() {
        if i > 0 && !pause.is_zero() {
            sleep(pause).await;
        }
        match service.update_city(city, state, property_types).await {
            Ok(()) => report.succeeded += 1,
            Err(err) => {
                warn!("Market update failed for {}, {}: {}", city, state, err);
                report.failed.push(format!("{}, {}", city, state));
            }
        }
    }
    report
}

/// Drives the recurring full and partial refresh cycles.
///
/// An explicit object rather than a process-wide singleton: start/stop are
/// lifecycle methods, and the tick times come from the injected config.
pub struct MarketDataScheduler {
    service: Arc<MarketDataService>,
    config: SchedulerConfig,
    tasks: Vec<JoinHandle<()>>,
    running: bool,
}

impl MarketDataScheduler {
    pub fn new(service: Arc<MarketDataService>, config: SchedulerConfig) -> Self {
        Self {
            service,
            config,
            tasks: Vec::new(),
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Register the recurring triggers. A second call while running is a no-op.
    pub fn start(&mut self) {
        if self.running {
            warn!("Market data scheduler already running");
            return;
        }

        info!(
            "Starting market data scheduler: full refresh at {:02}:00, partial at {:?}",
            self.config.full_refresh_hour, self.config.partial_refresh_hours
        );

        let service = Arc::clone(&self.service);
        let hour = self.config.full_refresh_hour;
        let pause = self.config.full_refresh_pause;
        self.tasks.push(tokio::spawn(async move {
            loop {
                wait_until_next(&[hour]).await;
                info!("Daily full market refresh starting");
                let report = run_batch(&service, MAJOR_CITIES, FULL_REFRESH_TYPES, pause).await;
                log_report("full refresh", &report);
            }
        }));

        let service = Arc::clone(&self.service);
        let hours = self.config.partial_refresh_hours.clone();
        let pause = self.config.partial_refresh_pause;
        self.tasks.push(tokio::spawn(async move {
            loop {
                wait_until_next(&hours).await;
                info!("Partial market refresh starting");
                let report = run_batch(&service, POPULAR_CITIES, PARTIAL_REFRESH_TYPES, pause).await;
                log_report("partial refresh", &report);
            }
        }));

        self.running = true;
    }

    /// Cancel all registered triggers. Work already in flight is not
    /// interrupted mid-fetch; the tasks are simply not rescheduled.
    pub fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        if self.running {
            info!("Market data scheduler stopped");
        }
        self.running = false;
    }

    /// Operator-triggered synchronous refresh of a small city subset.
    /// Unlike the scheduled batches, the report is returned to the caller so
    /// failures are visible.
    pub async fn run_immediate_update(&self) -> BatchReport {
        info!("Running immediate market update for {} cities", IMMEDIATE_CITIES.len());
        let report = run_batch(
            &self.service,
            IMMEDIATE_CITIES,
            PARTIAL_REFRESH_TYPES,
            self.config.full_refresh_pause,
        )
        .await;
        log_report("immediate update", &report);
        report
    }
}

impl Drop for MarketDataScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn log_report(label: &str, report: &BatchReport) {
    if report.all_succeeded() {
        info!("Market {} complete: {} cities updated", label, report.succeeded);
    } else {
        warn!(
            "Market {} finished with failures: {} updated, failed: {}",
            label,
            report.succeeded,
            report.failed.join("; ")
        );
    }
}

/// Sleep until the next wall-clock occurrence of any hour in `hours`
async fn wait_until_next(hours: &[u32]) {
    let now = Local::now().naive_local();
    let Some(next) = next_run_among(now, hours) else {
        // no trigger hours configured; park this task
        std::future::pending::<()>().await;
        return;
    };
    let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
    sleep(wait).await;
}
