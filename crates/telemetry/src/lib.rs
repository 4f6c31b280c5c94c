//! Telemetry for foodlog
//!
//! - Structured logging with tracing (compact or JSON lines)
//! - A per-process session id for correlating logs
//! - In-process counters, gauges and bounded duration histograms
//! - A [`Timer`] guard that records how long an operation took

use foodlog_core::config::LoggingConfig;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

static METRICS: Lazy<MetricsRegistry> = Lazy::new(MetricsRegistry::new);

static SESSION_ID: Lazy<String> = Lazy::new(|| Uuid::new_v4().to_string());

/// Metric names recorded by the pipeline.
pub mod names {
    pub const RASTER_DURATION_MS: &str = "raster.duration_ms";
    pub const ESTIMATE_DURATION_MS: &str = "estimate.duration_ms";
    pub const ESTIMATE_SUCCEEDED: &str = "estimate.succeeded";
    pub const ESTIMATE_FAILED: &str = "estimate.failed";
    pub const ENCODING_FAILED: &str = "raster.encoding_failed";
    pub const ENTRIES_SAVED: &str = "store.entries_saved";
    pub const WATER_SAVED: &str = "store.water_saved";
    pub const QUOTA_EXCEEDED: &str = "store.quota_exceeded";
    pub const ENTRIES_EVICTED: &str = "store.entries_evicted";
    pub const STORE_USED_BYTES: &str = "store.used_bytes";
}

/// Install the global subscriber at `info`.
pub fn init() -> anyhow::Result<()> {
    init_with_config(TelemetryConfig::default())
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured level. Fails if a global subscriber
/// is already installed.
pub fn init_with_config(config: TelemetryConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|e| anyhow::anyhow!("invalid log level `{}`: {e}", config.log_level))?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if config.json {
        registry
            .with(fmt::layer().json().with_target(config.show_target).with_current_span(false))
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(config.show_target)
                    .with_thread_ids(config.show_thread_ids),
            )
            .try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("tracing subscriber already set: {e}"))?;

    tracing::info!(
        session_id = %session_id(),
        version = env!("CARGO_PKG_VERSION"),
        json = config.json,
        "Logging ready"
    );
    Ok(())
}

/// Random id for this process, attached to exported metrics.
pub fn session_id() -> &'static str {
    &SESSION_ID
}

/// Subscriber settings, usually built from the `[logging]` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive, e.g. `info` or `foodlog_store=debug`
    pub log_level: String,
    /// Emit JSON lines instead of compact text
    pub json: bool,
    pub show_target: bool,
    pub show_thread_ids: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::from(&LoggingConfig::default())
    }
}

impl From<&LoggingConfig> for TelemetryConfig {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            log_level: config.level.clone(),
            json: config.json,
            show_target: false,
            show_thread_ids: false,
        }
    }
}

/// Samples kept per histogram; older ones are dropped first.
pub const HISTOGRAM_WINDOW: usize = 1024;

/// Counters, gauges and duration histograms keyed by metric name.
pub struct MetricsRegistry {
    counters: RwLock<HashMap<&'static str, AtomicU64>>,
    gauges: RwLock<HashMap<&'static str, AtomicU64>>,
    histograms: RwLock<HashMap<&'static str, VecDeque<f64>>>,
    started: Instant,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            counters: RwLock::default(),
            gauges: RwLock::default(),
            histograms: RwLock::default(),
            started: Instant::now(),
        }
    }

    pub fn increment(&self, name: &'static str) {
        self.increment_by(name, 1);
    }

    pub fn increment_by(&self, name: &'static str, value: u64) {
        // existing counters only need the read lock
        if let Some(counter) = self.counters.read().unwrap_or_else(PoisonError::into_inner).get(name) {
            counter.fetch_add(value, Ordering::Relaxed);
            return;
        }
        self.counters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name)
            .or_default()
            .fetch_add(value, Ordering::Relaxed);
    }

    /// 0 if never incremented.
    pub fn counter(&self, name: &str) -> u64 {
        let counters = self.counters.read().unwrap_or_else(PoisonError::into_inner);
        counters.get(name).map_or(0, |c| c.load(Ordering::Relaxed))
    }

    pub fn gauge(&self, name: &'static str, value: u64) {
        self.gauges
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name)
            .or_default()
            .store(value, Ordering::Relaxed);
    }

    pub fn gauge_value(&self, name: &str) -> Option<u64> {
        let gauges = self.gauges.read().unwrap_or_else(PoisonError::into_inner);
        gauges.get(name).map(|g| g.load(Ordering::Relaxed))
    }

    /// Record one sample, evicting the oldest past [`HISTOGRAM_WINDOW`].
    pub fn histogram(&self, name: &'static str, value: f64) {
        let mut histograms = self.histograms.write().unwrap_or_else(PoisonError::into_inner);
        let samples = histograms.entry(name).or_default();
        if samples.len() == HISTOGRAM_WINDOW {
            samples.pop_front();
        }
        samples.push_back(value);
    }

    /// `None` if nothing was recorded.
    pub fn histogram_stats(&self, name: &str) -> Option<HistogramStats> {
        let histograms = self.histograms.read().unwrap_or_else(PoisonError::into_inner);
        histograms.get(name).and_then(HistogramStats::from_samples)
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Point-in-time copy of every metric, sorted by name.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |map: &RwLock<HashMap<&'static str, AtomicU64>>| -> BTreeMap<String, u64> {
            map.read()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .map(|(name, value)| ((*name).to_string(), value.load(Ordering::Relaxed)))
                .collect()
        };

        let histograms = self
            .histograms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(|(name, samples)| Some(((*name).to_string(), HistogramStats::from_samples(samples)?)))
            .collect();

        MetricsSnapshot {
            session_id: session_id().to_string(),
            uptime_secs: self.uptime().as_secs(),
            counters: load(&self.counters),
            gauges: load(&self.gauges),
            histograms,
        }
    }

    pub fn export_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or(serde_json::Value::Null)
    }
}

/// Serializable copy of a [`MetricsRegistry`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub session_id: String,
    pub uptime_secs: u64,
    pub counters: BTreeMap<String, u64>,
    pub gauges: BTreeMap<String, u64>,
    pub histograms: BTreeMap<String, HistogramStats>,
}

/// Summary of the samples currently in a histogram window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
}

impl HistogramStats {
    /// `None` for an empty window.
    pub fn from_samples(samples: &VecDeque<f64>) -> Option<Self> {
        let mut sorted: Vec<f64> = samples.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);
        let (&min, &max) = (sorted.first()?, sorted.last()?);

        let nearest_rank = |p: f64| {
            let rank = (p * sorted.len() as f64).ceil() as usize;
            sorted[rank.clamp(1, sorted.len()) - 1]
        };

        Some(Self {
            count: sorted.len(),
            min,
            max,
            mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
            p50: nearest_rank(0.50),
            p95: nearest_rank(0.95),
        })
    }
}

/// The process-wide registry.
pub fn metrics() -> &'static MetricsRegistry {
    &METRICS
}

/// Records an operation's duration in milliseconds into the global registry.
///
/// Recorded once, on `stop` or on drop, whichever comes first.
pub struct Timer {
    name: &'static str,
    start: Instant,
    recorded: bool,
}

impl Timer {
    pub fn start(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
            recorded: false,
        }
    }

    /// Record now and return the elapsed time.
    pub fn stop(mut self) -> Duration {
        self.record()
    }

    fn record(&mut self) -> Duration {
        let elapsed = self.start.elapsed();
        if !self.recorded {
            self.recorded = true;
            metrics().histogram(self.name, elapsed.as_secs_f64() * 1000.0);
            tracing::trace!(metric = self.name, elapsed_ms = elapsed.as_millis() as u64, "Timer recorded");
        }
        elapsed
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.record();
    }
}
