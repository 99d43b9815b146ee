//! Observability features including logging and metrics

use metrics::{counter, histogram, Label};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use tokio::time::{Duration, Instant};
use tracing::{info, Level};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LoggingConfig, MetricsConfig, ObservabilityConfig};

/// Global observability system
static OBSERVABILITY: OnceCell<ObservabilitySystem> = OnceCell::new();

/// Observability system for centralized logging and metrics
#[derive(Debug)]
pub struct ObservabilitySystem {
    metrics_enabled: bool,
}

impl ObservabilitySystem {
    /// Initialize the observability system
    pub fn init(config: &ObservabilityConfig) -> anyhow::Result<()> {
        let system = Self {
            metrics_enabled: config.metrics.enabled,
        };

        Self::init_logging(&config.logging)?;

        if config.metrics.enabled {
            Self::init_metrics(&config.metrics)?;
        }

        OBSERVABILITY
            .set(system)
            .map_err(|_| anyhow::anyhow!("Observability system already initialized"))?;

        info!("Observability system initialized");
        Ok(())
    }

    /// Initialize structured logging
    fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
        let env_filter = EnvFilter::builder()
            .with_default_directive(parse_level(&config.level).into())
            .from_env_lossy();

        let registry = tracing_subscriber::registry().with(env_filter);

        match config.format.to_lowercase().as_str() {
            "json" => {
                let json_layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_span_events(FmtSpan::CLOSE);
                registry.with(json_layer).try_init()?;
            }
            _ => {
                let pretty_layer = tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_span_events(FmtSpan::CLOSE);
                registry.with(pretty_layer).try_init()?;
            }
        }

        Ok(())
    }

    /// Install the Prometheus recorder and its scrape endpoint
    fn init_metrics(config: &MetricsConfig) -> anyhow::Result<()> {
        let bind_addr: SocketAddr = config.bind_address.parse()?;

        PrometheusBuilder::new().with_http_listener(bind_addr).install()?;

        info!("Prometheus metrics initialized on {}", bind_addr);
        Ok(())
    }

    /// Get the global observability system
    pub fn get() -> Option<&'static ObservabilitySystem> {
        OBSERVABILITY.get()
    }

    pub fn metrics_enabled(&self) -> bool {
        self.metrics_enabled
    }
}

/// Map a configured level name onto a tracing level, defaulting to `INFO`.
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Command execution metrics recorded by drivers
pub struct QueryMetrics;

impl QueryMetrics {
    /// Histogram fed by a [`PerfTimer`] around each command
    pub const COMMAND_DURATION: &'static str = "rowmap_command_duration_seconds";

    /// Record a successfully executed command
    pub fn command_executed(kind: &str) {
        counter!("rowmap_commands_executed_total", "kind" => kind.to_string()).increment(1);
    }

    /// Start timing a command; the duration is recorded when the timer drops
    pub fn command_timer(kind: &str) -> PerfTimer {
        PerfTimer::new(Self::COMMAND_DURATION).with_label("kind", kind)
    }

    /// Record a failed command, labelled by error class
    pub fn command_failed(kind: &str, class: &str) {
        counter!("rowmap_command_failures_total",
                "kind" => kind.to_string(),
                "class" => class.to_string())
            .increment(1);
    }

    /// Record rows read from a cursor
    pub fn rows_fetched(count: u64) {
        counter!("rowmap_rows_fetched_total").increment(count);
    }
}

/// Records elapsed time into a histogram when dropped
pub struct PerfTimer {
    start: Instant,
    metric_name: String,
    labels: Vec<(String, String)>,
}

impl PerfTimer {
    pub fn new(metric_name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            metric_name: metric_name.into(),
            labels: Vec::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((key.into(), value.into()));
        self
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and record now.
    pub fn finish(self) {
        drop(self);
    }

    fn record(&self) {
        let labels: Vec<Label> = self
            .labels
            .iter()
            .map(|(k, v)| Label::new(k.clone(), v.clone()))
            .collect();
        histogram!(self.metric_name.clone(), labels).record(self.start.elapsed().as_secs_f64());
    }
}

impl Drop for PerfTimer {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            self.record();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }

    #[test]
    fn test_perf_timer() {
        let timer = PerfTimer::new("test_metric").with_label("kind", "text");

        assert_eq!(timer.metric_name, "test_metric");
        assert_eq!(timer.labels.len(), 1);
        assert!(timer.elapsed() >= Duration::ZERO);

        timer.finish();
    }

    #[test]
    fn test_query_metrics_without_recorder() {
        let timer = QueryMetrics::command_timer("text");
        QueryMetrics::command_executed("text");
        drop(timer);
        QueryMetrics::command_failed("stored procedure", "execution");
        QueryMetrics::rows_fetched(10);
    }

    #[test]
    fn test_invalid_metrics_address_is_rejected() {
        let config = MetricsConfig {
            enabled: true,
            bind_address: "not an address".to_string(),
        };
        assert!(ObservabilitySystem::init_metrics(&config).is_err());
    }
}
