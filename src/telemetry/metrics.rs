//! Prometheus metrics

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Tick ingestion (feed receive to store append)
    TickIngest,
    /// Full batch analysis run
    FullAnalysis,
    /// Per-tick live statistics update
    LiveUpdate,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Latest live z-score
    LatestZScore,
    /// Latest live spread
    LatestSpread,
    /// Hedge ratio of the current model
    HedgeBeta,
    /// R-squared of the current model
    HedgeRSquared,
    /// P-value of the latest stationarity verdict
    AdfPValue,
    /// Aligned points entering the latest fit
    AlignedPoints,
}

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Ticks accepted into the store
    TicksIngested,
    /// Batch analyses that completed
    AnalysesCompleted,
    /// Batch analyses that failed
    AnalysesFailed,
    /// Alert evaluations that reported a breach
    AlertsBreached,
}

/// Start the Prometheus scrape endpoint; requires a running Tokio runtime
pub fn install_exporter(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics exporter: {}", e))?;
    tracing::info!(port, "metrics exporter listening");
    Ok(())
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let name = match metric {
        LatencyMetric::TickIngest => "pairscope_tick_ingest_latency_ms",
        LatencyMetric::FullAnalysis => "pairscope_full_analysis_latency_ms",
        LatencyMetric::LiveUpdate => "pairscope_live_update_latency_ms",
    };
    histogram!(name).record(duration.as_secs_f64() * 1000.0);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let name = match metric {
        GaugeMetric::LatestZScore => "pairscope_latest_z_score",
        GaugeMetric::LatestSpread => "pairscope_latest_spread",
        GaugeMetric::HedgeBeta => "pairscope_hedge_beta",
        GaugeMetric::HedgeRSquared => "pairscope_hedge_r_squared",
        GaugeMetric::AdfPValue => "pairscope_adf_p_value",
        GaugeMetric::AlignedPoints => "pairscope_aligned_points",
    };
    gauge!(name).set(value);
}

/// Increment a counter
pub fn increment(metric: CounterMetric) {
    let name = match metric {
        CounterMetric::TicksIngested => "pairscope_ticks_ingested_total",
        CounterMetric::AnalysesCompleted => "pairscope_analyses_completed_total",
        CounterMetric::AnalysesFailed => "pairscope_analyses_failed_total",
        CounterMetric::AlertsBreached => "pairscope_alerts_breached_total",
    };
    counter!(name).increment(1);
}
