//! Analysis engine
//!
//! Owns the tick store, the live cache and the latest report, and reconciles
//! the two cadences: expensive batch refits on demand, O(1) live updates per
//! tick. The batch pipeline itself is pure and runs off the async path on
//! the blocking pool.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::analytics::{
    align, AnalysisReport, AnalyticsError, FitWindow, HedgeFitter, Resampler, SpreadEngine,
    StationarityTester,
};
use crate::config::{AlertConfig, AnalysisConfig, FeedConfig};
use crate::export::{rows_from_report, ExportDocument, ExportRow};
use crate::feed::Tick;
use crate::live::{AlertEvaluator, AlertState, FrozenWindow, LiveStats, LiveStatsCache};
use crate::store::TickStore;
use crate::telemetry::{
    increment, record_latency, set_gauge, CounterMetric, GaugeMetric, LatencyMetric,
};

/// Parameters for one batch analysis run
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Independent leg
    pub symbol_x: String,
    /// Dependent leg
    pub symbol_y: String,
    /// Bar width
    pub timeframe: Duration,
    /// How far back to query ticks
    pub lookback: Duration,
    /// Rolling window width in bars
    pub z_window: usize,
    /// Optional bound on the fit window; None fits the whole series
    pub fit_window: Option<FitWindow>,
    /// Cutoff instant; None means the wall clock. Offline runs over captured
    /// data set this past the last tick so every bucket closes.
    pub as_of: Option<DateTime<Utc>>,
}

impl AnalysisRequest {
    /// Default request for the configured pair
    pub fn from_config(feed: &FeedConfig, analysis: &AnalysisConfig) -> Self {
        Self {
            symbol_x: feed.symbol_x.clone(),
            symbol_y: feed.symbol_y.clone(),
            timeframe: analysis.timeframe(),
            lookback: analysis.lookback(),
            z_window: analysis.z_window,
            fit_window: None,
            as_of: None,
        }
    }
}

struct LatestPair {
    price_x: Option<Decimal>,
    price_y: Option<Decimal>,
}

/// Batch and live entry points over one tracked pair
pub struct AnalysisEngine {
    store: Arc<TickStore>,
    cache: Arc<LiveStatsCache>,
    symbol_x: String,
    symbol_y: String,
    analysis: AnalysisConfig,
    alert: AlertConfig,
    last_report: RwLock<Option<Arc<AnalysisReport>>>,
    latest: RwLock<LatestPair>,
}

impl AnalysisEngine {
    /// Create an engine over shared store and cache handles
    pub fn new(
        store: Arc<TickStore>,
        cache: Arc<LiveStatsCache>,
        feed: &FeedConfig,
        analysis: AnalysisConfig,
        alert: AlertConfig,
    ) -> Self {
        Self {
            store,
            cache,
            symbol_x: feed.symbol_x.clone(),
            symbol_y: feed.symbol_y.clone(),
            analysis,
            alert,
            last_report: RwLock::new(None),
            latest: RwLock::new(LatestPair {
                price_x: None,
                price_y: None,
            }),
        }
    }

    /// Run the full batch pipeline and refresh the live cache on success.
    ///
    /// Resample both legs with a shared cutoff, align, fit, compute the
    /// spread series and test it. Any failure propagates and leaves the
    /// cache and last report exactly as they were.
    pub async fn run_full_analysis(
        &self,
        request: AnalysisRequest,
    ) -> Result<Arc<AnalysisReport>, AnalyticsError> {
        let started = std::time::Instant::now();
        let now = request.as_of.unwrap_or_else(Utc::now);
        let from = now - request.lookback;
        let ticks_x = self.store.query(&request.symbol_x, from, now).await;
        let ticks_y = self.store.query(&request.symbol_y, from, now).await;
        debug!(
            symbol_x = %request.symbol_x,
            symbol_y = %request.symbol_y,
            ticks_x = ticks_x.len(),
            ticks_y = ticks_y.len(),
            "starting full analysis"
        );

        let min_fit_points = self.analysis.min_fit_points;
        let significance = self.analysis.significance;
        let max_lag = self.analysis.max_lag;
        let outcome = tokio::task::spawn_blocking(move || {
            run_pipeline(
                &request,
                &ticks_x,
                &ticks_y,
                now,
                min_fit_points,
                significance,
                max_lag,
            )
        })
        .await
        .map_err(|e| AnalyticsError::InvalidInput(format!("analysis task aborted: {}", e)))?;

        let report = match outcome {
            Ok(report) => Arc::new(report),
            Err(e) => {
                increment(CounterMetric::AnalysesFailed);
                warn!(error = %e, "full analysis failed");
                return Err(e);
            }
        };

        let frozen = report
            .last_defined_window()
            .and_then(|p| match (p.rolling_mean, p.rolling_std) {
                (Some(mean), Some(std)) => Some(FrozenWindow {
                    mean,
                    std,
                    as_of: p.timestamp,
                }),
                _ => None,
            });
        self.cache
            .replace_model(report.model.clone(), frozen)
            .await;
        *self.last_report.write().await = Some(report.clone());

        increment(CounterMetric::AnalysesCompleted);
        record_latency(LatencyMetric::FullAnalysis, started.elapsed());
        set_gauge(GaugeMetric::HedgeBeta, report.model.beta);
        set_gauge(GaugeMetric::HedgeRSquared, report.model.r_squared);
        set_gauge(GaugeMetric::AdfPValue, report.verdict.p_value);
        set_gauge(GaugeMetric::AlignedPoints, report.points.len() as f64);
        info!(
            symbol_x = %report.symbol_x,
            symbol_y = %report.symbol_y,
            beta = report.model.beta,
            r_squared = report.model.r_squared,
            p_value = report.verdict.p_value,
            stationary = report.verdict.is_stationary,
            points = report.points.len(),
            "full analysis complete"
        );
        Ok(report)
    }

    /// Store a tick and refresh the live view once both legs have traded.
    ///
    /// Returns the fresh snapshot when one was published. A tick for an
    /// untracked symbol is ignored; a live update before the first fit is
    /// expected and returns None.
    pub async fn ingest_tick(&self, tick: Tick) -> Result<Option<Arc<LiveStats>>, AnalyticsError> {
        let started = std::time::Instant::now();
        let is_x = tick.symbol == self.symbol_x;
        let is_y = tick.symbol == self.symbol_y;
        if !is_x && !is_y {
            debug!(symbol = %tick.symbol, "ignoring tick for untracked symbol");
            return Ok(None);
        }

        let price = tick.price;
        self.store.append(tick).await;
        increment(CounterMetric::TicksIngested);
        record_latency(LatencyMetric::TickIngest, started.elapsed());

        let (price_x, price_y) = {
            let mut latest = self.latest.write().await;
            if is_x {
                latest.price_x = Some(price);
            } else {
                latest.price_y = Some(price);
            }
            (latest.price_x, latest.price_y)
        };
        let (price_x, price_y) = match (price_x, price_y) {
            (Some(x), Some(y)) => (x, y),
            _ => return Ok(None),
        };

        let live_started = std::time::Instant::now();
        match self.cache.update(price_x, price_y).await {
            Ok(stats) => {
                record_latency(LatencyMetric::LiveUpdate, live_started.elapsed());
                set_gauge(GaugeMetric::LatestSpread, stats.latest_spread);
                if let Some(z) = stats.latest_z_score {
                    set_gauge(GaugeMetric::LatestZScore, z);
                }
                Ok(Some(stats))
            }
            Err(AnalyticsError::ModelNotReady) => {
                debug!("live update before first fit");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Latest live snapshot; ModelNotReady until one exists
    pub async fn live_stats(&self) -> Result<Arc<LiveStats>, AnalyticsError> {
        self.cache
            .snapshot()
            .await
            .ok_or(AnalyticsError::ModelNotReady)
    }

    /// Evaluate the latest snapshot against a threshold (configured default when None)
    pub async fn alert_state(&self, threshold: Option<f64>) -> Result<AlertState, AnalyticsError> {
        let stats = self.live_stats().await?;
        let evaluator = AlertEvaluator::new(
            threshold.unwrap_or(self.alert.z_threshold),
            self.alert.mode,
        );
        let state = evaluator.evaluate(&stats);
        if state.breached {
            increment(CounterMetric::AlertsBreached);
        }
        Ok(state)
    }

    /// Rows of the latest report; ModelNotReady before the first success
    pub async fn export_rows(&self) -> Result<Vec<ExportRow>, AnalyticsError> {
        let report = self
            .last_report
            .read()
            .await
            .clone()
            .ok_or(AnalyticsError::ModelNotReady)?;
        Ok(rows_from_report(&report))
    }

    /// Full export payload of the latest report
    pub async fn export_document(&self) -> Result<ExportDocument, AnalyticsError> {
        let report = self
            .last_report
            .read()
            .await
            .clone()
            .ok_or(AnalyticsError::ModelNotReady)?;
        Ok(ExportDocument::from_report(&report))
    }
}

/// The pure batch pipeline; shared `now` keeps both legs' open buckets aligned
fn run_pipeline(
    request: &AnalysisRequest,
    ticks_x: &[Tick],
    ticks_y: &[Tick],
    now: DateTime<Utc>,
    min_fit_points: usize,
    significance: f64,
    max_lag: Option<usize>,
) -> Result<AnalysisReport, AnalyticsError> {
    let resampler = Resampler::new(request.timeframe);
    let bars_x = resampler.resample(&request.symbol_x, ticks_x, now)?;
    let bars_y = resampler.resample(&request.symbol_y, ticks_y, now)?;
    let series = align(&bars_x, &bars_y, min_fit_points)?;
    let model = HedgeFitter::new(min_fit_points).fit(&series, request.fit_window)?;
    let points = SpreadEngine::new(request.z_window).compute(&series, &model)?;
    let spread: Vec<f64> = points.iter().map(|p| p.spread).collect();
    let verdict = StationarityTester::new(significance, max_lag).test(&spread)?;
    Ok(AnalysisReport {
        symbol_x: series.symbol_x.clone(),
        symbol_y: series.symbol_y.clone(),
        timeframe_secs: request.timeframe.num_seconds(),
        z_window: request.z_window,
        model: Arc::new(model),
        points,
        verdict,
        generated_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rust_decimal_macros::dec;

    fn create_test_engine() -> AnalysisEngine {
        let feed = FeedConfig {
            exchange: "binance".to_string(),
            symbol_x: "ETHUSDT".to_string(),
            symbol_y: "BTCUSDT".to_string(),
        };
        let analysis = AnalysisConfig {
            min_fit_points: 20,
            z_window: 5,
            ..AnalysisConfig::default()
        };
        AnalysisEngine::new(
            Arc::new(TickStore::new()),
            Arc::new(LiveStatsCache::new()),
            &feed,
            analysis,
            AlertConfig::default(),
        )
    }

    fn create_test_request() -> AnalysisRequest {
        AnalysisRequest {
            symbol_x: "ETHUSDT".to_string(),
            symbol_y: "BTCUSDT".to_string(),
            timeframe: Duration::seconds(60),
            lookback: Duration::hours(12),
            z_window: 5,
            fit_window: None,
            as_of: None,
        }
    }

    fn tick(symbol: &str, price: Decimal, ts: DateTime<Utc>) -> Tick {
        Tick {
            symbol: symbol.to_string(),
            price,
            size: dec!(1),
            timestamp: ts,
            exchange_ts: ts,
        }
    }

    /// Deterministic noise in (-1, 1)
    fn noise(i: usize) -> f64 {
        let x = (i as f64 + 1.0) * 12.9898;
        (x.sin() * 43758.5453).fract()
    }

    async fn seed_paired_ticks(engine: &AnalysisEngine, minutes: i64) {
        let now = Utc::now();
        for i in 0..minutes {
            let ts = now - Duration::minutes(minutes - i);
            let x = 100.0 + i as f64;
            // Y = 2X up to a small perturbation
            let y = 2.0 * x * (1.0 + 0.0005 * noise(i as usize));
            engine
                .ingest_tick(tick("ETHUSDT", Decimal::from_f64_retain(x).unwrap(), ts))
                .await
                .unwrap();
            engine
                .ingest_tick(tick("BTCUSDT", Decimal::from_f64_retain(y).unwrap(), ts))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_full_analysis_fits_and_primes_cache() {
        let engine = create_test_engine();
        seed_paired_ticks(&engine, 40).await;

        let report = engine.run_full_analysis(create_test_request()).await.unwrap();
        assert_relative_eq!(report.model.beta, 1.0, epsilon = 0.05);
        assert!(report.points.len() >= 20);
        assert!(engine.cache.is_ready().await);

        // next pair of ticks publishes a live snapshot
        let now = Utc::now();
        engine.ingest_tick(tick("ETHUSDT", dec!(140), now)).await.unwrap();
        let stats = engine
            .ingest_tick(tick("BTCUSDT", dec!(280), now))
            .await
            .unwrap()
            .expect("snapshot after fit");
        assert!(stats.latest_spread.is_finite());

        let live = engine.live_stats().await.unwrap();
        assert_eq!(live.latest_price_y, dec!(280));
    }

    #[tokio::test]
    async fn test_failed_analysis_leaves_state_untouched() {
        let engine = create_test_engine();
        // far too few ticks to align
        let now = Utc::now();
        engine.ingest_tick(tick("ETHUSDT", dec!(100), now)).await.unwrap();
        engine.ingest_tick(tick("BTCUSDT", dec!(200), now)).await.unwrap();

        let result = engine.run_full_analysis(create_test_request()).await;
        assert!(matches!(
            result,
            Err(AnalyticsError::InsufficientData { .. })
        ));
        assert!(!engine.cache.is_ready().await);
        assert!(matches!(
            engine.export_rows().await,
            Err(AnalyticsError::ModelNotReady)
        ));
        assert!(matches!(
            engine.live_stats().await,
            Err(AnalyticsError::ModelNotReady)
        ));
    }

    #[tokio::test]
    async fn test_untracked_symbol_ignored() {
        let engine = create_test_engine();
        let now = Utc::now();
        let out = engine
            .ingest_tick(tick("SOLUSDT", dec!(50), now))
            .await
            .unwrap();
        assert!(out.is_none());
        assert_eq!(engine.store.len("SOLUSDT").await, 0);
    }

    #[tokio::test]
    async fn test_single_leg_tick_updates_with_last_other_leg() {
        let engine = create_test_engine();
        seed_paired_ticks(&engine, 40).await;
        engine.run_full_analysis(create_test_request()).await.unwrap();

        let out = engine
            .ingest_tick(tick("ETHUSDT", dec!(141), Utc::now()))
            .await
            .unwrap();
        assert!(out.is_some());
    }

    #[tokio::test]
    async fn test_alert_state_uses_configured_threshold() {
        let engine = create_test_engine();
        seed_paired_ticks(&engine, 40).await;
        engine.run_full_analysis(create_test_request()).await.unwrap();

        let now = Utc::now();
        engine.ingest_tick(tick("ETHUSDT", dec!(140), now)).await.unwrap();
        engine.ingest_tick(tick("BTCUSDT", dec!(280), now)).await.unwrap();

        let state = engine.alert_state(None).await.unwrap();
        assert_eq!(state.threshold, 2.0);

        // an absurdly tight threshold must breach whenever z is defined
        let tight = engine.alert_state(Some(0.0)).await.unwrap();
        if tight.z_score_at_breach.is_some() {
            assert!(tight.breached);
        }
    }

    #[tokio::test]
    async fn test_export_rows_match_report_points() {
        let engine = create_test_engine();
        seed_paired_ticks(&engine, 40).await;
        let report = engine.run_full_analysis(create_test_request()).await.unwrap();

        let rows = engine.export_rows().await.unwrap();
        assert_eq!(rows.len(), report.points.len());

        let doc = engine.export_document().await.unwrap();
        assert_eq!(doc.symbol_y, "BTCUSDT");
        assert_relative_eq!(doc.hedge_ratio, report.model.beta, epsilon = 1e-12);
    }
}
