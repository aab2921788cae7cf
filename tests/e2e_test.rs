//! End-to-end integration tests
//!
//! Drives the public pipeline the way the run and analyze commands do:
//! ticks in, fitted model and spread diagnostics out.

use chrono::{DateTime, Duration, TimeZone, Utc};
use pairscope::analytics::Resampler;
use pairscope::config::{AlertConfig, AnalysisConfig, Config, FeedConfig};
use pairscope::engine::{AnalysisEngine, AnalysisRequest};
use pairscope::feed::Tick;
use pairscope::live::LiveStatsCache;
use pairscope::store::TickStore;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Deterministic noise in (-1, 1)
fn noise(i: usize) -> f64 {
    let x = (i as f64 + 1.0) * 12.9898;
    (x.sin() * 43758.5453).fract()
}

fn tick(symbol: &str, price: f64, ts: DateTime<Utc>) -> Tick {
    Tick {
        symbol: symbol.to_string(),
        price: Decimal::from_f64(price).unwrap(),
        size: Decimal::ONE,
        timestamp: ts,
        exchange_ts: ts,
    }
}

fn test_feed_config() -> FeedConfig {
    FeedConfig {
        exchange: "binance".to_string(),
        symbol_x: "ETHUSDT".to_string(),
        symbol_y: "BTCUSDT".to_string(),
    }
}

fn test_analysis_config() -> AnalysisConfig {
    AnalysisConfig {
        timeframe_secs: 60,
        z_window: 5,
        lookback_minutes: 720,
        min_fit_points: 20,
        significance: 0.05,
        max_lag: Some(1),
        trigger_interval_secs: 300,
    }
}

#[tokio::test]
async fn test_doubled_pair_recovers_unit_log_slope() {
    let store = Arc::new(TickStore::new());
    let cache = Arc::new(LiveStatsCache::new());
    let feed = test_feed_config();
    let analysis = test_analysis_config();
    let engine = AnalysisEngine::new(
        store,
        cache,
        &feed,
        analysis.clone(),
        AlertConfig::default(),
    );

    // One tick per minute for both legs; Y trades at twice X with a
    // tiny perturbation, so on logs the slope is 1 and the intercept ln 2.
    let base = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    for i in 0..30usize {
        let ts = base + Duration::seconds(i as i64 * 60 + 10);
        let x = 100.0 + i as f64;
        let y = 2.0 * x * (1.0 + 1e-4 * noise(i));
        engine.ingest_tick(tick("ETHUSDT", x, ts)).await.unwrap();
        engine.ingest_tick(tick("BTCUSDT", y, ts)).await.unwrap();
    }

    let mut request = AnalysisRequest::from_config(&feed, &analysis);
    request.as_of = Some(base + Duration::seconds(30 * 60 + 30));
    let report = engine.run_full_analysis(request).await.unwrap();

    assert_eq!(report.points.len(), 30);
    assert!(
        (report.model.beta - 1.0).abs() < 0.05,
        "beta {} should be close to 1",
        report.model.beta
    );
    assert!(
        (report.model.alpha - 2f64.ln()).abs() < 0.05,
        "alpha {} should be close to ln 2",
        report.model.alpha
    );
    assert!(report.model.r_squared > 0.99);

    // The fitted spread stays near zero for the whole series
    for point in &report.points {
        assert!(point.spread.abs() < 0.01);
    }

    // Rolling stats undefined until the window fills
    assert!(report.points[3].z_score.is_none());
    assert!(report.points[4].z_score.is_some());
    assert!(report.points.last().unwrap().correlation.unwrap() > 0.99);

    // A near-zero noise spread is strongly stationary
    assert!(report.verdict.is_stationary);
    assert!(report.verdict.p_value < 0.05);
    assert_eq!(report.verdict.lag_used, 1);
    assert_eq!(report.verdict.n_obs, 28);
}

#[tokio::test]
async fn test_live_updates_after_batch_fit() {
    let store = Arc::new(TickStore::new());
    let cache = Arc::new(LiveStatsCache::new());
    let feed = test_feed_config();
    let analysis = test_analysis_config();
    let engine = AnalysisEngine::new(
        store,
        cache,
        &feed,
        analysis.clone(),
        AlertConfig::default(),
    );

    let base = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    for i in 0..30usize {
        let ts = base + Duration::seconds(i as i64 * 60 + 10);
        let x = 100.0 + i as f64;
        let y = 2.0 * x * (1.0 + 1e-4 * noise(i));
        engine.ingest_tick(tick("ETHUSDT", x, ts)).await.unwrap();
        engine.ingest_tick(tick("BTCUSDT", y, ts)).await.unwrap();
    }

    let mut request = AnalysisRequest::from_config(&feed, &analysis);
    request.as_of = Some(base + Duration::seconds(30 * 60 + 30));
    engine.run_full_analysis(request).await.unwrap();

    // A single new tick on one leg publishes a fresh snapshot using the
    // other leg's last seen price
    let ts = base + Duration::seconds(30 * 60 + 40);
    let stats = engine
        .ingest_tick(tick("ETHUSDT", 130.0, ts))
        .await
        .unwrap()
        .expect("snapshot should exist after a successful fit");
    assert!(stats.latest_spread.abs() < 0.05);
    assert!(stats.latest_z_score.is_some());
    assert!(stats.model_ref.upgrade().is_some());

    // With a zero threshold any defined z-score counts as a breach
    let alert = engine.alert_state(Some(0.0)).await.unwrap();
    assert!(alert.breached);

    // Export mirrors the latest report
    let document = engine.export_document().await.unwrap();
    assert_eq!(document.rows.len(), 30);
    assert_eq!(document.symbol_x, "ETHUSDT");
    assert!((document.hedge_ratio - 1.0).abs() < 0.05);
}

#[test]
fn test_resample_is_order_independent() {
    let base = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    let now = base + Duration::seconds(600);

    let mut ticks = Vec::new();
    for i in 0..8usize {
        let ts = base + Duration::seconds(i as i64 * 45);
        ticks.push(tick("ETHUSDT", 100.0 + noise(i), ts));
    }

    let resampler = Resampler::new(Duration::seconds(60));
    let bars_forward = resampler.resample("ETHUSDT", &ticks, now).unwrap();

    let reversed: Vec<Tick> = ticks.iter().rev().cloned().collect();
    let bars_reversed = resampler.resample("ETHUSDT", &reversed, now).unwrap();

    assert_eq!(bars_forward, bars_reversed);
}

#[test]
fn test_config_example_parses() {
    let config: Config =
        toml::from_str(include_str!("../config.toml.example")).expect("example config is valid");
    assert_eq!(config.feed.exchange, "binance");
    assert_eq!(config.feed.symbol_x, "ETHUSDT");
    assert_eq!(config.feed.symbol_y, "BTCUSDT");
    assert_eq!(config.analysis.timeframe_secs, 60);
    assert_eq!(config.analysis.z_window, 60);
    assert!(config.analysis.max_lag.is_none());
    assert_eq!(config.alert.z_threshold, 2.0);
    assert!(!config.data.capture_enabled);
    assert_eq!(config.telemetry.metrics_port, 9090);
}
