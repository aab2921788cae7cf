//! Integration tests for the capture to analysis path

use chrono::{DateTime, Duration, TimeZone, Utc};
use pairscope::analytics::AnalyticsError;
use pairscope::config::{AlertConfig, AnalysisConfig, FeedConfig};
use pairscope::data::{ParquetReader, ParquetWriter, TickRecord};
use pairscope::engine::{AnalysisEngine, AnalysisRequest};
use pairscope::feed::Tick;
use pairscope::live::LiveStatsCache;
use pairscope::store::TickStore;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use tempfile::TempDir;

/// Deterministic noise in (-1, 1)
fn noise(i: usize) -> f64 {
    let x = (i as f64 + 1.0) * 12.9898;
    (x.sin() * 43758.5453).fract()
}

fn record(symbol: &str, price: f64, ts: DateTime<Utc>) -> TickRecord {
    TickRecord {
        timestamp: ts,
        symbol: symbol.to_string(),
        price: Decimal::from_f64(price).unwrap(),
        size: Decimal::ONE,
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
async fn test_captured_ticks_roundtrip_into_analysis() {
    let temp_dir = TempDir::new().unwrap();
    let writer = ParquetWriter::new(temp_dir.path().to_path_buf(), 3600);

    // Capture 25 minutes of paired trading to one Parquet file
    let base = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    let mut records = Vec::new();
    for i in 0..25usize {
        let ts = base + Duration::seconds(i as i64 * 60 + 10);
        let x = 100.0 + i as f64;
        let y = 2.0 * x * (1.0 + 1e-4 * noise(i));
        records.push(record("ETHUSDT", x, ts));
        records.push(record("BTCUSDT", y, ts));
    }

    let path = writer.file_path("ticks", base);
    writer.write_ticks(&path, &records).unwrap();

    let read_back = ParquetReader::new(path).read_ticks().unwrap();
    assert_eq!(read_back.len(), 50);
    assert_eq!(read_back[0].symbol, "ETHUSDT");
    assert_eq!(read_back[0].price, records[0].price);
    assert_eq!(read_back[0].size, Decimal::ONE);

    // Feed the captured records through the engine, offline style
    let store = Arc::new(TickStore::new());
    for r in &read_back {
        store
            .append(Tick {
                symbol: r.symbol.clone(),
                price: r.price,
                size: r.size,
                timestamp: r.timestamp,
                exchange_ts: r.exchange_ts,
            })
            .await;
    }

    let feed = test_feed_config();
    let analysis = test_analysis_config();
    let engine = AnalysisEngine::new(
        store,
        Arc::new(LiveStatsCache::new()),
        &feed,
        analysis.clone(),
        AlertConfig::default(),
    );

    let mut request = AnalysisRequest::from_config(&feed, &analysis);
    request.as_of = Some(base + Duration::seconds(25 * 60 + 30));
    let report = engine.run_full_analysis(request).await.unwrap();

    assert_eq!(report.points.len(), 25);
    assert!((report.model.beta - 1.0).abs() < 0.05);
    assert!(report.verdict.is_stationary);
}

#[tokio::test]
async fn test_engine_not_ready_before_first_fit() {
    let feed = test_feed_config();
    let engine = AnalysisEngine::new(
        Arc::new(TickStore::new()),
        Arc::new(LiveStatsCache::new()),
        &feed,
        test_analysis_config(),
        AlertConfig::default(),
    );

    assert!(matches!(
        engine.live_stats().await,
        Err(AnalyticsError::ModelNotReady)
    ));
    assert!(matches!(
        engine.alert_state(None).await,
        Err(AnalyticsError::ModelNotReady)
    ));
    assert!(matches!(
        engine.export_document().await,
        Err(AnalyticsError::ModelNotReady)
    ));
}

#[tokio::test]
async fn test_analysis_fails_cleanly_on_sparse_data() {
    let feed = test_feed_config();
    let analysis = test_analysis_config();
    let store = Arc::new(TickStore::new());
    let engine = AnalysisEngine::new(
        store,
        Arc::new(LiveStatsCache::new()),
        &feed,
        analysis.clone(),
        AlertConfig::default(),
    );

    // Only three aligned bars, far below min_fit_points
    let base = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    for i in 0..3usize {
        let ts = base + Duration::seconds(i as i64 * 60 + 10);
        engine
            .ingest_tick(Tick {
                symbol: "ETHUSDT".to_string(),
                price: Decimal::from_f64(100.0 + i as f64).unwrap(),
                size: Decimal::ONE,
                timestamp: ts,
                exchange_ts: ts,
            })
            .await
            .unwrap();
        engine
            .ingest_tick(Tick {
                symbol: "BTCUSDT".to_string(),
                price: Decimal::from_f64(200.0 + i as f64).unwrap(),
                size: Decimal::ONE,
                timestamp: ts,
                exchange_ts: ts,
            })
            .await
            .unwrap();
    }

    let mut request = AnalysisRequest::from_config(&feed, &analysis);
    request.as_of = Some(base + Duration::seconds(3 * 60 + 30));
    let result = engine.run_full_analysis(request).await;

    assert!(matches!(
        result,
        Err(AnalyticsError::InsufficientData { have: 3, need: 20 })
    ));
    // The failed run left the engine without a model
    assert!(matches!(
        engine.live_stats().await,
        Err(AnalyticsError::ModelNotReady)
    ));
}
