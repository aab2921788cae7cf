//! pairscope: Pairs trading analytics engine for crypto tick data
//!
//! This library provides the core components for:
//! - Real-time trade ticks from Binance for both legs of a pair
//! - Tick resampling into gap-filled OHLCV bars
//! - Bar alignment across the pair on shared bucket timestamps
//! - OLS hedge ratio estimation on log prices
//! - Spread, rolling z-score and correlation series
//! - ADF stationarity testing of the spread
//! - O(1) live spread updates against the last fitted model
//! - Level-triggered z-score alerts
//! - Data capture to Parquet and offline analysis
//! - Full observability stack

pub mod analytics;
pub mod cli;
pub mod config;
pub mod data;
pub mod engine;
pub mod export;
pub mod feed;
pub mod live;
pub mod store;
pub mod telemetry;
pub mod ws;
