//! Core analytics types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::log_price;
use super::StationarityVerdict;

/// Analytics pipeline errors
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Not enough observations for the requested computation
    #[error("Insufficient data: have {have}, need {need}")]
    InsufficientData {
        /// Observations available
        have: usize,
        /// Observations required
        need: usize,
    },
    /// Input violates a precondition (non-positive price, degenerate series, bad window)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Live or export query before any successful batch fit
    #[error("Model not ready: no successful fit yet")]
    ModelNotReady,
}

/// A fixed-interval OHLCV bar built from ticks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Symbol the bar belongs to
    pub symbol: String,
    /// Bucket width in seconds
    pub timeframe_secs: i64,
    /// Inclusive start of the bucket (epoch-aligned, left-labeled)
    pub bucket_start: DateTime<Utc>,
    /// First trade price in the bucket
    pub open: Decimal,
    /// Highest trade price in the bucket
    pub high: Decimal,
    /// Lowest trade price in the bucket
    pub low: Decimal,
    /// Last trade price in the bucket
    pub close: Decimal,
    /// Sum of trade sizes in the bucket
    pub volume: Decimal,
    /// False only for the bucket containing "now"; open bars never enter statistics
    pub is_closed: bool,
}

impl Bar {
    /// Gap-fill bar for a tickless bucket: previous close carried forward, zero volume
    pub fn synthetic(
        symbol: &str,
        timeframe_secs: i64,
        bucket_start: DateTime<Utc>,
        prev_close: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            timeframe_secs,
            bucket_start,
            open: prev_close,
            high: prev_close,
            low: prev_close,
            close: prev_close,
            volume: Decimal::ZERO,
            is_closed: true,
        }
    }
}

/// One timestamp present in both legs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedPoint {
    /// Shared bucket start
    pub timestamp: DateTime<Utc>,
    /// Close price of the X leg
    pub price_x: Decimal,
    /// Close price of the Y leg
    pub price_y: Decimal,
}

/// Inner join of two bar sequences on bucket start, closed bars only
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPairSeries {
    /// Independent leg (regressor)
    pub symbol_x: String,
    /// Dependent leg (regressand)
    pub symbol_y: String,
    /// Bucket width of both legs in seconds
    pub timeframe_secs: i64,
    /// Joined points in ascending timestamp order
    pub points: Vec<AlignedPoint>,
}

impl AlignedPairSeries {
    /// Number of aligned points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when no timestamps aligned
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A fitted hedge regression: ln(price_y) = alpha + beta * ln(price_x)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HedgeModel {
    /// Unique model identifier
    pub id: Uuid,
    /// Regression intercept
    pub alpha: f64,
    /// Hedge ratio (regression slope)
    pub beta: f64,
    /// Coefficient of determination of the fit
    pub r_squared: f64,
    /// Timestamp of the first point in the fit window
    pub fit_window_start: DateTime<Utc>,
    /// Timestamp of the last point in the fit window
    pub fit_window_end: DateTime<Utc>,
    /// Number of points the fit used
    pub n_points: usize,
    /// Fit completion time
    pub fitted_at: DateTime<Utc>,
}

impl HedgeModel {
    /// Residual spread for a pair of log prices
    pub fn spread_from_logs(&self, ln_x: f64, ln_y: f64) -> f64 {
        ln_y - (self.alpha + self.beta * ln_x)
    }

    /// Residual spread for a pair of raw prices; fails on non-positive input
    pub fn spread(&self, price_x: Decimal, price_y: Decimal) -> Result<f64, AnalyticsError> {
        let ln_x = log_price(price_x)?;
        let ln_y = log_price(price_y)?;
        Ok(self.spread_from_logs(ln_x, ln_y))
    }
}

/// Spread and rolling statistics at one aligned timestamp.
///
/// `None` marks an undefined value: the first `W - 1` points of a window of
/// width `W`, and the z-score whenever the rolling deviation is zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadPoint {
    /// Aligned bucket start
    pub timestamp: DateTime<Utc>,
    /// Residual spread under the fitted model
    pub spread: f64,
    /// Trailing-window mean of the spread
    pub rolling_mean: Option<f64>,
    /// Trailing-window sample standard deviation of the spread
    pub rolling_std: Option<f64>,
    /// (spread - rolling_mean) / rolling_std
    pub z_score: Option<f64>,
    /// Trailing-window Pearson correlation of the raw close prices
    pub correlation: Option<f64>,
}

/// Output of one full batch analysis run
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// Independent leg
    pub symbol_x: String,
    /// Dependent leg
    pub symbol_y: String,
    /// Bar width in seconds
    pub timeframe_secs: i64,
    /// Rolling window width in bars
    pub z_window: usize,
    /// The fitted hedge model
    pub model: Arc<HedgeModel>,
    /// Spread series with rolling statistics, one per aligned timestamp
    pub points: Vec<SpreadPoint>,
    /// Stationarity verdict on the spread series
    pub verdict: StationarityVerdict,
    /// Report generation time
    pub generated_at: DateTime<Utc>,
}

impl AnalysisReport {
    /// Latest point with a defined rolling mean and deviation, scanning from the end
    pub fn last_defined_window(&self) -> Option<&SpreadPoint> {
        self.points
            .iter()
            .rev()
            .find(|p| p.rolling_mean.is_some() && p.rolling_std.is_some())
    }
}
