//! Hedge ratio estimation via ordinary least squares

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::log_price;
use super::types::{AlignedPairSeries, AlignedPoint, AnalyticsError, HedgeModel};

/// Bounds the slice of aligned points a fit may use
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FitWindow {
    /// The most recent N points
    LastN(usize),
    /// Points with timestamps in [start, end]
    Range {
        /// Inclusive lower bound
        start: DateTime<Utc>,
        /// Inclusive upper bound
        end: DateTime<Utc>,
    },
}

/// Fits ln(price_y) = alpha + beta * ln(price_x) by least squares.
///
/// Every call is a full refit over the bounded window; nothing is updated
/// incrementally. The slope is the hedge ratio, the residual is the spread.
pub struct HedgeFitter {
    min_points: usize,
}

impl HedgeFitter {
    /// Create a fitter that refuses windows below `min_points`
    pub fn new(min_points: usize) -> Self {
        Self { min_points }
    }

    /// Fit a hedge model over the series, optionally bounded by a window
    pub fn fit(
        &self,
        series: &AlignedPairSeries,
        window: Option<FitWindow>,
    ) -> Result<HedgeModel, AnalyticsError> {
        let points = bound_window(&series.points, window);
        if points.len() < self.min_points {
            return Err(AnalyticsError::InsufficientData {
                have: points.len(),
                need: self.min_points,
            });
        }

        let mut ln_x = Vec::with_capacity(points.len());
        let mut ln_y = Vec::with_capacity(points.len());
        for point in points {
            ln_x.push(log_price(point.price_x)?);
            ln_y.push(log_price(point.price_y)?);
        }

        let n = points.len() as f64;
        let mean_x = ln_x.iter().sum::<f64>() / n;
        let mean_y = ln_y.iter().sum::<f64>() / n;

        let mut cov_xy = 0.0;
        let mut var_x = 0.0;
        for i in 0..points.len() {
            let dx = ln_x[i] - mean_x;
            cov_xy += dx * (ln_y[i] - mean_y);
            var_x += dx * dx;
        }
        if var_x <= f64::EPSILON {
            return Err(AnalyticsError::InvalidInput(format!(
                "regressor {} has zero variance over the fit window",
                series.symbol_x
            )));
        }

        let beta = cov_xy / var_x;
        let alpha = mean_y - beta * mean_x;

        let mut rss = 0.0;
        let mut tss = 0.0;
        for i in 0..points.len() {
            let resid = ln_y[i] - (alpha + beta * ln_x[i]);
            rss += resid * resid;
            let dy = ln_y[i] - mean_y;
            tss += dy * dy;
        }
        let r_squared = if tss <= f64::EPSILON {
            1.0
        } else {
            (1.0 - rss / tss).max(0.0)
        };

        Ok(HedgeModel {
            id: Uuid::new_v4(),
            alpha,
            beta,
            r_squared,
            fit_window_start: points[0].timestamp,
            fit_window_end: points[points.len() - 1].timestamp,
            n_points: points.len(),
            fitted_at: Utc::now(),
        })
    }
}

fn bound_window(points: &[AlignedPoint], window: Option<FitWindow>) -> &[AlignedPoint] {
    match window {
        None => points,
        Some(FitWindow::LastN(n)) => {
            let start = points.len().saturating_sub(n);
            &points[start..]
        }
        Some(FitWindow::Range { start, end }) => {
            let lo = points.partition_point(|p| p.timestamp < start);
            let hi = points.partition_point(|p| p.timestamp <= end);
            if lo >= hi {
                &points[0..0]
            } else {
                &points[lo..hi]
            }
        }
    }
}
