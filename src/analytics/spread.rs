//! Spread series and rolling statistics

use super::positive_f64;
use super::types::{AlignedPairSeries, AnalyticsError, HedgeModel, SpreadPoint};

/// Computes the residual spread and its trailing-window statistics.
///
/// The scan is explicit: one output per input timestamp, a window of `W`
/// points ending at the current index, `None` until the window fills and
/// whenever the deviation is zero. Values are never extrapolated. Standard
/// deviation uses the sample (n - 1) divisor.
pub struct SpreadEngine {
    z_window: usize,
}

impl SpreadEngine {
    /// Create an engine with the given rolling window width in bars
    pub fn new(z_window: usize) -> Self {
        Self { z_window }
    }

    /// Spread, rolling mean/std/z-score and rolling price correlation per point
    pub fn compute(
        &self,
        series: &AlignedPairSeries,
        model: &HedgeModel,
    ) -> Result<Vec<SpreadPoint>, AnalyticsError> {
        if self.z_window < 2 {
            return Err(AnalyticsError::InvalidInput(format!(
                "rolling window must be at least 2 bars, got {}",
                self.z_window
            )));
        }

        let n = series.len();
        let mut price_x = Vec::with_capacity(n);
        let mut price_y = Vec::with_capacity(n);
        let mut spread = Vec::with_capacity(n);
        for point in &series.points {
            let x = positive_f64(point.price_x)?;
            let y = positive_f64(point.price_y)?;
            spread.push(model.spread_from_logs(x.ln(), y.ln()));
            price_x.push(x);
            price_y.push(y);
        }

        let w = self.z_window;
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let mut rolling_mean = None;
            let mut rolling_std = None;
            let mut z_score = None;
            let mut correlation = None;
            if i + 1 >= w {
                let lo = i + 1 - w;
                let (mean, std) = mean_sample_std(&spread[lo..=i]);
                if std > 0.0 {
                    z_score = Some((spread[i] - mean) / std);
                }
                rolling_mean = Some(mean);
                rolling_std = Some(std);
                correlation = pearson(&price_x[lo..=i], &price_y[lo..=i]);
            }
            out.push(SpreadPoint {
                timestamp: series.points[i].timestamp,
                spread: spread[i],
                rolling_mean,
                rolling_std,
                z_score,
                correlation,
            });
        }

        Ok(out)
    }
}

fn mean_sample_std(window: &[f64]) -> (f64, f64) {
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let ss: f64 = window.iter().map(|v| (v - mean) * (v - mean)).sum();
    let std = if window.len() < 2 {
        0.0
    } else {
        (ss / (n - 1.0)).sqrt()
    };
    (mean, std)
}

fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;
    let mut num = 0.0;
    let mut ss_x = 0.0;
    let mut ss_y = 0.0;
    for i in 0..x.len() {
        let dx = x[i] - mean_x;
        let dy = y[i] - mean_y;
        num += dx * dy;
        ss_x += dx * dx;
        ss_y += dy * dy;
    }
    let den = (ss_x * ss_y).sqrt();
    if den <= f64::EPSILON {
        return None;
    }
    Some((num / den).clamp(-1.0, 1.0))
}
