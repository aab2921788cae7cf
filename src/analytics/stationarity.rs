//! Augmented Dickey-Fuller stationarity test

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::AnalyticsError;

/// Minimum spread observations before a test is meaningful
const MIN_OBSERVATIONS: usize = 20;

/// Dickey-Fuller critical values (constant-only regression) by sample size.
/// Rows below/above the table range clamp to the boundary row.
const CRITICAL_VALUE_TABLE: [(usize, f64, f64, f64); 5] = [
    (25, -3.75, -3.00, -2.63),
    (50, -3.58, -2.93, -2.60),
    (100, -3.51, -2.89, -2.58),
    (250, -3.46, -2.88, -2.57),
    (500, -3.44, -2.87, -2.57),
];

/// Interpolated critical values for one test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalValues {
    /// 1% rejection threshold
    pub one_pct: f64,
    /// 5% rejection threshold
    pub five_pct: f64,
    /// 10% rejection threshold
    pub ten_pct: f64,
}

/// Outcome of a stationarity test on a spread series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationarityVerdict {
    /// Dickey-Fuller t-statistic on the lagged level
    pub statistic: f64,
    /// Approximate p-value interpolated from the Dickey-Fuller distribution
    pub p_value: f64,
    /// Size-adjusted rejection thresholds
    pub critical_values: CriticalValues,
    /// True when the unit root is rejected at the configured significance
    pub is_stationary: bool,
    /// Augmentation lag order the final regression used
    pub lag_used: usize,
    /// Observations entering the final regression
    pub n_obs: usize,
    /// Test completion time
    pub evaluated_at: DateTime<Utc>,
}

/// Tests a spread series for mean reversion.
///
/// Fits the augmented Dickey-Fuller regression with constant,
/// dy_t = c + gamma * y_{t-1} + sum phi_i * dy_{t-i} + e_t, and rejects the
/// unit root when gamma's t-statistic falls below the interpolated critical
/// region. With no explicit lag order, the lag is chosen by minimum AIC over
/// a common sample up to the Schwert bound, then the chosen order is refit on
/// the full sample. A p-value above the significance level is a valid
/// verdict, not an error.
pub struct StationarityTester {
    significance: f64,
    max_lag: Option<usize>,
}

impl StationarityTester {
    /// Create a tester; `max_lag = None` selects the lag order automatically
    pub fn new(significance: f64, max_lag: Option<usize>) -> Self {
        Self {
            significance,
            max_lag,
        }
    }

    /// Run the test on a spread series in time order
    pub fn test(&self, series: &[f64]) -> Result<StationarityVerdict, AnalyticsError> {
        let n = series.len();
        if n < MIN_OBSERVATIONS {
            return Err(AnalyticsError::InsufficientData {
                have: n,
                need: MIN_OBSERVATIONS,
            });
        }
        if !(self.significance > 0.0 && self.significance < 1.0) {
            return Err(AnalyticsError::InvalidInput(format!(
                "significance must be in (0, 1), got {}",
                self.significance
            )));
        }

        // keeps at least one residual degree of freedom at the largest lag
        let hard_cap = n / 2 - 2;
        let lag = match self.max_lag {
            Some(k) if k > hard_cap => {
                return Err(AnalyticsError::InvalidInput(format!(
                    "lag order {} too large for {} observations",
                    k, n
                )));
            }
            Some(k) => k,
            None => select_lag_by_aic(series, schwert_lag_bound(n).min(hard_cap))?,
        };

        let fit = adf_regression(series, lag, lag + 1)?;
        if !fit.t_stat.is_finite() {
            return Err(AnalyticsError::InvalidInput(
                "degenerate unit-root regression".to_string(),
            ));
        }

        let critical_values = critical_values_for(fit.n_obs);
        let p_value = approximate_p_value(fit.t_stat, &critical_values);
        Ok(StationarityVerdict {
            statistic: fit.t_stat,
            p_value,
            critical_values,
            is_stationary: p_value <= self.significance,
            lag_used: lag,
            n_obs: fit.n_obs,
            evaluated_at: Utc::now(),
        })
    }
}

struct AdfFit {
    t_stat: f64,
    rss: f64,
    n_obs: usize,
    n_params: usize,
}

/// Schwert rule of thumb for the largest lag worth considering
fn schwert_lag_bound(n: usize) -> usize {
    (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize
}

/// Minimum-AIC lag order over a sample shared by all candidates
fn select_lag_by_aic(series: &[f64], max_lag: usize) -> Result<usize, AnalyticsError> {
    let start_t = max_lag + 1;
    let mut best_lag = 0;
    let mut best_aic = f64::INFINITY;
    for k in 0..=max_lag {
        let fit = adf_regression(series, k, start_t)?;
        let n_eff = fit.n_obs as f64;
        let aic = n_eff * (fit.rss / n_eff).ln() + 2.0 * fit.n_params as f64;
        if aic < best_aic {
            best_aic = aic;
            best_lag = k;
        }
    }
    Ok(best_lag)
}

/// Fit dy_t = c + gamma * y_{t-1} + sum phi_i * dy_{t-i} for t in [start_t, n)
fn adf_regression(y: &[f64], k: usize, start_t: usize) -> Result<AdfFit, AnalyticsError> {
    let n = y.len();
    let p = k + 2;
    if n <= start_t {
        return Err(AnalyticsError::InsufficientData {
            have: 0,
            need: p + 1,
        });
    }
    let rows = n - start_t;
    if rows <= p {
        return Err(AnalyticsError::InsufficientData {
            have: rows,
            need: p + 1,
        });
    }

    let mut design = Vec::with_capacity(rows);
    let mut target = Vec::with_capacity(rows);
    for t in start_t..n {
        let mut row = Vec::with_capacity(p);
        row.push(1.0);
        row.push(y[t - 1]);
        for i in 1..=k {
            row.push(y[t - i] - y[t - i - 1]);
        }
        design.push(row);
        target.push(y[t] - y[t - 1]);
    }

    let mut xtx = vec![vec![0.0; p]; p];
    let mut xty = vec![0.0; p];
    for (row, &d) in design.iter().zip(target.iter()) {
        for a in 0..p {
            xty[a] += row[a] * d;
            for b in 0..p {
                xtx[a][b] += row[a] * row[b];
            }
        }
    }

    let singular = || {
        AnalyticsError::InvalidInput(
            "unit-root regression is singular (constant spread series?)".to_string(),
        )
    };
    let coeffs = solve_linear_system(&xtx, &xty).ok_or_else(singular)?;

    let mut rss = 0.0;
    for (row, &d) in design.iter().zip(target.iter()) {
        let fitted: f64 = row.iter().zip(coeffs.iter()).map(|(x, c)| x * c).sum();
        let resid = d - fitted;
        rss += resid * resid;
    }

    // se(gamma) via the gamma diagonal of (X'X)^-1
    let mut unit = vec![0.0; p];
    unit[1] = 1.0;
    let inv_col = solve_linear_system(&xtx, &unit).ok_or_else(singular)?;
    let sigma2 = rss / (rows - p) as f64;
    let var_gamma = sigma2 * inv_col[1];
    let se_gamma = var_gamma.max(0.0).sqrt();
    let t_stat = if se_gamma > 0.0 {
        coeffs[1] / se_gamma
    } else {
        f64::NAN
    };

    Ok(AdfFit {
        t_stat,
        rss,
        n_obs: rows,
        n_params: p,
    })
}

/// Gaussian elimination with partial pivoting; None when the system is singular
fn solve_linear_system(matrix: &[Vec<f64>], rhs: &[f64]) -> Option<Vec<f64>> {
    let n = rhs.len();
    let mut a: Vec<Vec<f64>> = matrix.to_vec();
    let mut b = rhs.to_vec();

    for col in 0..n {
        let mut pivot = col;
        for row in col + 1..n {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        let pivot_row = a[col].clone();
        let pivot_b = b[col];
        for row in col + 1..n {
            let factor = a[row][col] / pivot_row[col];
            for c in col..n {
                a[row][c] -= factor * pivot_row[c];
            }
            b[row] -= factor * pivot_b;
        }
    }

    let mut x = vec![0.0; n];
    for col in (0..n).rev() {
        let mut acc = b[col];
        for c in col + 1..n {
            acc -= a[col][c] * x[c];
        }
        x[col] = acc / a[col][col];
    }
    Some(x)
}

/// Linear interpolation of the critical-value table by regression sample size
fn critical_values_for(n_obs: usize) -> CriticalValues {
    let first = CRITICAL_VALUE_TABLE[0];
    if n_obs > first.0 {
        for pair in CRITICAL_VALUE_TABLE.windows(2) {
            let (n0, c1_0, c5_0, c10_0) = pair[0];
            let (n1, c1_1, c5_1, c10_1) = pair[1];
            if n_obs <= n1 {
                let frac = (n_obs - n0) as f64 / (n1 - n0) as f64;
                return CriticalValues {
                    one_pct: c1_0 + frac * (c1_1 - c1_0),
                    five_pct: c5_0 + frac * (c5_1 - c5_0),
                    ten_pct: c10_0 + frac * (c10_1 - c10_0),
                };
            }
        }
    }
    // below the first row or past the last: clamp to the boundary row
    let row = if n_obs <= first.0 {
        first
    } else {
        CRITICAL_VALUE_TABLE[CRITICAL_VALUE_TABLE.len() - 1]
    };
    CriticalValues {
        one_pct: row.1,
        five_pct: row.2,
        ten_pct: row.3,
    }
}

/// Piecewise-linear p-value through Dickey-Fuller quantile anchors.
///
/// The 1/5/10% anchors are the size-adjusted critical values; the remaining
/// anchors are asymptotic quantiles of the constant-case distribution. Below
/// the 1% anchor the p-value decays one decade per unit of t, floored at 1e-4.
fn approximate_p_value(t: f64, crits: &CriticalValues) -> f64 {
    let anchors = [
        (crits.one_pct, 0.01),
        (crits.five_pct, 0.05),
        (crits.ten_pct, 0.10),
        (-1.57, 0.50),
        (-0.44, 0.90),
        (-0.07, 0.95),
        (0.60, 0.99),
    ];
    if t <= anchors[0].0 {
        return (0.01 * 10f64.powf(t - anchors[0].0)).max(1e-4);
    }
    for pair in anchors.windows(2) {
        let (t0, p0) = pair[0];
        let (t1, p1) = pair[1];
        if t <= t1 {
            return p0 + (p1 - p0) * (t - t0) / (t1 - t0);
        }
    }
    0.999
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Deterministic noise in (-1, 1), uniform-ish, no RNG dependency
    fn noise(i: usize) -> f64 {
        let x = (i as f64 + 1.0) * 12.9898;
        (x.sin() * 43758.5453).fract()
    }

    #[test]
    fn test_minimum_observations() {
        let series: Vec<f64> = (0..19).map(noise).collect();
        let result = StationarityTester::new(0.05, None).test(&series);
        assert!(matches!(
            result,
            Err(AnalyticsError::InsufficientData { have: 19, need: 20 })
        ));
    }

    #[test]
    fn test_white_noise_is_stationary() {
        let series: Vec<f64> = (0..100).map(noise).collect();
        let verdict = StationarityTester::new(0.05, None).test(&series).unwrap();

        assert!(verdict.statistic < verdict.critical_values.one_pct);
        assert!(verdict.p_value < 0.05);
        assert!(verdict.is_stationary);
    }

    #[test]
    fn test_mean_reverting_ar1_is_stationary() {
        let mut series = vec![0.0];
        for i in 1..100 {
            let prev = series[i - 1];
            series.push(0.5 * prev + noise(i));
        }
        let verdict = StationarityTester::new(0.05, None).test(&series).unwrap();
        assert!(verdict.is_stationary);
    }

    #[test]
    fn test_trending_series_is_not_stationary() {
        // strong drift dwarfs the noise; no mean reversion to find
        let series: Vec<f64> = (0..100).map(|i| i as f64 + 0.1 * noise(i)).collect();
        let verdict = StationarityTester::new(0.05, None).test(&series).unwrap();

        assert!(!verdict.is_stationary);
        assert!(verdict.p_value > 0.10);
    }

    #[test]
    fn test_high_p_value_is_a_verdict_not_an_error() {
        let series: Vec<f64> = (0..50).map(|i| i as f64 + 0.1 * noise(i)).collect();
        let result = StationarityTester::new(0.05, None).test(&series);
        assert!(result.is_ok());
    }

    #[test]
    fn test_explicit_lag_order_respected() {
        let series: Vec<f64> = (0..100).map(noise).collect();
        let verdict = StationarityTester::new(0.05, Some(2)).test(&series).unwrap();
        assert_eq!(verdict.lag_used, 2);
        assert_eq!(verdict.n_obs, 97);
    }

    #[test]
    fn test_oversized_lag_rejected() {
        let series: Vec<f64> = (0..20).map(noise).collect();
        let result = StationarityTester::new(0.05, Some(9)).test(&series);
        assert!(matches!(result, Err(AnalyticsError::InvalidInput(_))));
    }

    #[test]
    fn test_constant_series_is_degenerate() {
        let series = vec![1.5; 50];
        let result = StationarityTester::new(0.05, None).test(&series);
        assert!(matches!(result, Err(AnalyticsError::InvalidInput(_))));
    }

    #[test]
    fn test_invalid_significance_rejected() {
        let series: Vec<f64> = (0..50).map(noise).collect();
        let result = StationarityTester::new(0.0, None).test(&series);
        assert!(matches!(result, Err(AnalyticsError::InvalidInput(_))));
    }

    #[test]
    fn test_critical_value_interpolation() {
        let low = critical_values_for(20);
        assert_relative_eq!(low.one_pct, -3.75, epsilon = 1e-12);

        let mid = critical_values_for(75);
        assert_relative_eq!(mid.one_pct, -3.545, epsilon = 1e-9);
        assert_relative_eq!(mid.five_pct, -2.91, epsilon = 1e-9);

        let high = critical_values_for(5000);
        assert_relative_eq!(high.one_pct, -3.44, epsilon = 1e-12);
    }

    #[test]
    fn test_p_value_monotone_in_statistic() {
        let crits = critical_values_for(100);
        let p4 = approximate_p_value(-4.0, &crits);
        let p3 = approximate_p_value(-3.0, &crits);
        let p2 = approximate_p_value(-2.0, &crits);
        let p0 = approximate_p_value(0.0, &crits);
        assert!(p4 < p3);
        assert!(p3 < p2);
        assert!(p2 < p0);
        assert_relative_eq!(approximate_p_value(crits.five_pct, &crits), 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_p_value_clamps_in_deep_rejection() {
        let crits = critical_values_for(100);
        let p = approximate_p_value(-20.0, &crits);
        assert!(p >= 1e-4);
        assert!(p < 0.001);
    }

    #[test]
    fn test_solver_recovers_known_solution() {
        // 2x + y = 5, x + 3y = 10
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let b = vec![5.0, 10.0];
        let x = solve_linear_system(&a, &b).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_solver_detects_singularity() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        let b = vec![1.0, 2.0];
        assert!(solve_linear_system(&a, &b).is_none());
    }
}
