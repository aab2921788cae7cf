//! Pairs-trading analytics pipeline
//!
//! Pure, synchronous building blocks: ticks to bars, bar alignment, hedge
//! regression, spread statistics and the stationarity test. Everything here
//! is CPU-bound and free of shared state; the engine module wires the
//! pieces together and owns the concurrency.

mod align;
mod hedge;
mod resample;
mod spread;
mod stationarity;
mod types;

pub use align::align;
pub use hedge::{FitWindow, HedgeFitter};
pub use resample::Resampler;
pub use spread::SpreadEngine;
pub use stationarity::{CriticalValues, StationarityTester, StationarityVerdict};
pub use types::{
    AlignedPairSeries, AlignedPoint, AnalysisReport, AnalyticsError, Bar, HedgeModel, SpreadPoint,
};

use rust_decimal::Decimal;

/// Decimal price to f64 for statistics, requiring strict positivity
pub(crate) fn positive_f64(price: Decimal) -> Result<f64, AnalyticsError> {
    let value: f64 = price.try_into().map_err(|_| {
        AnalyticsError::InvalidInput(format!("price {} is not representable as f64", price))
    })?;
    if value <= 0.0 {
        return Err(AnalyticsError::InvalidInput(format!(
            "price must be positive, got {}",
            price
        )));
    }
    Ok(value)
}

/// Natural log of a positive Decimal price
pub(crate) fn log_price(price: Decimal) -> Result<f64, AnalyticsError> {
    Ok(positive_f64(price)?.ln())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_positive_f64_accepts_positive() {
        assert_eq!(positive_f64(dec!(2.5)).unwrap(), 2.5);
    }

    #[test]
    fn test_positive_f64_rejects_zero_and_negative() {
        assert!(positive_f64(dec!(0)).is_err());
        assert!(positive_f64(dec!(-1)).is_err());
    }

    #[test]
    fn test_log_price() {
        let v = log_price(dec!(100)).unwrap();
        assert!((v - 100.0_f64.ln()).abs() < 1e-12);
    }
}
