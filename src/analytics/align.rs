//! Pair alignment: inner join of two bar sequences

use super::types::{AlignedPairSeries, AlignedPoint, AnalyticsError, Bar};

/// Join two bar sequences on bucket start, keeping closed bars only.
///
/// Both inputs must share a timeframe and be in ascending bucket order (the
/// resampler guarantees both). A timestamp missing from either side is
/// dropped; a timestamp present in both contributes one point carrying each
/// leg's close price. Fewer than `min_points` joined rows is an
/// `InsufficientData` failure so callers never fit on a thin overlap.
pub fn align(
    bars_x: &[Bar],
    bars_y: &[Bar],
    min_points: usize,
) -> Result<AlignedPairSeries, AnalyticsError> {
    let (symbol_x, timeframe_x) = leg_identity(bars_x);
    let (symbol_y, timeframe_y) = leg_identity(bars_y);
    if let (Some(tx), Some(ty)) = (timeframe_x, timeframe_y) {
        if tx != ty {
            return Err(AnalyticsError::InvalidInput(format!(
                "timeframe mismatch: {}s vs {}s",
                tx, ty
            )));
        }
    }

    let mut points = Vec::new();
    let mut ix = 0;
    let mut iy = 0;
    while ix < bars_x.len() && iy < bars_y.len() {
        let bx = &bars_x[ix];
        let by = &bars_y[iy];
        if !bx.is_closed {
            ix += 1;
            continue;
        }
        if !by.is_closed {
            iy += 1;
            continue;
        }
        match bx.bucket_start.cmp(&by.bucket_start) {
            std::cmp::Ordering::Less => ix += 1,
            std::cmp::Ordering::Greater => iy += 1,
            std::cmp::Ordering::Equal => {
                points.push(AlignedPoint {
                    timestamp: bx.bucket_start,
                    price_x: bx.close,
                    price_y: by.close,
                });
                ix += 1;
                iy += 1;
            }
        }
    }

    if points.len() < min_points {
        return Err(AnalyticsError::InsufficientData {
            have: points.len(),
            need: min_points,
        });
    }

    Ok(AlignedPairSeries {
        symbol_x,
        symbol_y,
        timeframe_secs: timeframe_x.unwrap_or_default(),
        points,
    })
}

fn leg_identity(bars: &[Bar]) -> (String, Option<i64>) {
    match bars.first() {
        Some(bar) => (bar.symbol.clone(), Some(bar.timeframe_secs)),
        None => (String::new(), None),
    }
}
