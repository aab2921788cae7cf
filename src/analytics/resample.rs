//! Tick-to-bar resampling

use chrono::{DateTime, Duration, Utc};

use super::types::{AnalyticsError, Bar};
use crate::feed::Tick;

/// Resamples raw ticks into fixed-interval OHLCV bars.
///
/// Pure function of its inputs: the cutoff `now` is an explicit argument, so
/// identical tick sets always produce identical bars. Buckets are
/// epoch-aligned and left-labeled. Tickless buckets between the first tick
/// and `now` are gap-filled with the previous close at zero volume. The
/// bucket containing `now` is emitted with `is_closed = false`; downstream
/// statistics must skip it.
pub struct Resampler {
    timeframe: Duration,
}

impl Resampler {
    /// Create a resampler for the given bucket width
    pub fn new(timeframe: Duration) -> Self {
        Self { timeframe }
    }

    /// Resample ticks into a contiguous bar sequence ending at the bucket containing `now`.
    ///
    /// Ticks are stably re-sorted by exchange timestamp, so out-of-order
    /// arrival within the slice is absorbed. Ticks after `now` are ignored.
    /// An empty slice yields an empty sequence.
    pub fn resample(
        &self,
        symbol: &str,
        ticks: &[Tick],
        now: DateTime<Utc>,
    ) -> Result<Vec<Bar>, AnalyticsError> {
        let tf = self.timeframe.num_seconds();
        if tf <= 0 {
            return Err(AnalyticsError::InvalidInput(format!(
                "timeframe must be positive, got {}s",
                tf
            )));
        }

        let mut sorted: Vec<&Tick> = ticks.iter().filter(|t| t.exchange_ts <= now).collect();
        sorted.sort_by_key(|t| t.exchange_ts);
        if sorted.is_empty() {
            return Ok(Vec::new());
        }

        let first_bucket = align(sorted[0].exchange_ts.timestamp(), tf);
        let open_bucket = align(now.timestamp(), tf);

        let mut bars = Vec::with_capacity(((open_bucket - first_bucket) / tf + 1) as usize);
        let mut idx = 0;
        let mut prev_close = sorted[0].price;

        let mut bucket = first_bucket;
        while bucket <= open_bucket {
            let bucket_end = bucket + tf;
            let start_idx = idx;
            while idx < sorted.len() && sorted[idx].exchange_ts.timestamp() < bucket_end {
                idx += 1;
            }

            let bucket_start = DateTime::from_timestamp(bucket, 0).unwrap_or_default();
            let in_bucket = &sorted[start_idx..idx];
            let mut bar = if in_bucket.is_empty() {
                Bar::synthetic(symbol, tf, bucket_start, prev_close)
            } else {
                let open = in_bucket[0].price;
                let close = in_bucket[in_bucket.len() - 1].price;
                let mut high = open;
                let mut low = open;
                let mut volume = rust_decimal::Decimal::ZERO;
                for tick in in_bucket {
                    if tick.price > high {
                        high = tick.price;
                    }
                    if tick.price < low {
                        low = tick.price;
                    }
                    volume += tick.size;
                }
                prev_close = close;
                Bar {
                    symbol: symbol.to_string(),
                    timeframe_secs: tf,
                    bucket_start,
                    open,
                    high,
                    low,
                    close,
                    volume,
                    is_closed: true,
                }
            };
            bar.is_closed = bucket != open_bucket;
            bars.push(bar);
            bucket = bucket_end;
        }

        Ok(bars)
    }
}

fn align(secs: i64, tf: i64) -> i64 {
    secs - secs.rem_euclid(tf)
}
