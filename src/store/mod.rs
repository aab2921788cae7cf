//! In-memory tick store
//!
//! Backing storage for the batch pipeline: per-symbol tick history behind a
//! single lock, queryable by time range, pruned by retention cutoff. Durable
//! capture is the data module's job, not this one's.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::feed::Tick;

/// Shared tick history for the live engine
pub struct TickStore {
    ticks: RwLock<HashMap<String, Vec<Tick>>>,
}

impl TickStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            ticks: RwLock::new(HashMap::new()),
        }
    }

    /// Append one tick in arrival order
    pub async fn append(&self, tick: Tick) {
        let mut ticks = self.ticks.write().await;
        ticks.entry(tick.symbol.clone()).or_default().push(tick);
    }

    /// Ticks for a symbol with exchange timestamps in [from, to], sorted.
    ///
    /// The sort is stable, so ticks sharing a timestamp keep arrival order
    /// and repeated queries over the same data return the same sequence.
    pub async fn query(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<Tick> {
        let ticks = self.ticks.read().await;
        let mut out: Vec<Tick> = match ticks.get(symbol) {
            Some(history) => history
                .iter()
                .filter(|t| t.exchange_ts >= from && t.exchange_ts <= to)
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        out.sort_by_key(|t| t.exchange_ts);
        out
    }

    /// Drop ticks with exchange timestamps before the cutoff; returns the count dropped
    pub async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut ticks = self.ticks.write().await;
        let mut dropped = 0;
        for history in ticks.values_mut() {
            let before = history.len();
            history.retain(|t| t.exchange_ts >= cutoff);
            dropped += before - history.len();
        }
        if dropped > 0 {
            debug!(dropped, "pruned tick store");
        }
        dropped
    }

    /// Number of stored ticks for a symbol
    pub async fn len(&self, symbol: &str) -> usize {
        self.ticks
            .read()
            .await
            .get(symbol)
            .map(|h| h.len())
            .unwrap_or(0)
    }
}

impl Default for TickStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn create_test_tick(symbol: &str, price: Decimal, secs: i64) -> Tick {
        Tick {
            symbol: symbol.to_string(),
            price,
            size: dec!(1),
            timestamp: at(secs),
            exchange_ts: at(secs),
        }
    }

    #[tokio::test]
    async fn test_append_and_query() {
        let store = TickStore::new();
        store.append(create_test_tick("BTCUSDT", dec!(100), 10)).await;
        store.append(create_test_tick("BTCUSDT", dec!(101), 20)).await;
        store.append(create_test_tick("ETHUSDT", dec!(50), 15)).await;

        let btc = store.query("BTCUSDT", at(0), at(30)).await;
        assert_eq!(btc.len(), 2);
        assert_eq!(btc[0].price, dec!(100));
        assert_eq!(store.len("ETHUSDT").await, 1);
    }

    #[tokio::test]
    async fn test_query_respects_range_bounds() {
        let store = TickStore::new();
        for secs in [10, 20, 30, 40] {
            store
                .append(create_test_tick("BTCUSDT", dec!(100), secs))
                .await;
        }
        let out = store.query("BTCUSDT", at(20), at(30)).await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].exchange_ts, at(20));
        assert_eq!(out[1].exchange_ts, at(30));
    }

    #[tokio::test]
    async fn test_query_unknown_symbol_is_empty() {
        let store = TickStore::new();
        assert!(store.query("SOLUSDT", at(0), at(100)).await.is_empty());
        assert_eq!(store.len("SOLUSDT").await, 0);
    }

    #[tokio::test]
    async fn test_query_sorts_out_of_order_appends() {
        let store = TickStore::new();
        store.append(create_test_tick("BTCUSDT", dec!(102), 30)).await;
        store.append(create_test_tick("BTCUSDT", dec!(100), 10)).await;
        store.append(create_test_tick("BTCUSDT", dec!(101), 20)).await;

        let out = store.query("BTCUSDT", at(0), at(60)).await;
        assert_eq!(out[0].price, dec!(100));
        assert_eq!(out[1].price, dec!(101));
        assert_eq!(out[2].price, dec!(102));
    }

    #[tokio::test]
    async fn test_prune_drops_only_old_ticks() {
        let store = TickStore::new();
        store.append(create_test_tick("BTCUSDT", dec!(100), 10)).await;
        store.append(create_test_tick("BTCUSDT", dec!(101), 50)).await;
        store.append(create_test_tick("ETHUSDT", dec!(51), 5)).await;

        let dropped = store.prune_older_than(at(20)).await;
        assert_eq!(dropped, 2);
        assert_eq!(store.len("BTCUSDT").await, 1);
        assert_eq!(store.len("ETHUSDT").await, 0);

        let remaining = store.query("BTCUSDT", at(0), at(100)).await;
        assert_eq!(remaining[0].exchange_ts, at(50));
    }
}
