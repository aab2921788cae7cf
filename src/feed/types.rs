//! Tick feed types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single trade tick from an exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Trading symbol (e.g., "BTCUSDT")
    pub symbol: String,
    /// Trade price
    pub price: Decimal,
    /// Traded quantity
    pub size: Decimal,
    /// Local timestamp when tick was received
    pub timestamp: DateTime<Utc>,
    /// Exchange trade timestamp; authoritative for bucketing
    pub exchange_ts: DateTime<Utc>,
}
