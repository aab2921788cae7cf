//! Tick feed module
//!
//! Provides real-time trade ticks from Binance WebSocket

mod binance;
mod types;

pub use binance::BinanceFeed;
pub use types::Tick;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Trait for tick feed implementations
#[async_trait]
pub trait TickFeed: Send + Sync {
    /// Subscribe to trade ticks
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<Tick>>;
}
