//! Binance WebSocket tick feed implementation

use super::{Tick, TickFeed};
use crate::ws::{WsClient, WsConfig, WsMessage};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::mpsc;

/// Binance WebSocket base URL
const BINANCE_WS_URL: &str = "wss://stream.binance.com:9443/ws";

/// Binance trade message structure
#[derive(Debug, Deserialize)]
struct BinanceTradeMessage {
    /// Event type
    #[serde(rename = "e")]
    event_type: String,
    /// Event time (milliseconds)
    #[serde(rename = "E")]
    #[allow(dead_code)]
    event_time: i64,
    /// Symbol
    #[serde(rename = "s")]
    symbol: String,
    /// Trade ID
    #[serde(rename = "t")]
    #[allow(dead_code)]
    trade_id: u64,
    /// Price
    #[serde(rename = "p")]
    price: String,
    /// Quantity
    #[serde(rename = "q")]
    quantity: String,
    /// Trade time (milliseconds)
    #[serde(rename = "T")]
    trade_time: i64,
}

/// Binance WebSocket feed for a single <symbol>@trade stream
pub struct BinanceFeed {
    symbol: String,
}

impl BinanceFeed {
    /// Create a new Binance feed for the given symbol
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into().to_lowercase(),
        }
    }

    /// Build the WebSocket URL for the trade stream
    fn build_ws_url(&self) -> String {
        format!("{}/{}@trade", BINANCE_WS_URL, self.symbol)
    }

    /// Parse a Binance trade message into a Tick
    fn parse_message(msg: &str) -> Option<Tick> {
        let trade: BinanceTradeMessage = serde_json::from_str(msg).ok()?;

        if trade.event_type != "trade" {
            return None;
        }

        let price = Decimal::from_str(&trade.price).ok()?;
        let size = Decimal::from_str(&trade.quantity).ok()?;
        let exchange_ts = Utc.timestamp_millis_opt(trade.trade_time).single()?;
        let timestamp = Utc::now();

        Some(Tick {
            symbol: trade.symbol,
            price,
            size,
            timestamp,
            exchange_ts,
        })
    }

    /// Run the message processing loop
    async fn run_message_loop(mut ws_rx: mpsc::Receiver<WsMessage>, tick_tx: mpsc::Sender<Tick>) {
        while let Some(msg) = ws_rx.recv().await {
            match msg {
                WsMessage::Text(text) => {
                    if let Some(tick) = Self::parse_message(&text) {
                        if tick_tx.send(tick).await.is_err() {
                            tracing::debug!("Tick receiver dropped, stopping feed");
                            break;
                        }
                    }
                }
                WsMessage::Connected => {
                    tracing::info!("Binance feed connected");
                }
                WsMessage::Disconnected => {
                    tracing::warn!("Binance feed disconnected");
                    break;
                }
                WsMessage::Reconnecting { attempt } => {
                    tracing::warn!(attempt, "Binance feed reconnecting...");
                }
                WsMessage::Binary(_) => {
                    // Binance doesn't send binary messages for trade streams
                }
            }
        }
    }
}

#[async_trait]
impl TickFeed for BinanceFeed {
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<Tick>> {
        let (tick_tx, tick_rx) = mpsc::channel(1024);
        let url = self.build_ws_url();

        tracing::info!(symbol = %self.symbol, "Subscribing to Binance feed");

        // Create WebSocket client with config
        let config = WsConfig::new(url)
            .max_reconnects(10)
            .initial_delay(Duration::from_secs(1))
            .max_delay(Duration::from_secs(60))
            .ping_interval(Duration::from_secs(30));

        let client = WsClient::new(config);
        let ws_rx = client.connect();

        // Spawn message processing task
        tokio::spawn(async move {
            Self::run_message_loop(ws_rx, tick_tx).await;
        });

        Ok(tick_rx)
    }
}
