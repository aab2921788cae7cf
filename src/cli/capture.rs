//! Capture command implementation

use crate::config::Config;
use crate::data::{RecorderConfig, TickRecorder};
use crate::feed::{BinanceFeed, TickFeed};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct CaptureArgs {
    /// Output directory for captured data (overrides config)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl CaptureArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let output_dir = self
            .output
            .clone()
            .unwrap_or_else(|| config.data.output_dir.clone());

        tracing::info!(
            symbol_x = %config.feed.symbol_x,
            symbol_y = %config.feed.symbol_y,
            output = ?output_dir,
            "Starting data capture"
        );

        let recorder = TickRecorder::new(RecorderConfig {
            output_dir,
            rotation_interval_secs: config.data.rotation_interval_secs,
            ..Default::default()
        });

        let mut rx_x = BinanceFeed::new(&config.feed.symbol_x).subscribe().await?;
        let mut rx_y = BinanceFeed::new(&config.feed.symbol_y).subscribe().await?;

        loop {
            tokio::select! {
                maybe = rx_x.recv() => match maybe {
                    Some(tick) => {
                        if let Err(e) = recorder.record_tick(tick).await {
                            tracing::warn!(error = %e, "Failed to record tick");
                        }
                    }
                    None => {
                        tracing::error!(symbol = %config.feed.symbol_x, "Feed closed, stopping capture");
                        break;
                    }
                },
                maybe = rx_y.recv() => match maybe {
                    Some(tick) => {
                        if let Err(e) = recorder.record_tick(tick).await {
                            tracing::warn!(error = %e, "Failed to record tick");
                        }
                    }
                    None => {
                        tracing::error!(symbol = %config.feed.symbol_y, "Feed closed, stopping capture");
                        break;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received shutdown signal");
                    break;
                }
            }
        }

        let stats = recorder.stats().await;
        tracing::info!(
            ticks_received = stats.ticks_received,
            ticks_written = stats.ticks_written,
            files_written = stats.files_written,
            "Capture finished"
        );

        Ok(())
    }
}
