//! Run command implementation

use crate::config::Config;
use crate::data::{RecorderConfig, TickRecorder};
use crate::engine::{AnalysisEngine, AnalysisRequest};
use crate::feed::{BinanceFeed, Tick, TickFeed};
use crate::live::LiveStatsCache;
use crate::store::TickStore;
use clap::Args;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Override the independent leg from config
    #[arg(long)]
    pub symbol_x: Option<String>,

    /// Override the dependent leg from config
    #[arg(long)]
    pub symbol_y: Option<String>,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut config = config.clone();
        if let Some(x) = &self.symbol_x {
            config.feed.symbol_x = x.clone();
        }
        if let Some(y) = &self.symbol_y {
            config.feed.symbol_y = y.clone();
        }

        tracing::info!(
            symbol_x = %config.feed.symbol_x,
            symbol_y = %config.feed.symbol_y,
            "Starting live pair analysis"
        );

        let store = Arc::new(TickStore::new());
        let cache = Arc::new(LiveStatsCache::new());
        let engine = AnalysisEngine::new(
            store.clone(),
            cache,
            &config.feed,
            config.analysis.clone(),
            config.alert.clone(),
        );

        let recorder = if config.data.capture_enabled {
            Some(TickRecorder::new(RecorderConfig {
                output_dir: config.data.output_dir.clone(),
                rotation_interval_secs: config.data.rotation_interval_secs,
                ..Default::default()
            }))
        } else {
            None
        };

        let mut rx_x = BinanceFeed::new(&config.feed.symbol_x).subscribe().await?;
        let mut rx_y = BinanceFeed::new(&config.feed.symbol_y).subscribe().await?;

        // First fire after one full interval, not at startup
        let trigger = config.analysis.trigger_interval();
        let mut analysis_timer =
            tokio::time::interval_at(tokio::time::Instant::now() + trigger, trigger);
        analysis_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let prune_every = std::time::Duration::from_secs(60);
        let mut prune_timer =
            tokio::time::interval_at(tokio::time::Instant::now() + prune_every, prune_every);
        prune_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let retention = config.store.retention();
        let mut was_breached = false;

        loop {
            tokio::select! {
                maybe = rx_x.recv() => match maybe {
                    Some(tick) => {
                        Self::handle_tick(&engine, recorder.as_ref(), &mut was_breached, tick).await;
                    }
                    None => {
                        tracing::error!(symbol = %config.feed.symbol_x, "Feed closed, shutting down");
                        break;
                    }
                },
                maybe = rx_y.recv() => match maybe {
                    Some(tick) => {
                        Self::handle_tick(&engine, recorder.as_ref(), &mut was_breached, tick).await;
                    }
                    None => {
                        tracing::error!(symbol = %config.feed.symbol_y, "Feed closed, shutting down");
                        break;
                    }
                },
                _ = analysis_timer.tick() => {
                    let request = AnalysisRequest::from_config(&config.feed, &config.analysis);
                    if let Err(e) = engine.run_full_analysis(request).await {
                        tracing::info!(error = %e, "Analysis run skipped");
                    }
                }
                _ = prune_timer.tick() => {
                    let cutoff = chrono::Utc::now() - retention;
                    let dropped = store.prune_older_than(cutoff).await;
                    if dropped > 0 {
                        tracing::debug!(dropped, "Pruned old ticks");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received shutdown signal");
                    break;
                }
            }
        }

        if let Some(recorder) = &recorder {
            let stats = recorder.stats().await;
            tracing::info!(
                ticks_received = stats.ticks_received,
                ticks_written = stats.ticks_written,
                files_written = stats.files_written,
                "Capture statistics"
            );
        }

        Ok(())
    }

    /// Record, ingest, and evaluate alerts for one tick
    async fn handle_tick(
        engine: &AnalysisEngine,
        recorder: Option<&TickRecorder>,
        was_breached: &mut bool,
        tick: Tick,
    ) {
        if let Some(recorder) = recorder {
            if let Err(e) = recorder.record_tick(tick.clone()).await {
                tracing::warn!(error = %e, "Failed to record tick");
            }
        }

        match engine.ingest_tick(tick).await {
            Ok(Some(_)) => match engine.alert_state(None).await {
                Ok(alert) => {
                    if alert.breached && !*was_breached {
                        tracing::warn!(
                            z_score = ?alert.z_score_at_breach,
                            threshold = alert.threshold,
                            direction = ?alert.direction,
                            "Z-score threshold breached"
                        );
                    } else if !alert.breached && *was_breached {
                        tracing::info!("Z-score back inside threshold");
                    }
                    *was_breached = alert.breached;
                }
                Err(e) => tracing::debug!(error = %e, "Alert evaluation unavailable"),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Tick ingest failed"),
        }
    }
}
