//! Data recorder for tick capture

use super::parquet::{ParquetWriter, TickRecord};
use crate::feed::Tick;
use chrono::{Duration, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// Configuration for data recording
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Output directory for Parquet files
    pub output_dir: PathBuf,
    /// Rotation interval in seconds
    pub rotation_interval_secs: u64,
    /// Buffer size before flushing
    pub buffer_size: usize,
    /// Maximum time between flushes
    pub flush_interval_secs: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./data"),
            rotation_interval_secs: 3600, // 1 hour
            buffer_size: 1000,
            flush_interval_secs: 60,
        }
    }
}

/// Records trade ticks to Parquet files
pub struct TickRecorder {
    config: RecorderConfig,
    tick_tx: mpsc::Sender<Tick>,
    stats: Arc<RwLock<RecorderStats>>,
}

/// Recording statistics
#[derive(Debug, Default, Clone)]
pub struct RecorderStats {
    pub ticks_received: u64,
    pub ticks_written: u64,
    pub files_written: u64,
    pub last_flush: Option<chrono::DateTime<Utc>>,
}

impl TickRecorder {
    /// Create a new tick recorder
    pub fn new(config: RecorderConfig) -> Self {
        let (tick_tx, tick_rx) = mpsc::channel(10_000);
        let stats = Arc::new(RwLock::new(RecorderStats::default()));

        // Spawn tick writer
        let writer = ParquetWriter::new(config.output_dir.clone(), config.rotation_interval_secs);
        let writer_stats = stats.clone();
        let writer_config = config.clone();
        tokio::spawn(async move {
            Self::run_tick_writer(tick_rx, writer, writer_config, writer_stats).await;
        });

        Self {
            config,
            tick_tx,
            stats,
        }
    }

    /// Create a new recorder with default config
    pub fn with_output_dir(output_dir: PathBuf) -> Self {
        let config = RecorderConfig {
            output_dir,
            ..Default::default()
        };
        Self::new(config)
    }

    /// Run the tick writer task
    async fn run_tick_writer(
        mut rx: mpsc::Receiver<Tick>,
        mut writer: ParquetWriter,
        config: RecorderConfig,
        stats: Arc<RwLock<RecorderStats>>,
    ) {
        let mut buffer: Vec<TickRecord> = Vec::with_capacity(config.buffer_size);
        let mut last_flush = Utc::now();
        let flush_interval = Duration::seconds(config.flush_interval_secs as i64);

        loop {
            // Use timeout to ensure periodic flushing
            let timeout = tokio::time::Duration::from_secs(config.flush_interval_secs);

            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Some(tick) => {
                            {
                                let mut s = stats.write().await;
                                s.ticks_received += 1;
                            }

                            buffer.push(TickRecord {
                                timestamp: tick.timestamp,
                                symbol: tick.symbol,
                                price: tick.price,
                                size: tick.size,
                                exchange_ts: tick.exchange_ts,
                            });

                            // Flush if buffer is full
                            if buffer.len() >= config.buffer_size {
                                Self::flush_tick_buffer(&mut buffer, &mut writer, &stats).await;
                                last_flush = Utc::now();
                            }
                        }
                        None => {
                            // Channel closed, flush remaining and exit
                            if !buffer.is_empty() {
                                Self::flush_tick_buffer(&mut buffer, &mut writer, &stats).await;
                            }
                            tracing::info!("Tick writer shutting down");
                            break;
                        }
                    }
                }

                _ = tokio::time::sleep(timeout) => {
                    // Periodic flush
                    let now = Utc::now();
                    if now - last_flush >= flush_interval && !buffer.is_empty() {
                        Self::flush_tick_buffer(&mut buffer, &mut writer, &stats).await;
                        last_flush = now;
                    }
                }
            }
        }
    }

    /// Flush tick buffer to disk
    async fn flush_tick_buffer(
        buffer: &mut Vec<TickRecord>,
        writer: &mut ParquetWriter,
        stats: &Arc<RwLock<RecorderStats>>,
    ) {
        if buffer.is_empty() {
            return;
        }

        let now = Utc::now();

        // Check for rotation
        if writer.needs_rotation(now) {
            writer.mark_rotation(now);
        }

        let path = writer.file_path("ticks", now);
        let count = buffer.len();

        match writer.write_ticks(&path, buffer) {
            Ok(()) => {
                let mut s = stats.write().await;
                s.ticks_written += count as u64;
                s.files_written += 1;
                s.last_flush = Some(now);
                tracing::debug!(count, path = ?path, "Flushed ticks");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to write ticks");
            }
        }

        buffer.clear();
    }

    /// Record a trade tick
    pub async fn record_tick(&self, tick: Tick) -> anyhow::Result<()> {
        self.tick_tx
            .send(tick)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send tick: {}", e))?;
        Ok(())
    }

    /// Get output directory
    pub fn output_dir(&self) -> &PathBuf {
        &self.config.output_dir
    }

    /// Get current statistics
    pub async fn stats(&self) -> RecorderStats {
        self.stats.read().await.clone()
    }
}
