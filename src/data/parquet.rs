//! Parquet file writer with rotation

use arrow::array::{ArrayRef, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Duration, Utc};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rust_decimal::Decimal;
use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Arc;

/// Trade tick schema fields
pub fn tick_schema() -> Schema {
    Schema::new(vec![
        Field::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
        Field::new("symbol", DataType::Utf8, false),
        Field::new("price", DataType::Utf8, false), // Store as string for Decimal precision
        Field::new("size", DataType::Utf8, false),
        Field::new(
            "exchange_ts",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
    ])
}

/// Parquet file writer with time-based rotation
pub struct ParquetWriter {
    output_dir: PathBuf,
    rotation_interval: Duration,
    current_file_start: Option<DateTime<Utc>>,
}

impl ParquetWriter {
    /// Create a new Parquet writer
    pub fn new(output_dir: PathBuf, rotation_interval_secs: u64) -> Self {
        Self {
            output_dir,
            rotation_interval: Duration::seconds(rotation_interval_secs as i64),
            current_file_start: None,
        }
    }

    /// Ensure output directory exists
    pub fn ensure_dir(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// Check if rotation is needed based on current time
    pub fn needs_rotation(&self, now: DateTime<Utc>) -> bool {
        match self.current_file_start {
            None => true,
            Some(start) => now - start >= self.rotation_interval,
        }
    }

    /// Generate file path for a given timestamp and prefix
    pub fn file_path(&self, prefix: &str, timestamp: DateTime<Utc>) -> PathBuf {
        let filename = format!("{}_{}.parquet", prefix, timestamp.format("%Y%m%d_%H%M%S"));
        self.output_dir.join(filename)
    }

    /// Update rotation timestamp
    pub fn mark_rotation(&mut self, timestamp: DateTime<Utc>) {
        self.current_file_start = Some(timestamp);
    }

    /// Write trade ticks to a Parquet file
    pub fn write_ticks(&self, path: &PathBuf, ticks: &[TickRecord]) -> anyhow::Result<()> {
        if ticks.is_empty() {
            return Ok(());
        }

        self.ensure_dir()?;

        let schema = Arc::new(tick_schema());
        let file = File::create(path)?;

        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        // Build arrays
        let timestamps: Vec<i64> = ticks
            .iter()
            .map(|t| t.timestamp.timestamp_micros())
            .collect();
        let symbols: Vec<&str> = ticks.iter().map(|t| t.symbol.as_str()).collect();
        let prices: Vec<String> = ticks.iter().map(|t| t.price.to_string()).collect();
        let sizes: Vec<String> = ticks.iter().map(|t| t.size.to_string()).collect();
        let exchange_ts: Vec<i64> = ticks
            .iter()
            .map(|t| t.exchange_ts.timestamp_micros())
            .collect();

        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(TimestampMicrosecondArray::from(timestamps).with_timezone("UTC"))
                    as ArrayRef,
                Arc::new(StringArray::from(symbols)) as ArrayRef,
                Arc::new(StringArray::from(
                    prices.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
                )) as ArrayRef,
                Arc::new(StringArray::from(
                    sizes.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
                )) as ArrayRef,
                Arc::new(TimestampMicrosecondArray::from(exchange_ts).with_timezone("UTC"))
                    as ArrayRef,
            ],
        )?;

        writer.write(&batch)?;
        writer.close()?;

        tracing::debug!(path = ?path, count = ticks.len(), "Wrote ticks to Parquet");

        Ok(())
    }
}

/// Record type for trade ticks (for writing)
#[derive(Debug, Clone)]
pub struct TickRecord {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub price: Decimal,
    pub size: Decimal,
    pub exchange_ts: DateTime<Utc>,
}

/// Reader for Parquet files
pub struct ParquetReader {
    path: PathBuf,
}

impl ParquetReader {
    /// Create a new reader for a Parquet file
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Read trade ticks from a Parquet file
    pub fn read_ticks(&self) -> anyhow::Result<Vec<TickRecord>> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
        use std::str::FromStr;

        let file = File::open(&self.path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let reader = builder.build()?;

        let mut ticks = Vec::new();

        for batch_result in reader {
            let batch = batch_result?;

            let timestamps = batch
                .column(0)
                .as_any()
                .downcast_ref::<TimestampMicrosecondArray>()
                .ok_or_else(|| anyhow::anyhow!("Invalid timestamp column"))?;

            let symbols = batch
                .column(1)
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| anyhow::anyhow!("Invalid symbol column"))?;

            let prices = batch
                .column(2)
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| anyhow::anyhow!("Invalid price column"))?;

            let sizes = batch
                .column(3)
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| anyhow::anyhow!("Invalid size column"))?;

            let exchange_timestamps = batch
                .column(4)
                .as_any()
                .downcast_ref::<TimestampMicrosecondArray>()
                .ok_or_else(|| anyhow::anyhow!("Invalid exchange_ts column"))?;

            for i in 0..batch.num_rows() {
                let timestamp = DateTime::from_timestamp_micros(timestamps.value(i))
                    .ok_or_else(|| anyhow::anyhow!("Invalid timestamp"))?;
                let exchange_ts = DateTime::from_timestamp_micros(exchange_timestamps.value(i))
                    .ok_or_else(|| anyhow::anyhow!("Invalid exchange_ts"))?;

                ticks.push(TickRecord {
                    timestamp,
                    symbol: symbols.value(i).to_string(),
                    price: Decimal::from_str(prices.value(i))?,
                    size: Decimal::from_str(sizes.value(i))?,
                    exchange_ts,
                });
            }
        }

        Ok(ticks)
    }

    /// Get the file path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}
