//! Data capture module
//!
//! Stores tick data to Parquet for offline analysis

mod parquet;
mod recorder;

pub use parquet::{ParquetReader, ParquetWriter, TickRecord};
pub use recorder::{RecorderConfig, TickRecorder};
