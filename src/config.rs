//! Configuration types for pairscope

use serde::Deserialize;
use std::path::PathBuf;

use crate::live::AlertMode;
use crate::telemetry::LogFormat;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub feed: FeedConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub alert: AlertConfig,
    pub data: DataConfig,
    pub telemetry: TelemetryConfig,
}

/// Tick feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub exchange: String,
    /// Independent leg of the pair (regressor)
    pub symbol_x: String,
    /// Dependent leg of the pair (regressand)
    pub symbol_y: String,
}

/// In-memory tick store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Drop ticks older than this many minutes
    #[serde(default = "default_retention_minutes")]
    pub retention_minutes: u64,
}

fn default_retention_minutes() -> u64 {
    1440
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            retention_minutes: 1440,
        }
    }
}

impl StoreConfig {
    /// Retention horizon as a duration
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.retention_minutes as i64)
    }
}

/// Batch analysis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Bar width in seconds
    #[serde(default = "default_timeframe_secs")]
    pub timeframe_secs: u64,

    /// Rolling window width in bars for z-score and correlation
    #[serde(default = "default_z_window")]
    pub z_window: usize,

    /// How far back the batch pipeline looks for ticks, in minutes
    #[serde(default = "default_lookback_minutes")]
    pub lookback_minutes: u64,

    /// Minimum aligned points a hedge fit requires
    #[serde(default = "default_min_fit_points")]
    pub min_fit_points: usize,

    /// Significance level for the stationarity verdict
    #[serde(default = "default_significance")]
    pub significance: f64,

    /// Fixed ADF lag order; absent means automatic selection by AIC
    #[serde(default)]
    pub max_lag: Option<usize>,

    /// Seconds between periodic full analysis runs
    #[serde(default = "default_trigger_interval_secs")]
    pub trigger_interval_secs: u64,
}

fn default_timeframe_secs() -> u64 {
    60
}
fn default_z_window() -> usize {
    60
}
fn default_lookback_minutes() -> u64 {
    720
}
fn default_min_fit_points() -> usize {
    30
}
fn default_significance() -> f64 {
    0.05
}
fn default_trigger_interval_secs() -> u64 {
    300
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            timeframe_secs: 60,
            z_window: 60,
            lookback_minutes: 720,
            min_fit_points: 30,
            significance: 0.05,
            max_lag: None,
            trigger_interval_secs: 300,
        }
    }
}

impl AnalysisConfig {
    /// Bar width as a duration
    pub fn timeframe(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.timeframe_secs as i64)
    }

    /// Lookback horizon as a duration
    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.lookback_minutes as i64)
    }

    /// Interval between periodic batch runs
    pub fn trigger_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.trigger_interval_secs)
    }
}

/// Z-score alert configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    /// Breach threshold in standard deviations
    #[serde(default = "default_z_threshold")]
    pub z_threshold: f64,

    /// Which crossings count as a breach
    #[serde(default = "default_alert_mode")]
    pub mode: AlertMode,
}

fn default_z_threshold() -> f64 {
    2.0
}
fn default_alert_mode() -> AlertMode {
    AlertMode::Symmetric
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            z_threshold: 2.0,
            mode: AlertMode::Symmetric,
        }
    }
}

/// Data capture configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    pub capture_enabled: bool,
    pub output_dir: PathBuf,
    /// Seconds between Parquet file rotations
    #[serde(default = "default_rotation_interval_secs")]
    pub rotation_interval_secs: u64,
}

fn default_rotation_interval_secs() -> u64 {
    3600
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    pub metrics_port: u16,
    pub log_level: String,
    /// Log output format; "pretty" or "json"
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
