//! Report export
//!
//! Serializable views of the latest analysis. Rows carry the spread series
//! with undefined values as nulls; the document wraps them with model and
//! verdict metadata. File encoding is the caller's job.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analytics::{AnalysisReport, StationarityVerdict};

/// One row of the exported spread series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    /// Aligned bucket start
    pub timestamp: DateTime<Utc>,
    /// Residual spread
    pub spread: f64,
    /// Rolling z-score; null while undefined
    pub z_score: Option<f64>,
    /// Rolling price correlation; null while undefined
    pub correlation: Option<f64>,
}

/// Complete export payload for one analysis run
#[derive(Debug, Clone, Serialize)]
pub struct ExportDocument {
    /// Independent leg
    pub symbol_x: String,
    /// Dependent leg
    pub symbol_y: String,
    /// Bar width in seconds
    pub timeframe_secs: i64,
    /// Rolling window width in bars
    pub z_window: usize,
    /// Fitted hedge ratio
    pub hedge_ratio: f64,
    /// Fitted intercept
    pub alpha: f64,
    /// Fit quality
    pub r_squared: f64,
    /// Points the fit used
    pub fit_points: usize,
    /// Stationarity verdict on the spread
    pub verdict: StationarityVerdict,
    /// Report generation time
    pub generated_at: DateTime<Utc>,
    /// Spread series rows
    pub rows: Vec<ExportRow>,
}

/// Tabular rows from a report, one per spread point
pub fn rows_from_report(report: &AnalysisReport) -> Vec<ExportRow> {
    report
        .points
        .iter()
        .map(|p| ExportRow {
            timestamp: p.timestamp,
            spread: p.spread,
            z_score: p.z_score,
            correlation: p.correlation,
        })
        .collect()
}

impl ExportDocument {
    /// Build the full payload from a report
    pub fn from_report(report: &AnalysisReport) -> Self {
        Self {
            symbol_x: report.symbol_x.clone(),
            symbol_y: report.symbol_y.clone(),
            timeframe_secs: report.timeframe_secs,
            z_window: report.z_window,
            hedge_ratio: report.model.beta,
            alpha: report.model.alpha,
            r_squared: report.model.r_squared,
            fit_points: report.model.n_points,
            verdict: report.verdict.clone(),
            generated_at: report.generated_at,
            rows: rows_from_report(report),
        }
    }
}
