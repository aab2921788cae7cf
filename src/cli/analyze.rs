//! Analyze command implementation
//!
//! Runs the full batch pipeline over captured Parquet files.

use crate::analytics::AnalysisReport;
use crate::config::Config;
use crate::data::ParquetReader;
use crate::engine::{AnalysisEngine, AnalysisRequest};
use crate::export::ExportDocument;
use crate::feed::Tick;
use crate::live::LiveStatsCache;
use crate::store::TickStore;
use chrono::{DateTime, Utc};
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Directory containing captured Parquet files
    #[arg(long, default_value = "./data")]
    pub data_dir: PathBuf,

    /// Output format: table or json
    #[arg(long, default_value = "table")]
    pub format: String,

    /// Write the full analysis document as JSON to this path
    #[arg(long)]
    pub export: Option<PathBuf>,
}

impl AnalyzeArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let files = collect_parquet_files(&self.data_dir)?;
        if files.is_empty() {
            anyhow::bail!("No Parquet files found in {:?}", self.data_dir);
        }

        let store = Arc::new(TickStore::new());
        let mut earliest: Option<DateTime<Utc>> = None;
        let mut latest: Option<DateTime<Utc>> = None;
        let mut loaded = 0usize;
        let mut skipped = 0usize;

        for path in &files {
            let records = ParquetReader::new(path.clone()).read_ticks()?;
            for record in records {
                if record.symbol != config.feed.symbol_x && record.symbol != config.feed.symbol_y {
                    skipped += 1;
                    continue;
                }
                earliest = Some(earliest.map_or(record.exchange_ts, |e| e.min(record.exchange_ts)));
                latest = Some(latest.map_or(record.exchange_ts, |l| l.max(record.exchange_ts)));
                store
                    .append(Tick {
                        symbol: record.symbol,
                        price: record.price,
                        size: record.size,
                        timestamp: record.timestamp,
                        exchange_ts: record.exchange_ts,
                    })
                    .await;
                loaded += 1;
            }
        }

        tracing::info!(files = files.len(), loaded, skipped, "Loaded captured ticks");

        let (earliest, latest) = match (earliest, latest) {
            (Some(e), Some(l)) => (e, l),
            _ => anyhow::bail!(
                "No ticks for {} / {} in {:?}",
                config.feed.symbol_x,
                config.feed.symbol_y,
                self.data_dir
            ),
        };

        let engine = AnalysisEngine::new(
            store,
            Arc::new(LiveStatsCache::new()),
            &config.feed,
            config.analysis.clone(),
            config.alert.clone(),
        );

        // Cutoff past the last tick so every bucket counts as closed
        let timeframe = config.analysis.timeframe();
        let as_of = latest + timeframe;
        let mut request = AnalysisRequest::from_config(&config.feed, &config.analysis);
        request.as_of = Some(as_of);
        request.lookback = as_of - earliest + timeframe;

        let report = engine.run_full_analysis(request).await?;
        let document = ExportDocument::from_report(&report);

        match self.format.as_str() {
            "json" => println!("{}", serde_json::to_string_pretty(&document)?),
            _ => println!("{}", format_report(&report)),
        }

        if let Some(path) = &self.export {
            std::fs::write(path, serde_json::to_string_pretty(&document)?)?;
            tracing::info!(path = ?path, rows = document.rows.len(), "Wrote analysis export");
        }

        Ok(())
    }
}

/// List Parquet files in a directory, sorted by name
fn collect_parquet_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext == "parquet")
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Format a report as a table for CLI output
fn format_report(report: &AnalysisReport) -> String {
    let last = report.points.last();
    let latest_spread = last
        .map(|p| format!("{:+.6}", p.spread))
        .unwrap_or_else(|| "n/a".to_string());
    let latest_z = last
        .and_then(|p| p.z_score)
        .map(|z| format!("{:+.2}", z))
        .unwrap_or_else(|| "n/a".to_string());
    let latest_corr = last
        .and_then(|p| p.correlation)
        .map(|c| format!("{:+.3}", c))
        .unwrap_or_else(|| "n/a".to_string());
    let verdict = &report.verdict;

    format!(
        r#"
══════════════════════════════════════════════════════
                    PAIR ANALYSIS
══════════════════════════════════════════════════════

HEDGE MODEL
───────────────────────────────────────────────────────
Pair:             {} ~ {}
Bars:             {} @ {}s
Alpha:            {:+.6}
Beta:             {:+.6}
R-squared:        {:.4}

SPREAD
───────────────────────────────────────────────────────
Latest Spread:    {}
Latest Z-score:   {}
Correlation:      {}
Rolling Window:   {} bars

STATIONARITY (ADF)
───────────────────────────────────────────────────────
Test Statistic:   {:.4}
P-value:          {:.4}
Lag Order:        {}
Observations:     {}
Stationary:       {}
══════════════════════════════════════════════════════
"#,
        report.symbol_y,
        report.symbol_x,
        report.points.len(),
        report.timeframe_secs,
        report.model.alpha,
        report.model.beta,
        report.model.r_squared,
        latest_spread,
        latest_z,
        latest_corr,
        report.z_window,
        verdict.statistic,
        verdict.p_value,
        verdict.lag_used,
        verdict.n_obs,
        if verdict.is_stationary { "yes" } else { "no" },
    )
}
