use clap::Parser;
use pairscope::cli::{Cli, Commands};
use pairscope::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        toml::from_str(include_str!("../config.toml.example")).expect("Invalid default config")
    });

    // Initialize telemetry
    let _guard = pairscope::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            args.execute(&config).await?;
        }
        Commands::Capture(args) => {
            args.execute(&config).await?;
        }
        Commands::Analyze(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Feed: {} {} / {}",
                config.feed.exchange, config.feed.symbol_x, config.feed.symbol_y
            );
            println!(
                "  Bars: {}s, z-window {} bars, lookback {}m",
                config.analysis.timeframe_secs,
                config.analysis.z_window,
                config.analysis.lookback_minutes
            );
            println!(
                "  Refit: every {}s, min {} points, significance {}",
                config.analysis.trigger_interval_secs,
                config.analysis.min_fit_points,
                config.analysis.significance
            );
            println!(
                "  Alert: threshold {} ({:?})",
                config.alert.z_threshold, config.alert.mode
            );
            println!(
                "  Capture: enabled={} dir={:?}",
                config.data.capture_enabled, config.data.output_dir
            );
        }
    }

    Ok(())
}
