//! Seatwatch CLI
//!
//! Command-line interface for the course seat availability monitor.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use seatwatch::args::parse_startup_args;
use seatwatch::{load_config, Config};
use tracing::Level;

#[derive(Parser)]
#[command(name = "seatwatch")]
#[command(about = "Polls course seat availability and alerts when seats open")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Poll period, e.g. "200s 500ms" (overrides config file)
    #[arg(long, value_parser = humantime::parse_duration)]
    poll_period: Option<Duration>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,

    /// Course term followed by the classes to monitor (overrides config file)
    #[arg(value_name = "TERM COURSE")]
    targets: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, poll_period={:?}, targets={:?}, log_level={:?}",
        args.config,
        args.poll_period,
        args.targets,
        args.log_level
    );

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    if !args.targets.is_empty() || config.courses.is_empty() {
        let startup = parse_startup_args(&args.targets)?;
        config.term = startup.term;
        config.courses = startup.courses;
    }

    if let Some(poll_period) = args.poll_period {
        config.poll_period = poll_period;
    }

    config.resolve_secrets()?;

    tracing::info!("Starting seatwatch service");
    tracing::debug!(
        "Term: {}, Courses: {:?}, Alert sinks: {}",
        config.term,
        config.courses,
        config.alerts.len()
    );

    seatwatch::run(config).await?;

    Ok(())
}
