//! Fleet Autoscaler
//!
//! Threshold-driven autoscaler for a monitored service fleet.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                       Fleet Autoscaler                          │
//! ├────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐      │
//! │  │    Metric    │───▶│    Policy    │───▶│   Scaling    │      │
//! │  │    Source    │    │   (Brain)    │    │   Backend    │      │
//! │  │    (Eyes)    │    │              │    │   (Hands)    │      │
//! │  └──────────────┘    └──────────────┘    └──────────────┘      │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fleetscaler::adapters::{HttpMetricSource, HttpScalingBackend};
use fleetscaler::config::{Config, LoggingConfig};
use fleetscaler::controller::ControlLoop;
use fleetscaler::error::Result;
use fleetscaler::policy::ScaleLimits;
use fleetscaler::probe;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Fleet Autoscaler - threshold-driven scaling for a monitored service fleet
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(long, env = "AUTOSCALER_CONFIG")]
    config: PathBuf,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match Config::from_path(&args.config) {
        Ok(config) => config,
        Err(e) => {
            // Logging is configured from the file, so startup failures go to
            // stderr directly.
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    init_logging(&args, &config.logging);

    info!("Starting fleet autoscaler");
    info!("  Base URL: {}", config.base_url);
    info!(
        "  Thresholds: scale up >= {}, scale down <= {}",
        config.scale_up_threshold, config.scale_down_threshold
    );
    info!(
        "  Fleet bounds: {}..={}",
        config.min_instances, config.max_instances
    );
    info!("  Poll interval: {:?}", config.poll_interval());
    info!("  Probe port: {}", config.probe_port);

    let source = Arc::new(HttpMetricSource::new(&config)?);
    let backend = Arc::new(HttpScalingBackend::new(&config)?);
    let shutdown = CancellationToken::new();

    let control_loop = ControlLoop::new(
        source,
        backend,
        ScaleLimits::from(&config),
        config.poll_interval(),
        shutdown.clone(),
    );
    let status = control_loop.status_handle();

    // Probe server serves health checks for the whole process lifetime, even
    // while the monitored service is unreachable.
    let probe_port = config.probe_port;
    tokio::spawn(async move {
        if let Err(e) = probe::run_probe_server(probe_port, status).await {
            error!("Probe server error: {}", e);
        }
    });

    let shutdown_handle = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Autoscaler stopped by user input");
            shutdown_handle.cancel();
        }
    });

    control_loop.run().await?;

    info!("Autoscaler shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args, logging: &LoggingConfig) {
    let level_name = args.log_level.as_deref().unwrap_or(&logging.level);
    let level = match level_name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("reqwest=warn".parse().unwrap());

    if args.log_json || logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
