use std::error::Error;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use transit_tracker::adapters::outbound::{init_buffered_logger, init_combined_logger, init_console_logger};
use transit_tracker::application::TrackingService;
use transit_tracker::domains::DynLogger;
use transit_tracker::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // `set_global_default` leaves the `log` facade free for fast_log.
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting transit tracker");

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("transit.toml"));
    let config = Config::load(Some(&config_path))?;
    info!("Configuration loaded from {}", config_path.display());
    info!(
        "Tick {} ms, smoothing {} samples / {} ms",
        config.simulation.tick_interval_ms, config.simulation.smoothing_window, config.simulation.smoothing_horizon_ms
    );

    let bridge = match &config.logging.file {
        Some(path) => init_combined_logger(path),
        None => init_console_logger(),
    };
    let logger: DynLogger = init_buffered_logger(bridge, config.logging.buffer_capacity);

    let service = TrackingService::bootstrap(config, logger).await?;
    service
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("Shutting down transit tracker");
    Ok(())
}
