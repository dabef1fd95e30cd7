//! Ballistic simulation driver
//!
//! Runs the simulation core headless over a scripted scenario:
//! - A wandering target predicted by the simulation cache
//! - A shooter aiming thrown projectiles with the ballistic solver
//! - Two features competing for the shooter's rotation
//!
//! One JSON snapshot per emitted tick is written to stdout.

use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ballistic_core::config::{Config, LogFormat};
use ballistic_core::game::GameSession;
use ballistic_core::rotation::{session as rotation_session, Rotation};
use ballistic_core::util::time::{init_start_time, uptime_millis};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level, config.log_format);

    init_start_time();

    let params = config.simulation_params()?;
    info!(
        tick_rate = config.tick_rate,
        run_ticks = ?config.run_ticks,
        seed = config.scenario_seed,
        params_file = ?config.params_file,
        "Starting ballistic simulation driver"
    );

    rotation_session::start_session(params.scheduler, Rotation::ZERO);

    let session = GameSession::new(config.scenario_seed, &params, config.snapshot_interval);
    let (snapshot_tx, mut snapshot_rx) = mpsc::channel(64);

    let printer = tokio::spawn(async move {
        while let Some(snapshot) = snapshot_rx.recv().await {
            match serde_json::to_string(&snapshot) {
                Ok(line) => println!("{line}"),
                Err(err) => warn!(error = %err, "Failed to encode snapshot"),
            }
        }
    });

    let summary = session
        .run(config.tick_rate, config.run_ticks, snapshot_tx, shutdown_signal())
        .await;
    printer.await?;

    rotation_session::end_session();

    info!(
        ticks = summary.ticks,
        throws = summary.throws,
        hits = summary.hits,
        uptime_ms = uptime_millis(),
        "Driver shutdown complete"
    );
    Ok(())
}

/// Initialize tracing/logging. Logs go to stderr; stdout carries snapshots.
fn init_tracing(log_level: &str, format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
