//! Anomaly Stream Processor - Main Entry Point

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;

use anomaly_stream::constants::{APP_NAME, APP_VERSION};
use anomaly_stream::{run_until_shutdown, ProcessorConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting {} v{}...", APP_NAME, APP_VERSION);

    let config = ProcessorConfig::from_env();
    config.validate().context("invalid configuration")?;

    log::info!(
        "Tailing {} -> events={}, anomalies={}",
        config.events_log.display(),
        config.lake_events_dir.display(),
        config.lake_anomalies_dir.display()
    );

    let shutdown = Arc::new(AtomicBool::new(false));

    let worker = {
        let shutdown = shutdown.clone();
        let config = config.clone();
        tokio::task::spawn_blocking(move || run_until_shutdown(&config, &shutdown))
    };
    tokio::pin!(worker);

    // The worker may also end on its own after a fatal write error
    let result = tokio::select! {
        res = &mut worker => res,
        _ = shutdown_signal() => {
            log::info!("Shutdown signal received, finishing current work...");
            shutdown.store(true, Ordering::SeqCst);
            (&mut worker).await
        }
    };

    let stats = result
        .context("processor task panicked")?
        .context("processor stopped with an error")?;

    log::info!("Bye: {}", stats);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
