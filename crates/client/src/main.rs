//! Night market daemon.
//!
//! Composition root: loads configuration from the environment, starts the
//! market runtime with file persistence, relays market events to the log,
//! and saves state on Ctrl-C.
//!
//! ```bash
//! MARKET_DATA_DIR=./market_data RUST_LOG=runtime=debug cargo run -p market-daemon
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use client_bootstrap::{BootstrapConfig, MarketBuilder};
use runtime::{Event, LifecycleEvent, MarketHandle, PurchaseEvent, Topic};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = BootstrapConfig::from_env();
    let _guard = setup_logging(&config.log_dir())?;

    tracing::info!("Starting night market");
    tracing::info!("Data directory: {}", config.data_dir.display());

    let setup = MarketBuilder::new(config)?.build().await?;
    let handle = setup.runtime.handle();

    let status = handle.status_text();
    tracing::info!(
        recovery = ?setup.runtime.recovery(),
        open = status.open,
        "{}",
        status.countdown
    );

    let relay = tokio::spawn(relay_events(handle));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    tracing::info!("Shutdown requested");

    relay.abort();
    setup.runtime.shutdown().await?;

    tracing::info!("Night market stopped");
    Ok(())
}

/// Logs every market event until the bus closes.
async fn relay_events(handle: MarketHandle) {
    let mut receivers =
        handle.subscribe_multiple(&[Topic::Lifecycle, Topic::Broadcast, Topic::Purchase]);
    let (Some(mut lifecycle), Some(mut broadcasts), Some(mut purchases)) = (
        receivers.remove(&Topic::Lifecycle),
        receivers.remove(&Topic::Broadcast),
        receivers.remove(&Topic::Purchase),
    ) else {
        return;
    };

    loop {
        let received = tokio::select! {
            event = lifecycle.recv() => event,
            event = broadcasts.recv() => event,
            event = purchases.recv() => event,
        };

        match received {
            Ok(event) => log_event(&handle, event),
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event relay lagged");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn log_event(handle: &MarketHandle, event: Event) {
    match event {
        Event::Lifecycle(LifecycleEvent::Opened(open)) => {
            tracing::info!(
                forced = open.forced,
                "Market opened; closes in {}",
                handle.formatted_time_remaining()
            );
        }
        Event::Lifecycle(LifecycleEvent::Closed(close)) => {
            tracing::info!(
                forced = close.forced,
                "Market closed; opens in {}",
                handle.formatted_time_remaining()
            );
        }
        Event::Broadcast(broadcast) => {
            for line in &broadcast.lines {
                tracing::info!(kind = %broadcast.kind, "[broadcast] {}", line);
            }
        }
        Event::Purchase(PurchaseEvent::Completed(purchase)) => {
            tracing::info!(
                visitor = %purchase.visitor,
                key = %purchase.key,
                price = purchase.price,
                payment = ?purchase.payment,
                "Purchase completed"
            );
            for command in &purchase.commands {
                tracing::info!(visitor = %purchase.visitor, "[command] {}", command);
            }
        }
    }
}

/// Logs to stderr and to `market.log` under `log_dir`.
///
/// The returned guard flushes the file writer when dropped.
fn setup_logging(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(log_dir, "market.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    tracing::info!("Log file: {}/market.log", log_dir.display());
    Ok(guard)
}
