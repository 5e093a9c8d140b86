#![doc = include_str!("../README.md")]

mod cli;

use anyhow::Context;
use chunkflow::CancellationToken;
use clap::Parser;
use cli::config::{CliArgs, Command, OrderConfig};
use cli::input::read_ids;
use cli::order::run_order;
use cli::telemetry::init_telemetry;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    init_telemetry(args.log_json)?;

    match args.command {
        Command::Order(order_args) => {
            let config = OrderConfig::try_from(order_args)?;
            log_startup_info(&config);

            let ids = if config.ids.is_empty() {
                read_ids(tokio::io::stdin())
                    .await
                    .context("failed to read acquisition ids from stdin")?
            } else {
                config.ids.clone()
            };

            let cancel = CancellationToken::new();
            let watcher = tokio::spawn(cancel_on_signal(cancel.clone()));
            let result = run_order(&config, ids, cancel, &mut std::io::stdout()).await;
            watcher.abort();
            result.map(|_| ())
        }
    }
}

fn log_startup_info(_config: &OrderConfig) {
    if cfg!(debug_assertions) {
        #[cfg(feature = "tracing")]
        tracing::debug!("Starting order run with full config: {:#?}", _config);
    } else {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Starting order run against {} with {} concurrent requests",
            _config.base_url,
            _config.batch.concurrency
        );
    }
}

/// Cancels `cancel` on Ctrl+C or SIGTERM. Chunks already talking to GBDX
/// finish; queued ones are dropped and the run reports cancellation.
async fn cancel_on_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Failed to install SIGTERM handler: {_e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(_e) = signal::ctrl_c().await {
            #[cfg(feature = "tracing")]
            tracing::warn!("Failed to install Ctrl+C handler: {_e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received SIGTERM signal");
        },
    }

    #[cfg(feature = "tracing")]
    tracing::info!("Cancelling orders that have not been sent yet");
    cancel.cancel();
}
