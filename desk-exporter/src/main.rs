//! Jarvis Desk Exporter
//!
//! Reads the bus between a Jarvis desk controller and its handset over a
//! serial port and serves the desk's height and last preset, plus decoder
//! error counters, as Prometheus metrics.

mod config;
mod http;
mod link;
mod metrics;
mod reader;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use desk_protocol::CancelToken;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Cli, ExporterConfig};
use crate::metrics::DeskMetrics;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "desk_exporter=info,desk_protocol=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ExporterConfig::from(Cli::parse());

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ExporterConfig) -> Result<()> {
    let metrics = Arc::new(DeskMetrics::new(&config.namespace));
    let cancel = CancelToken::new();

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("listen: {}", config.listen_addr))?;
    info!("Starting server at {}", config.listen_addr);

    let mut server = tokio::spawn(http::serve(listener, Arc::clone(&metrics)));

    let mut reader = tokio::task::spawn_blocking({
        let metrics = Arc::clone(&metrics);
        let cancel = cancel.clone();
        let source = config.source.clone();
        move || reader::run_source(&source, &metrics, &cancel)
    });

    let result = tokio::select! {
        joined = &mut reader => joined.context("reader thread panicked")?,
        served = &mut server => {
            cancel.cancel();
            match served {
                Ok(Err(e)) => Err(e).context("server terminated"),
                Ok(Ok(())) => Ok(()),
                Err(e) => Err(e).context("server task panicked"),
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("listen for shutdown signal")?;
            info!("Shutting down");
            cancel.cancel();
            (&mut reader).await.context("reader thread panicked")?
        }
    };

    server.abort();
    if result.is_ok() {
        info!("Stopped");
    } else {
        warn!("Stopping after error");
    }

    result
}
