//! Machine server binary.
//!
//! ## Startup Sequence
//!
//! 1. Parse configuration (flags or environment).
//! 2. Build the machine store and the service.
//! 3. Bind the RPC listener and serve until Ctrl-C / SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fleet_server::MachineMapService;
use fleet_sim::{MachineStore, SimConfig};

#[derive(Parser)]
#[command(name = "machine_server", about = "Simulated machine fleet over a streaming RPC")]
struct Args {
    /// Address the RPC listener binds to
    #[arg(short, long, env = "MACHINE_RPC_LISTEN", default_value = "0.0.0.0:50051")]
    listen: String,

    /// Simulation tick interval in milliseconds
    #[arg(short, long, env = "MACHINE_TICK_MS", default_value_t = 1000)]
    tick_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("fleet_server=info".parse()?)
                .add_directive("machine_server=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = SimConfig::default().with_tick_interval(Duration::from_millis(args.tick_ms.max(1)));
    info!(tick_ms = args.tick_ms, "machine server starting");

    let store = Arc::new(MachineStore::new(config.seed));
    let service = MachineMapService::new(store, config);

    let listener = TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            info!("shutdown requested");
            shutdown.cancel();
        }
    });

    fleet_server::serve(listener, service, shutdown).await;

    info!("machine server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
