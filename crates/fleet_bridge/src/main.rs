//! Bridge binary.
//!
//! ## Startup Sequence
//!
//! 1. Parse configuration (flags or environment).
//! 2. Check that the machine server is reachable.
//! 3. Bind the WebSocket listener and serve until Ctrl-C / SIGTERM.

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fleet_bridge::config::{DEFAULT_LISTEN, DEFAULT_PATH, DEFAULT_RPC_ADDR};
use fleet_bridge::{BridgeConfig, BridgeServer};
use fleet_net::MachineMapClient;

#[derive(Parser)]
#[command(name = "machine_bridge", about = "WebSocket bridge for the machine server")]
struct Args {
    /// Address the WebSocket listener binds to
    #[arg(short, long, env = "MACHINE_BRIDGE_LISTEN", default_value = DEFAULT_LISTEN)]
    listen: String,

    /// Machine server address
    #[arg(short, long, env = "MACHINE_RPC_ADDR", default_value = DEFAULT_RPC_ADDR)]
    rpc_addr: String,

    /// Path clients connect on
    #[arg(short, long, env = "MACHINE_BRIDGE_PATH", default_value = DEFAULT_PATH)]
    path: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("fleet_bridge=info".parse()?)
                .add_directive("fleet_net=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = BridgeConfig::default()
        .with_listen(args.listen)
        .with_rpc_addr(args.rpc_addr)
        .with_path(args.path);
    info!(?config, "bridge starting");

    let client = MachineMapClient::connect(config.rpc_addr.clone())
        .await
        .with_context(|| format!("machine server unreachable at {}", config.rpc_addr))?;

    let server = BridgeServer::bind(&config, client)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            info!("shutdown requested");
            shutdown.cancel();
        }
    });

    server.run(shutdown).await;

    info!("bridge shut down");
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
