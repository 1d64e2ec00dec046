//! Nerkh relay entry point

use std::path::PathBuf;

use clap::Parser;
use tokio::signal;
use tracing::{error, info};

use nerkh_core::logging::init_tracing;
use nerkh_core::NerkhConfig;
use nerkh_proxy::ProxyServer;

#[derive(Parser, Debug)]
#[command(name = "nerkh-proxy", version, about = "CORS relay for brsapi and nobitex")]
struct Args {
    /// Config file (defaults to ./nerkh.toml when present)
    #[arg(short, long, env = "NERKH_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = NerkhConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    init_tracing(&config.logging);
    info!("Starting Nerkh relay v{}", env!("CARGO_PKG_VERSION"));

    let server = ProxyServer::from_config(&config)?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(e) => {
                    error!("Failed to install signal handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C");
            }
            _ = terminate => {
                info!("Received termination signal");
            }
        }

        let _ = shutdown_tx.send(());
    });

    info!("Press Ctrl+C to shutdown");

    if let Err(e) = server.start_with_shutdown(shutdown_rx).await {
        error!("Server error: {}", e);
        return Err(e);
    }

    info!("Server shutdown complete");
    Ok(())
}
