//! HTTP listener for the relay

use tokio::net::TcpListener;
use tracing::info;

use nerkh_core::{NerkhConfig, ServerConfig};

use crate::relay::{router, RelayConfig, RelayState};

/// Relay server wrapper
pub struct ProxyServer {
    config: ServerConfig,
    state: RelayState,
}

impl ProxyServer {
    pub fn new(config: ServerConfig, relay: RelayConfig) -> anyhow::Result<Self> {
        Ok(Self {
            config,
            state: RelayState::new(relay)?,
        })
    }

    pub fn from_config(config: &NerkhConfig) -> anyhow::Result<Self> {
        Self::new(config.server.clone(), RelayConfig::from(config))
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests
    pub async fn start_with_shutdown(
        &self,
        shutdown: tokio::sync::oneshot::Receiver<()>,
    ) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.address()).await?;
        info!("Relay listening on {}", listener.local_addr()?);

        axum::serve(listener, router(self.state.clone()))
            .with_graceful_shutdown(async {
                shutdown.await.ok();
                info!("Shutdown signal received");
            })
            .await?;

        Ok(())
    }

    pub fn address(&self) -> String {
        self.config.address()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_default_config() {
        let server = ProxyServer::from_config(&NerkhConfig::default()).unwrap();
        assert_eq!(server.address(), "0.0.0.0:8787");
    }

    #[tokio::test]
    async fn test_shutdown_stops_serving() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        };
        let server = ProxyServer::new(config, RelayConfig::from(&NerkhConfig::default())).unwrap();

        let (tx, rx) = tokio::sync::oneshot::channel();
        let handle = tokio::spawn(async move { server.start_with_shutdown(rx).await });

        tx.send(()).unwrap();
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
