//! Control server.

use std::net::SocketAddr;
use std::sync::Arc;

use autoheal_config::ServerConfig;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::http::routes::create_router;
use crate::state::AppState;

/// Listen address of the control server.
#[derive(Debug, Clone)]
pub struct ServerAddr {
    pub host: String,
    pub port: u16,
}

impl ServerAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl From<&ServerConfig> for ServerAddr {
    fn from(config: &ServerConfig) -> Self {
        Self::new(config.host.clone(), config.port)
    }
}

/// HTTP control server for one browser session.
pub struct ApiServer {
    addr: ServerAddr,
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(addr: ServerAddr, state: Arc<AppState>) -> Self {
        Self { addr, state }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.addr.host, self.addr.port)
    }

    /// Serve until the process is interrupted, then stop any active run.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let app = create_router(self.state.clone());

        let addr: SocketAddr = self.addr().parse()?;
        let listener = TcpListener::bind(addr).await?;
        info!("Control server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        if self.state.is_run_active() {
            info!("Stopping active run before exit");
            self.state.control.stop();
            self.state.wait_for_run().await;
        }
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Cannot listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
