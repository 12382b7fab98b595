//! Control server startup.

use std::sync::Arc;

use autoheal_api::{ApiServer, AppState, RecentLogs, ServerAddr};
use autoheal_config::Config;
use tracing::info;

use crate::commands::connect;

/// Connect to the browser and serve the control surface until interrupted.
pub(crate) async fn serve(
    config: Config,
    logs: RecentLogs,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting autoheal v{}", env!("CARGO_PKG_VERSION"));

    let driver = connect(&config).await?;
    let addr = ServerAddr::from(&config.server);
    let state = Arc::new(AppState::new(driver, Arc::new(config), logs));

    ApiServer::new(addr, state).run().await
}
