//! cconnector-agent entry point.
//!
//! Initialises tracing, loads configuration from `CCONNECTOR_*` environment
//! variables and serves the gateway until SIGINT or SIGTERM.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    cconnector_agent::init_tracing();
    tracing::info!("cconnector-agent starting");

    let config = cconnector_agent::load_config()?;
    cconnector_agent::run(config).await
}
