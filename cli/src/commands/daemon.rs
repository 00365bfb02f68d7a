//! `cconnector daemon:start`: run the agent in the foreground.

use std::path::PathBuf;

use anyhow::Result;

use crate::output::OutputContext;

/// Serve the gateway until SIGINT or SIGTERM.
///
/// Listener, socket and TLS settings come from `CCONNECTOR_*` variables; the
/// record path comes from `--config`.
pub async fn start(ctx: &OutputContext, config_path: PathBuf) -> Result<()> {
    cconnector_agent::init_tracing();

    let mut config = cconnector_agent::load_config()?;
    config.config_path = config_path;

    ctx.info(&format!("Starting daemon on {}", config.listen_addr));
    cconnector_agent::run(config).await
}
