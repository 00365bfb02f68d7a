//! Daemon lifecycle: validate dependencies, bind, serve, drain.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use cconnector_core::{AgentConfig, CredentialStore, ENV_PREFIX};

use crate::engine::{ContainerEngine, DockerEngine};
use crate::machine::SysinfoMachineSpecs;
use crate::router::router;
use crate::state::AppState;

/// Load [`AgentConfig`] from `CCONNECTOR_*` environment variables.
pub fn load_config() -> Result<AgentConfig> {
    envy::prefixed(ENV_PREFIX)
        .from_env::<AgentConfig>()
        .with_context(|| format!("failed to load config from {ENV_PREFIX}* env vars"))
}

/// Start the gateway and block until a shutdown signal has drained it.
///
/// Fails before binding if the engine socket is unreachable or the
/// credential record cannot be read.
pub async fn run(config: AgentConfig) -> Result<()> {
    tracing::info!(
        listen_addr = %config.listen_addr,
        config_path = %config.config_path.display(),
        docker_socket = %config.docker_socket.display(),
        tls_enabled = config.tls_paths().is_some(),
        "configuration loaded",
    );

    let engine = DockerEngine::connect(&config.docker_socket)
        .context("cannot reach the container engine")?;
    engine
        .ping()
        .await
        .context("container engine did not answer ping")?;

    let store = Arc::new(CredentialStore::new(&config.config_path));
    let record = store.read().with_context(|| {
        format!(
            "cannot read credential record {} (run `cconnector config:initiate`)",
            config.config_path.display()
        )
    })?;
    if !record.has_host_token() {
        tracing::warn!(
            "host token is empty; every authenticated request will be rejected \
             until `cconnector token:generate` runs"
        );
    }

    let state = AppState::new(
        store,
        Arc::new(engine),
        Arc::new(SysinfoMachineSpecs::default()),
    );
    serve(&config, router(state)).await
}

/// Bind `app` on the configured address, with TLS when cert and key are set.
pub async fn serve(config: &AgentConfig, app: Router) -> Result<()> {
    let handle: Handle<SocketAddr> = Handle::new();
    tokio::spawn(drain_on_signal(handle.clone(), config.shutdown_grace()));

    if let Some((cert, key)) = config.tls_paths() {
        let tls = RustlsConfig::from_pem_file(cert, key)
            .await
            .context("failed to load TLS certificates")?;
        tracing::info!("gateway ready on https://{}", config.listen_addr);
        axum_server::bind_rustls(config.listen_addr, tls)
            .handle(handle)
            .serve(app.into_make_service())
            .await
            .context("HTTPS server error")?;
    } else {
        tracing::info!("gateway ready on http://{} (TLS disabled)", config.listen_addr);
        axum_server::bind(config.listen_addr)
            .handle(handle)
            .serve(app.into_make_service())
            .await
            .context("HTTP server error")?;
    }

    tracing::info!("cconnector-agent shut down");
    Ok(())
}

async fn drain_on_signal(handle: Handle<SocketAddr>, grace: Duration) {
    shutdown_signal().await;
    tracing::info!(
        grace_secs = grace.as_secs(),
        "received shutdown signal, draining in-flight requests"
    );
    handle.graceful_shutdown(Some(grace));
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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
