use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Prefix shared by every environment variable the agent reads.
pub const ENV_PREFIX: &str = "CCONNECTOR_";

/// Environment variable overriding the credential record location.
pub const CONFIG_PATH_ENV: &str = "CCONNECTOR_CONFIG_PATH";

/// Default credential record location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/cconnector/config.yaml";

/// Default Docker engine socket.
pub const DEFAULT_DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Agent daemon configuration.
///
/// Each field maps to `CCONNECTOR_<FIELD>` when loaded with
/// `envy::prefixed(ENV_PREFIX)`:
///   - `CCONNECTOR_LISTEN_ADDR`          (default `0.0.0.0:8080`)
///   - `CCONNECTOR_CONFIG_PATH`          (default `/etc/cconnector/config.yaml`)
///   - `CCONNECTOR_DOCKER_SOCKET`        (default `/var/run/docker.sock`)
///   - `CCONNECTOR_SHUTDOWN_GRACE_SECS`  (default `10`)
///   - `CCONNECTOR_TLS_CERT`             (optional, path to TLS cert)
///   - `CCONNECTOR_TLS_KEY`              (optional, path to TLS key)
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Socket address to bind the HTTP server to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Location of the credential record.
    #[serde(default = "default_config_path")]
    pub config_path: PathBuf,

    /// Docker engine unix socket.
    #[serde(default = "default_docker_socket")]
    pub docker_socket: PathBuf,

    /// Ceiling for in-flight requests after a shutdown signal.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    /// Path to TLS certificate (enables HTTPS when set with `tls_key`).
    pub tls_cert: Option<PathBuf>,

    /// Path to TLS private key.
    pub tls_key: Option<PathBuf>,
}

impl AgentConfig {
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Certificate and key paths, only when both are configured.
    #[must_use]
    pub fn tls_paths(&self) -> Option<(&PathBuf, &PathBuf)> {
        self.tls_cert.as_ref().zip(self.tls_key.as_ref())
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

fn default_docker_socket() -> PathBuf {
    PathBuf::from(DEFAULT_DOCKER_SOCKET)
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            config_path: default_config_path(),
            docker_socket: default_docker_socket(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            tls_cert: None,
            tls_key: None,
        }
    }
}
