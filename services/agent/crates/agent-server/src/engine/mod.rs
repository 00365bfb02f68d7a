//! Container engine port.
//!
//! Handlers talk to the engine only through [`ContainerEngine`]; the
//! production adapter is [`DockerEngine`] (bollard over the local unix
//! socket). Results are the engine's own model types so responses keep the
//! engine's native shape.

mod docker;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bollard::models::{
    ContainerInspectResponse, ContainerSummary, EndpointSettings, HistoryResponseItem,
    ImageDeleteResponseItem, ImageInspect, ImagePruneResponse, ImageSummary, Network,
    NetworkPruneResponse, PortBinding, PortMap, Volume, VolumeListResponse, VolumePruneResponse,
};
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::Deserialize;
use thiserror::Error;

pub use docker::DockerEngine;

/// Engine filter map, e.g. `{"label": ["env=prod"]}`.
pub type Filters = HashMap<String, Vec<String>>;

/// Raw chunks of a streamed engine response.
pub type ByteStream = BoxStream<'static, Result<Bytes, EngineError>>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Rejected(String),

    #[error("container engine unavailable at {}: {reason}", .socket.display())]
    Unavailable { socket: PathBuf, reason: String },

    #[error("cannot encode engine response")]
    Encode(#[source] serde_json::Error),

    #[error(transparent)]
    Engine(bollard::errors::Error),
}

impl From<bollard::errors::Error> for EngineError {
    fn from(err: bollard::errors::Error) -> Self {
        match err {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                message,
            } => Self::NotFound(message),
            bollard::errors::Error::DockerResponseServerError {
                status_code: 409,
                message,
            } => Self::Conflict(message),
            bollard::errors::Error::DockerResponseServerError {
                status_code: 400,
                message,
            } => Self::Rejected(message),
            other => Self::Engine(other),
        }
    }
}

// ===================================================================
// Request shapes
// ===================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainerCreate {
    #[serde(default)]
    pub name: String,
    pub image_source: String,
    #[serde(default)]
    pub image_tag: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Network ids or names to attach at creation.
    #[serde(default)]
    pub networks: Vec<String>,
    #[serde(default)]
    pub volumes: Vec<VolumeBind>,
    #[serde(default)]
    pub environments: Vec<EnvVar>,
    #[serde(default)]
    pub port_bindings: Vec<PortBindingSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VolumeBind {
    pub name: String,
    pub destination: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvVar {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortBindingSpec {
    /// Container port with protocol, e.g. `"80/tcp"`.
    pub protocol: String,
    #[serde(default)]
    pub mapping: Vec<HostPort>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostPort {
    #[serde(default)]
    pub host_ip: String,
    #[serde(default)]
    pub host_port: String,
}

impl ContainerCreate {
    #[must_use]
    pub fn image_ref(&self) -> String {
        if self.image_tag.is_empty() {
            self.image_source.clone()
        } else {
            format!("{}:{}", self.image_source, self.image_tag)
        }
    }

    #[must_use]
    pub fn env(&self) -> Vec<String> {
        self.environments
            .iter()
            .map(|e| format!("{}={}", e.key, e.value))
            .collect()
    }

    #[must_use]
    pub fn binds(&self) -> Vec<String> {
        self.volumes
            .iter()
            .map(|v| format!("{}:{}", v.name, v.destination))
            .collect()
    }

    #[must_use]
    pub fn port_map(&self) -> PortMap {
        let mut ports = PortMap::new();
        for spec in &self.port_bindings {
            let bindings = ports
                .entry(spec.protocol.clone())
                .or_insert_with(|| Some(Vec::new()))
                .get_or_insert_with(Vec::new);
            bindings.extend(spec.mapping.iter().map(|m| PortBinding {
                host_ip: non_empty(&m.host_ip),
                host_port: non_empty(&m.host_port),
            }));
        }
        ports
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ContainerRemove {
    #[serde(default, deserialize_with = "crate::extract::flag")]
    pub force: bool,
    #[serde(default, deserialize_with = "crate::extract::flag")]
    pub remove_volumes: bool,
    #[serde(default, deserialize_with = "crate::extract::flag")]
    pub remove_links: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogsQuery {
    /// Number of trailing lines, or `"all"` (the default).
    pub tail: Option<String>,
    #[serde(default, deserialize_with = "crate::extract::flag")]
    pub timestamps: bool,
    #[serde(default, deserialize_with = "crate::extract::flag")]
    pub follow: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecRequest {
    pub cmd: Vec<String>,
    #[serde(default)]
    pub attach_stdin: bool,
    #[serde(default)]
    pub attach_stdout: bool,
    #[serde(default)]
    pub attach_stderr: bool,
    #[serde(default)]
    pub tty: bool,
    #[serde(default)]
    pub detach: bool,
    pub working_dir: Option<String>,
    #[serde(default)]
    pub env: Vec<String>,
}

pub enum ExecOutcome {
    Detached { exec_id: String },
    Attached { exec_id: String, output: ByteStream },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkCreate {
    pub name: String,
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkConnect {
    pub container: String,
    #[serde(default)]
    pub endpoint_config: EndpointSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkDisconnect {
    pub container: String,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VolumeCreate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub driver_opts: HashMap<String, String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImagePull {
    pub reference: String,
    pub platform: Option<String>,
    pub auth: Option<RegistryAuth>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryAuth {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "serveraddress")]
    pub server_address: Option<String>,
    #[serde(alias = "identitytoken")]
    pub identity_token: Option<String>,
}

impl RegistryAuth {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none() && self.identity_token.is_none()
    }
}

/// Split `repo[:tag]` into `(repo, tag)`, defaulting the tag to `latest`.
///
/// Digest references (`repo@sha256:...`) are returned whole with an empty
/// tag. A colon that belongs to a registry port (`host:5000/repo`) is not
/// treated as a tag separator.
#[must_use]
pub fn split_reference(reference: &str) -> (String, String) {
    if reference.contains('@') {
        return (reference.to_string(), String::new());
    }
    let name_start = reference.rfind('/').map_or(0, |i| i + 1);
    match reference[name_start..].rfind(':') {
        Some(i) => {
            let at = name_start + i;
            (reference[..at].to_string(), reference[at + 1..].to_string())
        }
        None => (reference.to_string(), "latest".to_string()),
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

// ===================================================================
// Port
// ===================================================================

/// Operations the gateway proxies to the container engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    async fn ping(&self) -> Result<(), EngineError>;

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>, EngineError>;
    async fn create_container(
        &self,
        spec: ContainerCreate,
    ) -> Result<ContainerInspectResponse, EngineError>;
    async fn start_container(&self, id: &str) -> Result<ContainerInspectResponse, EngineError>;
    async fn stop_container(&self, id: &str, timeout: Duration) -> Result<(), EngineError>;
    async fn restart_container(&self, id: &str, timeout: Duration) -> Result<(), EngineError>;
    async fn remove_container(&self, id: &str, opts: ContainerRemove) -> Result<(), EngineError>;
    async fn inspect_container(&self, id: &str) -> Result<ContainerInspectResponse, EngineError>;
    async fn pause_container(&self, id: &str) -> Result<(), EngineError>;
    async fn unpause_container(&self, id: &str) -> Result<(), EngineError>;
    async fn container_logs(&self, id: &str, query: LogsQuery) -> Result<ByteStream, EngineError>;
    async fn exec(&self, id: &str, request: ExecRequest) -> Result<ExecOutcome, EngineError>;

    async fn list_networks(&self, filters: Filters) -> Result<Vec<Network>, EngineError>;
    async fn create_network(&self, spec: NetworkCreate) -> Result<Network, EngineError>;
    async fn inspect_network(&self, id: &str, verbose: bool) -> Result<Network, EngineError>;
    async fn remove_network(&self, id: &str) -> Result<(), EngineError>;
    async fn connect_network(&self, id: &str, request: NetworkConnect)
    -> Result<(), EngineError>;
    async fn disconnect_network(
        &self,
        id: &str,
        request: NetworkDisconnect,
    ) -> Result<(), EngineError>;
    async fn prune_networks(&self, filters: Filters) -> Result<NetworkPruneResponse, EngineError>;

    async fn list_volumes(&self) -> Result<VolumeListResponse, EngineError>;
    async fn create_volume(&self, spec: VolumeCreate) -> Result<Volume, EngineError>;
    async fn inspect_volume(&self, name: &str) -> Result<Volume, EngineError>;
    async fn remove_volume(&self, name: &str, force: bool) -> Result<(), EngineError>;
    async fn prune_volumes(&self, filters: Filters) -> Result<VolumePruneResponse, EngineError>;

    async fn list_images(&self, all: bool, filters: Filters)
    -> Result<Vec<ImageSummary>, EngineError>;
    /// Pull an image, streaming the engine's progress as JSON lines.
    async fn pull_image(&self, request: ImagePull) -> Result<ByteStream, EngineError>;
    async fn inspect_image(&self, id: &str) -> Result<ImageInspect, EngineError>;
    async fn remove_image(
        &self,
        id: &str,
        force: bool,
        prune: bool,
    ) -> Result<Vec<ImageDeleteResponseItem>, EngineError>;
    async fn tag_image(&self, id: &str, target_ref: &str) -> Result<(), EngineError>;
    async fn prune_images(&self, filters: Filters) -> Result<ImagePruneResponse, EngineError>;
    async fn image_history(&self, id: &str) -> Result<Vec<HistoryResponseItem>, EngineError>;
}
