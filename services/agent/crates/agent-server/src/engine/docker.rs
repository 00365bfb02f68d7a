//! bollard-backed [`ContainerEngine`] over the local unix socket.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bollard::Docker;
use bollard::auth::DockerCredentials;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions, LogOutput,
    LogsOptions, NetworkingConfig, RemoveContainerOptions, RestartContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecOptions, StartExecResults};
use bollard::image::{
    CreateImageOptions, ListImagesOptions, PruneImagesOptions, RemoveImageOptions,
    TagImageOptions,
};
use bollard::models::{
    ContainerInspectResponse, ContainerSummary, EndpointSettings, HistoryResponseItem, HostConfig,
    ImageDeleteResponseItem, ImageInspect, ImagePruneResponse, ImageSummary, Network,
    NetworkPruneResponse, Volume, VolumeListResponse, VolumePruneResponse,
};
use bollard::network::{
    ConnectNetworkOptions, CreateNetworkOptions, DisconnectNetworkOptions, InspectNetworkOptions,
    ListNetworksOptions, PruneNetworksOptions,
};
use bollard::volume::{CreateVolumeOptions, ListVolumesOptions, PruneVolumesOptions, RemoveVolumeOptions};
use bytes::Bytes;
use futures::StreamExt;

use super::{
    ByteStream, ContainerCreate, ContainerEngine, ContainerRemove, EngineError, ExecOutcome,
    ExecRequest, Filters, ImagePull, LogsQuery, NetworkConnect, NetworkCreate, NetworkDisconnect,
    RegistryAuth, VolumeCreate, split_reference,
};

/// Seconds bollard waits on a single engine request.
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connect to the engine socket at `socket`.
    ///
    /// Only checks that the socket exists and the client can be built; call
    /// [`ContainerEngine::ping`] to confirm the engine answers.
    pub fn connect(socket: &Path) -> Result<Self, EngineError> {
        if !socket.exists() {
            return Err(EngineError::Unavailable {
                socket: socket.to_path_buf(),
                reason: "socket does not exist".to_string(),
            });
        }
        let docker = Docker::connect_with_unix(
            &socket.to_string_lossy(),
            REQUEST_TIMEOUT_SECS,
            bollard::API_DEFAULT_VERSION,
        )
        .map_err(|e| EngineError::Unavailable {
            socket: socket.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self { docker })
    }

    async fn endpoints_for(
        &self,
        spec: &ContainerCreate,
    ) -> Result<HashMap<String, EndpointSettings>, EngineError> {
        let mut endpoints = HashMap::new();
        for name in &spec.networks {
            let network = self
                .docker
                .inspect_network(name, None::<InspectNetworkOptions<String>>)
                .await?;
            let aliases = (!spec.name.is_empty()).then(|| vec![spec.name.clone()]);
            endpoints.insert(
                name.clone(),
                EndpointSettings {
                    network_id: network.id,
                    aliases,
                    ..Default::default()
                },
            );
        }
        Ok(endpoints)
    }
}

fn credentials(auth: RegistryAuth) -> DockerCredentials {
    DockerCredentials {
        username: auth.username,
        password: auth.password,
        email: auth.email,
        serveraddress: auth.server_address,
        identitytoken: auth.identity_token,
        ..Default::default()
    }
}

fn log_stream<S>(stream: S) -> ByteStream
where
    S: futures::Stream<Item = Result<LogOutput, bollard::errors::Error>> + Send + 'static,
{
    stream
        .map(|item| item.map(LogOutput::into_bytes).map_err(EngineError::from))
        .boxed()
}

#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
fn whole_seconds(timeout: Duration) -> i64 {
    timeout.as_secs() as i64
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn ping(&self) -> Result<(), EngineError> {
        self.docker.ping().await?;
        Ok(())
    }

    // ── containers ──────────────────────────────────────────────────

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>, EngineError> {
        let options = ListContainersOptions::<String> {
            all,
            ..Default::default()
        };
        Ok(self.docker.list_containers(Some(options)).await?)
    }

    async fn create_container(
        &self,
        spec: ContainerCreate,
    ) -> Result<ContainerInspectResponse, EngineError> {
        let endpoints_config = self.endpoints_for(&spec).await?;
        let config = Config {
            image: Some(spec.image_ref()),
            env: Some(spec.env()),
            labels: Some(spec.labels.clone()),
            host_config: Some(HostConfig {
                binds: Some(spec.binds()),
                port_bindings: Some(spec.port_map()),
                ..Default::default()
            }),
            networking_config: Some(NetworkingConfig { endpoints_config }),
            ..Default::default()
        };
        let options = (!spec.name.is_empty()).then(|| CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        });

        let created = self.docker.create_container(options, config).await?;
        for warning in &created.warnings {
            tracing::warn!(container = %created.id, %warning, "engine warning on create");
        }
        self.inspect_container(&created.id).await
    }

    async fn start_container(&self, id: &str) -> Result<ContainerInspectResponse, EngineError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?;
        self.inspect_container(id).await
    }

    async fn stop_container(&self, id: &str, timeout: Duration) -> Result<(), EngineError> {
        let options = StopContainerOptions {
            t: whole_seconds(timeout),
        };
        Ok(self.docker.stop_container(id, Some(options)).await?)
    }

    async fn restart_container(&self, id: &str, timeout: Duration) -> Result<(), EngineError> {
        let options = RestartContainerOptions {
            t: isize::try_from(whole_seconds(timeout)).unwrap_or(isize::MAX),
        };
        Ok(self.docker.restart_container(id, Some(options)).await?)
    }

    async fn remove_container(&self, id: &str, opts: ContainerRemove) -> Result<(), EngineError> {
        let options = RemoveContainerOptions {
            v: opts.remove_volumes,
            force: opts.force,
            link: opts.remove_links,
        };
        Ok(self.docker.remove_container(id, Some(options)).await?)
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerInspectResponse, EngineError> {
        Ok(self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?)
    }

    async fn pause_container(&self, id: &str) -> Result<(), EngineError> {
        Ok(self.docker.pause_container(id).await?)
    }

    async fn unpause_container(&self, id: &str) -> Result<(), EngineError> {
        Ok(self.docker.unpause_container(id).await?)
    }

    async fn container_logs(&self, id: &str, query: LogsQuery) -> Result<ByteStream, EngineError> {
        // Surface a missing container as an error before the stream starts.
        self.inspect_container(id).await?;
        let options = LogsOptions::<String> {
            follow: query.follow,
            stdout: true,
            stderr: true,
            timestamps: query.timestamps,
            tail: query.tail.unwrap_or_else(|| "all".to_string()),
            ..Default::default()
        };
        Ok(log_stream(self.docker.logs(id, Some(options))))
    }

    async fn exec(&self, id: &str, request: ExecRequest) -> Result<ExecOutcome, EngineError> {
        let attached = !request.detach;
        let options = CreateExecOptions {
            cmd: Some(request.cmd),
            attach_stdin: Some(request.attach_stdin && attached),
            attach_stdout: Some(request.attach_stdout || attached),
            attach_stderr: Some(request.attach_stderr || attached),
            tty: Some(request.tty),
            env: (!request.env.is_empty()).then_some(request.env),
            working_dir: request.working_dir,
            ..Default::default()
        };
        let exec_id = self.docker.create_exec(id, options).await?.id;

        if request.detach {
            let start = StartExecOptions {
                detach: true,
                ..Default::default()
            };
            self.docker.start_exec(&exec_id, Some(start)).await?;
            return Ok(ExecOutcome::Detached { exec_id });
        }

        match self.docker.start_exec(&exec_id, None).await? {
            StartExecResults::Attached { output, .. } => Ok(ExecOutcome::Attached {
                exec_id,
                output: log_stream(output),
            }),
            StartExecResults::Detached => Ok(ExecOutcome::Detached { exec_id }),
        }
    }

    // ── networks ────────────────────────────────────────────────────

    async fn list_networks(&self, filters: Filters) -> Result<Vec<Network>, EngineError> {
        Ok(self
            .docker
            .list_networks(Some(ListNetworksOptions { filters }))
            .await?)
    }

    async fn create_network(&self, spec: NetworkCreate) -> Result<Network, EngineError> {
        let options = CreateNetworkOptions {
            name: spec.name.clone(),
            driver: spec.driver,
            labels: spec.labels,
            ..Default::default()
        };
        self.docker.create_network(options).await?;
        self.inspect_network(&spec.name, false).await
    }

    async fn inspect_network(&self, id: &str, verbose: bool) -> Result<Network, EngineError> {
        let options = InspectNetworkOptions::<String> {
            verbose,
            ..Default::default()
        };
        Ok(self.docker.inspect_network(id, Some(options)).await?)
    }

    async fn remove_network(&self, id: &str) -> Result<(), EngineError> {
        Ok(self.docker.remove_network(id).await?)
    }

    async fn connect_network(
        &self,
        id: &str,
        request: NetworkConnect,
    ) -> Result<(), EngineError> {
        let options = ConnectNetworkOptions {
            container: request.container,
            endpoint_config: request.endpoint_config,
        };
        Ok(self.docker.connect_network(id, options).await?)
    }

    async fn disconnect_network(
        &self,
        id: &str,
        request: NetworkDisconnect,
    ) -> Result<(), EngineError> {
        let options = DisconnectNetworkOptions {
            container: request.container,
            force: request.force,
        };
        Ok(self.docker.disconnect_network(id, options).await?)
    }

    async fn prune_networks(&self, filters: Filters) -> Result<NetworkPruneResponse, EngineError> {
        Ok(self
            .docker
            .prune_networks(Some(PruneNetworksOptions { filters }))
            .await?)
    }

    // ── volumes ─────────────────────────────────────────────────────

    async fn list_volumes(&self) -> Result<VolumeListResponse, EngineError> {
        Ok(self
            .docker
            .list_volumes(None::<ListVolumesOptions<String>>)
            .await?)
    }

    async fn create_volume(&self, spec: VolumeCreate) -> Result<Volume, EngineError> {
        let options = CreateVolumeOptions {
            name: spec.name,
            driver: spec.driver,
            driver_opts: spec.driver_opts,
            labels: spec.labels,
        };
        let created = self.docker.create_volume(options).await?;
        self.inspect_volume(&created.name).await
    }

    async fn inspect_volume(&self, name: &str) -> Result<Volume, EngineError> {
        Ok(self.docker.inspect_volume(name).await?)
    }

    async fn remove_volume(&self, name: &str, force: bool) -> Result<(), EngineError> {
        Ok(self
            .docker
            .remove_volume(name, Some(RemoveVolumeOptions { force }))
            .await?)
    }

    async fn prune_volumes(&self, filters: Filters) -> Result<VolumePruneResponse, EngineError> {
        Ok(self
            .docker
            .prune_volumes(Some(PruneVolumesOptions { filters }))
            .await?)
    }

    // ── images ──────────────────────────────────────────────────────

    async fn list_images(
        &self,
        all: bool,
        filters: Filters,
    ) -> Result<Vec<ImageSummary>, EngineError> {
        let options = ListImagesOptions {
            all,
            filters,
            ..Default::default()
        };
        Ok(self.docker.list_images(Some(options)).await?)
    }

    async fn pull_image(&self, request: ImagePull) -> Result<ByteStream, EngineError> {
        let (from_image, tag) = split_reference(&request.reference);
        let options = CreateImageOptions {
            from_image,
            tag,
            platform: request.platform.unwrap_or_default(),
            ..Default::default()
        };
        let auth = request
            .auth
            .filter(|a| !a.is_empty())
            .map(credentials);

        let progress = self
            .docker
            .create_image(Some(options), None, auth)
            .map(|item| -> Result<Bytes, EngineError> {
                let info = item.map_err(EngineError::from)?;
                let mut line = serde_json::to_vec(&info).map_err(EngineError::Encode)?;
                line.push(b'\n');
                Ok(Bytes::from(line))
            })
            .boxed();
        Ok(progress)
    }

    async fn inspect_image(&self, id: &str) -> Result<ImageInspect, EngineError> {
        Ok(self.docker.inspect_image(id).await?)
    }

    async fn remove_image(
        &self,
        id: &str,
        force: bool,
        prune: bool,
    ) -> Result<Vec<ImageDeleteResponseItem>, EngineError> {
        let options = RemoveImageOptions {
            force,
            noprune: !prune,
        };
        Ok(self.docker.remove_image(id, Some(options), None).await?)
    }

    async fn tag_image(&self, id: &str, target_ref: &str) -> Result<(), EngineError> {
        let (repo, tag) = split_reference(target_ref);
        Ok(self
            .docker
            .tag_image(id, Some(TagImageOptions { repo, tag }))
            .await?)
    }

    async fn prune_images(&self, filters: Filters) -> Result<ImagePruneResponse, EngineError> {
        Ok(self
            .docker
            .prune_images(Some(PruneImagesOptions { filters }))
            .await?)
    }

    async fn image_history(&self, id: &str) -> Result<Vec<HistoryResponseItem>, EngineError> {
        Ok(self.docker.image_history(id).await?)
    }
}
