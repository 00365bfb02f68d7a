use std::time::Duration;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use bollard::models::{ContainerInspectResponse, ContainerSummary};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{require, stream_response};
use crate::engine::{ContainerCreate, ContainerRemove, ExecOutcome, ExecRequest, LogsQuery};
use crate::error::{ApiError, ApiResult};
use crate::extract::JsonBody;
use crate::state::AppState;

/// Grace period the engine gives a container before killing it.
const STOP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default, deserialize_with = "crate::extract::flag")]
    pub all: bool,
}

#[derive(Debug, Serialize)]
struct Acknowledged<'a> {
    message: &'static str,
    id: &'a str,
}

fn ack<'a>(message: &'static str, id: &'a str) -> Json<Acknowledged<'a>> {
    Json(Acknowledged { message, id })
}

pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<ContainerSummary>>> {
    let Query(query) = query?;
    Ok(Json(state.engine.list_containers(query.all).await?))
}

pub async fn create(
    State(state): State<AppState>,
    JsonBody(spec): JsonBody<ContainerCreate>,
) -> ApiResult<Json<ContainerInspectResponse>> {
    require(&spec.image_source, "image source")?;
    let created = state.engine.create_container(spec).await?;
    tracing::info!(container = created.id.as_deref().unwrap_or_default(), "container created");
    Ok(Json(created))
}

pub async fn inspect(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ContainerInspectResponse>> {
    require(&id, "container id")?;
    Ok(Json(state.engine.inspect_container(&id).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<ContainerRemove>, QueryRejection>,
) -> ApiResult<Response> {
    require(&id, "container id")?;
    let Query(opts) = query?;
    state.engine.remove_container(&id, opts).await?;
    tracing::info!(container = %id, "container removed");
    Ok(ack("Container removed successfully", &id).into_response())
}

pub async fn start(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ContainerInspectResponse>> {
    require(&id, "container id")?;
    Ok(Json(state.engine.start_container(&id).await?))
}

pub async fn stop(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    require(&id, "container id")?;
    state.engine.stop_container(&id, STOP_TIMEOUT).await?;
    Ok(ack("Container stopped successfully", &id).into_response())
}

pub async fn restart(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    require(&id, "container id")?;
    state.engine.restart_container(&id, STOP_TIMEOUT).await?;
    Ok(ack("Container restarted successfully", &id).into_response())
}

pub async fn pause(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    require(&id, "container id")?;
    state.engine.pause_container(&id).await?;
    Ok(ack("Container paused successfully", &id).into_response())
}

pub async fn unpause(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    require(&id, "container id")?;
    state.engine.unpause_container(&id).await?;
    Ok(ack("Container unpaused successfully", &id).into_response())
}

pub async fn logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<LogsQuery>, QueryRejection>,
) -> ApiResult<Response> {
    require(&id, "container id")?;
    let Query(query) = query?;
    let stream = state.engine.container_logs(&id, query).await?;
    Ok(stream_response("application/octet-stream", stream))
}

pub async fn exec(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<ExecRequest>,
) -> ApiResult<Response> {
    require(&id, "container id")?;
    if request.cmd.is_empty() {
        return Err(ApiError::bad_request("cmd cannot be empty"));
    }

    match state.engine.exec(&id, request).await? {
        ExecOutcome::Detached { exec_id } => Ok(Json(json!({
            "message": "Command executed in detached mode",
            "exec_id": exec_id,
        }))
        .into_response()),
        ExecOutcome::Attached { exec_id, output } => {
            tracing::debug!(container = %id, %exec_id, "streaming exec output");
            Ok(stream_response("application/octet-stream", output))
        }
    }
}
