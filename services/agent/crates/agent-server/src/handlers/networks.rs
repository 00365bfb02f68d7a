use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{FilterQuery, require};
use crate::engine::{NetworkConnect, NetworkCreate, NetworkDisconnect};
use crate::error::ApiResult;
use crate::extract::JsonBody;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct InspectQuery {
    #[serde(default, deserialize_with = "crate::extract::flag")]
    pub verbose: bool,
}

pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<FilterQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    let networks = state.engine.list_networks(query.parsed()).await?;
    Ok(Json(json!({ "data": networks })))
}

pub async fn create(
    State(state): State<AppState>,
    JsonBody(spec): JsonBody<NetworkCreate>,
) -> ApiResult<Json<Value>> {
    require(&spec.name, "network name")?;
    let network = state.engine.create_network(spec).await?;
    tracing::info!(network = network.name.as_deref().unwrap_or_default(), "network created");
    Ok(Json(json!({ "data": network })))
}

pub async fn inspect(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<InspectQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    require(&id, "network id")?;
    let Query(query) = query?;
    let network = state.engine.inspect_network(&id, query.verbose).await?;
    Ok(Json(json!({ "data": network })))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    require(&id, "network id")?;
    state.engine.remove_network(&id).await?;
    tracing::info!(network = %id, "network removed");
    Ok(Json(json!({
        "message": "Network removed successfully",
        "id": id,
    })))
}

pub async fn connect(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<NetworkConnect>,
) -> ApiResult<Json<Value>> {
    require(&id, "network id")?;
    require(&request.container, "container")?;
    let container = request.container.clone();
    state.engine.connect_network(&id, request).await?;
    Ok(Json(json!({
        "message": "Container connected to network successfully",
        "network": id,
        "container": container,
    })))
}

pub async fn disconnect(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<NetworkDisconnect>,
) -> ApiResult<Json<Value>> {
    require(&id, "network id")?;
    require(&request.container, "container")?;
    let container = request.container.clone();
    state.engine.disconnect_network(&id, request).await?;
    Ok(Json(json!({
        "message": "Container disconnected from network successfully",
        "network": id,
        "container": container,
    })))
}

pub async fn prune(
    State(state): State<AppState>,
    query: Result<Query<FilterQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    let report = state.engine.prune_networks(query.parsed()).await?;
    Ok(Json(json!({
        "networks_deleted": report.networks_deleted.unwrap_or_default(),
    })))
}
