use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{FilterQuery, require};
use crate::engine::VolumeCreate;
use crate::error::ApiResult;
use crate::extract::JsonBody;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RemoveQuery {
    #[serde(default, deserialize_with = "crate::extract::flag")]
    pub force: bool,
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let listing = state.engine.list_volumes().await?;
    Ok(Json(json!({ "data": listing.volumes.unwrap_or_default() })))
}

pub async fn create(
    State(state): State<AppState>,
    JsonBody(spec): JsonBody<VolumeCreate>,
) -> ApiResult<Json<Value>> {
    let volume = state.engine.create_volume(spec).await?;
    tracing::info!(volume = %volume.name, "volume created");
    Ok(Json(json!({ "data": volume })))
}

pub async fn inspect(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    require(&name, "volume name")?;
    let volume = state.engine.inspect_volume(&name).await?;
    Ok(Json(json!({ "data": volume })))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(name): Path<String>,
    query: Result<Query<RemoveQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    require(&name, "volume name")?;
    let Query(query) = query?;
    state.engine.remove_volume(&name, query.force).await?;
    tracing::info!(volume = %name, "volume removed");
    Ok(Json(json!({
        "message": "Volume removed successfully",
        "name": name,
    })))
}

pub async fn prune(
    State(state): State<AppState>,
    query: Result<Query<FilterQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    let report = state.engine.prune_volumes(query.parsed()).await?;
    Ok(Json(json!({
        "volumes_deleted": report.volumes_deleted.unwrap_or_default(),
        "space_reclaimed": report.space_reclaimed.unwrap_or_default(),
    })))
}
