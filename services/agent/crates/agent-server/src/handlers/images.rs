use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{parse_filters, require, stream_response};
use crate::engine::ImagePull;
use crate::error::ApiResult;
use crate::extract::JsonBody;
use crate::state::AppState;

const PROGRESS_CONTENT_TYPE: &str = "application/x-ndjson";

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default, deserialize_with = "crate::extract::flag")]
    pub all: bool,
    pub filters: Option<String>,
}

/// Body of `POST /v1/images`: build the reference from source and tag.
#[derive(Debug, Deserialize)]
pub struct ImageCreate {
    pub source: String,
    #[serde(default)]
    pub tag: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RemoveQuery {
    #[serde(default, deserialize_with = "crate::extract::flag")]
    pub force: bool,
    #[serde(default, deserialize_with = "crate::extract::flag")]
    pub prune: bool,
}

#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub target_ref: String,
}

pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    let filters = parse_filters(query.filters.as_deref());
    let images = state.engine.list_images(query.all, filters).await?;
    Ok(Json(json!({ "data": images })))
}

pub async fn create(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ImageCreate>,
) -> ApiResult<Response> {
    require(&request.source, "image source")?;
    let reference = if request.tag.is_empty() {
        request.source
    } else {
        format!("{}:{}", request.source, request.tag)
    };
    pull_reference(&state, ImagePull {
        reference,
        ..ImagePull::default()
    })
    .await
}

pub async fn pull(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ImagePull>,
) -> ApiResult<Response> {
    require(&request.reference, "image reference")?;
    pull_reference(&state, request).await
}

async fn pull_reference(state: &AppState, request: ImagePull) -> ApiResult<Response> {
    tracing::info!(reference = %request.reference, "pulling image");
    let progress = state.engine.pull_image(request).await?;
    Ok(stream_response(PROGRESS_CONTENT_TYPE, progress))
}

pub async fn inspect(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    require(&id, "image id")?;
    let image = state.engine.inspect_image(&id).await?;
    Ok(Json(json!({ "data": image })))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<RemoveQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    require(&id, "image id")?;
    let Query(query) = query?;
    let deleted = state
        .engine
        .remove_image(&id, query.force, query.prune)
        .await?;
    tracing::info!(image = %id, "image removed");
    Ok(Json(json!({
        "message": "Image removed successfully",
        "deleted": deleted,
    })))
}

pub async fn tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<TagRequest>,
) -> ApiResult<Json<Value>> {
    require(&id, "image id")?;
    require(&request.target_ref, "target reference")?;
    state.engine.tag_image(&id, &request.target_ref).await?;
    Ok(Json(json!({
        "message": "Image tagged successfully",
        "source": id,
        "target": request.target_ref,
    })))
}

pub async fn history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    require(&id, "image id")?;
    let history = state.engine.image_history(&id).await?;
    Ok(Json(json!({ "data": history })))
}

pub async fn prune(
    State(state): State<AppState>,
    query: Result<Query<super::FilterQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    let report = state.engine.prune_images(query.parsed()).await?;
    Ok(Json(json!({
        "images_deleted": report.images_deleted.unwrap_or_default(),
        "space_reclaimed": report.space_reclaimed.unwrap_or_default(),
    })))
}
