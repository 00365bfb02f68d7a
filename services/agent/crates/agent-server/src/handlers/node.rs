use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, blocking};

/// `GET /v1/nodes/specs`: current machine descriptor.
pub async fn specs(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let machine = state.machine.clone();
    let descriptor = blocking(move || machine.snapshot()).await?.map_err(|e| {
        tracing::error!(error = %e, "cannot collect machine specs");
        ApiError::Internal
    })?;
    Ok(Json(json!({ "machine_specs": descriptor })))
}
