use axum::Json;
use axum::extract::State;
use cconnector_core::MachineDescriptor;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::extract::JsonBody;
use crate::state::{AppState, blocking};

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub manager_token: String,
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub message: &'static str,
    pub machine_specs: MachineDescriptor,
}

/// `POST /v1/managers/claims`: bind the calling manager to this host.
///
/// The claim is committed before the machine snapshot is taken; a snapshot
/// failure afterwards is reported as an internal error but does not undo
/// the claim.
pub async fn claim(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ClaimRequest>,
) -> ApiResult<Json<ClaimResponse>> {

    let claims = state.claims.clone();
    blocking(move || claims.claim(&request.manager_token)).await??;

    let machine = state.machine.clone();
    let machine_specs = blocking(move || machine.snapshot()).await?.map_err(|e| {
        tracing::warn!(error = %e, "host claimed but machine specs are unavailable");
        ApiError::Internal
    })?;

    Ok(Json(ClaimResponse {
        message: "OK",
        machine_specs,
    }))
}
