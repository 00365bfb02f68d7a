//! Host-token gate in front of every `/v1` route.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use cconnector_core::{authorize, bearer_token};

use crate::error::ApiError;
use crate::state::{AppState, blocking};

/// Admit the request only if its bearer token equals the stored host token.
///
/// The credential record is read fresh on every call. A read failure is an
/// internal error, distinct from a rejected credential.
pub async fn require_host_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(presented) = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_owned)
    else {
        tracing::debug!(path = %request.uri().path(), "missing bearer token");
        return Err(ApiError::Unauthorized);
    };

    let store = state.credentials.clone();
    let record = blocking(move || store.read()).await?.map_err(|e| {
        tracing::error!(error = %e, "cannot read credential record");
        ApiError::Internal
    })?;

    if !authorize(&presented, &record).is_allowed() {
        tracing::warn!(path = %request.uri().path(), "rejected invalid host token");
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(request).await)
}
