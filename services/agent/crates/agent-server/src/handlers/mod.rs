//! Request handlers, one module per resource.

pub mod containers;
pub mod images;
pub mod manager;
pub mod networks;
pub mod node;
pub mod volumes;

use axum::body::Body;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures::TryStreamExt;
use serde::Deserialize;

use crate::engine::{ByteStream, Filters};
use crate::error::ApiError;

/// Liveness probe. Unauthenticated.
pub async fn status() -> &'static str {
    "OK"
}

/// Reaches the handler only when the host-token gate admitted the caller.
pub async fn authentication_status() -> &'static str {
    "OK"
}

/// `?filters=<json>` as accepted by the engine's list and prune calls.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub filters: Option<String>,
}

impl FilterQuery {
    /// Parsed filters. Malformed JSON is treated as "no filters".
    #[must_use]
    pub fn parsed(&self) -> Filters {
        parse_filters(self.filters.as_deref())
    }
}

pub(crate) fn parse_filters(raw: Option<&str>) -> Filters {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Filters::new();
    };
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::debug!(error = %e, filters = raw, "ignoring malformed filters");
        Filters::new()
    })
}

pub(crate) fn require(value: &str, what: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{what} cannot be empty")));
    }
    Ok(())
}

/// Relay an engine byte stream as a chunked response body.
pub(crate) fn stream_response(content_type: &'static str, stream: ByteStream) -> Response {
    let stream = stream.inspect_err(|e| tracing::warn!(error = %e, "engine stream aborted"));
    (
        [(header::CONTENT_TYPE, content_type)],
        Body::from_stream(stream),
    )
        .into_response()
}
