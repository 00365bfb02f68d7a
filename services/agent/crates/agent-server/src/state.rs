//! Shared application state for the gateway.

use std::sync::Arc;

use cconnector_core::{ClaimService, CredentialStore, MachineSpecs};

use crate::engine::ContainerEngine;
use crate::error::ApiError;

/// Handles shared by every request.
///
/// The credential record is not cached: each authenticated request reads
/// it from disk so CLI rotations take effect without a restart.
#[derive(Clone)]
pub struct AppState {
    pub credentials: Arc<CredentialStore>,
    pub claims: ClaimService,
    pub engine: Arc<dyn ContainerEngine>,
    pub machine: Arc<dyn MachineSpecs>,
}

impl AppState {
    pub fn new(
        credentials: Arc<CredentialStore>,
        engine: Arc<dyn ContainerEngine>,
        machine: Arc<dyn MachineSpecs>,
    ) -> Self {
        Self {
            claims: ClaimService::new(Arc::clone(&credentials)),
            credentials,
            engine,
            machine,
        }
    }
}

/// Run filesystem or sampling work off the async executor.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!(error = %e, "blocking task failed");
        ApiError::Internal
    })
}
