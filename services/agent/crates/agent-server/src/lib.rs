//! cconnector host agent: an authenticated HTTP gateway over the local
//! container engine.
//!
//! `/status` answers unauthenticated liveness probes. Everything under `/v1`
//! requires `Authorization: Bearer <host token>`, where the host token is
//! read from the credential record on every request.

#![cfg_attr(test, allow(clippy::expect_used))]

pub mod engine;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod machine;
pub mod middleware;
pub mod router;
pub mod server;
pub mod state;

pub use router::router;
pub use server::{load_config, run, serve};
pub use state::AppState;

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
