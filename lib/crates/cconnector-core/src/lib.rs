//! Host identity and trust handshake for the cconnector agent.
//!
//! Everything here is synchronous and filesystem-backed so that both the
//! daemon (via `spawn_blocking`) and the CLI can share it.

#![cfg_attr(test, allow(clippy::expect_used))]

pub mod auth;
pub mod claim;
pub mod config;
pub mod credentials;
pub mod machine;
pub mod token;

pub use auth::{Decision, authorize, bearer_token};
pub use claim::{ClaimError, ClaimService, ClaimState};
pub use config::{AgentConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, ENV_PREFIX};
pub use credentials::{CredentialRecord, CredentialStore, StoreError};
pub use machine::{MachineDescriptor, MachineSpecs, MachineSpecsError};
pub use token::{DEFAULT_TOKEN_BYTES, TokenError};
