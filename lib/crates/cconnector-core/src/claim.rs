//! One-shot binding of a manager to this host.
//!
//! ```text
//!              claim(token)
//!  Unclaimed ───────────────▶ Claimed
//!      ▲                         │
//!      └──────── reset() ────────┘
//! ```
//!
//! `generate` rotates the host token in either state. Every transition is a
//! single [`CredentialStore::update`], so the state check and the write are
//! made under the store lock.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::credentials::{CredentialRecord, CredentialStore, StoreError};
use crate::token::{self, DEFAULT_TOKEN_BYTES, TokenError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimState {
    Unclaimed,
    Claimed,
}

impl std::fmt::Display for ClaimState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unclaimed => write!(f, "unclaimed"),
            Self::Claimed => write!(f, "claimed"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("manager token cannot be empty")]
    EmptyManagerToken,

    #[error("manager token already claimed")]
    AlreadyClaimed,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] TokenError),

    /// The reset record was written, but reading it back returned something
    /// else. The file may now pair a stale manager token with a new host
    /// token, or the reverse.
    #[error(
        "reset of {} did not persist as written; host and manager tokens may be inconsistent",
        .path.display()
    )]
    ResetIncomplete { path: PathBuf },
}

/// Claim / reset / rotate operations over a shared [`CredentialStore`].
#[derive(Debug, Clone)]
pub struct ClaimService {
    store: Arc<CredentialStore>,
    token_bytes: usize,
}

impl ClaimService {
    #[must_use]
    pub fn new(store: Arc<CredentialStore>) -> Self {
        Self {
            store,
            token_bytes: DEFAULT_TOKEN_BYTES,
        }
    }

    /// Override the byte length used when `reset` rotates the host token.
    #[must_use]
    pub fn with_token_bytes(mut self, token_bytes: usize) -> Self {
        self.token_bytes = token_bytes;
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn status(&self) -> Result<ClaimState, ClaimError> {
        Ok(self.store.read()?.state())
    }

    /// Bind `manager_token` to this host. Fails if a manager already holds it.
    pub fn claim(&self, manager_token: &str) -> Result<CredentialRecord, ClaimError> {
        if manager_token.is_empty() {
            return Err(ClaimError::EmptyManagerToken);
        }
        let record = self.store.update(|current| {
            if current.is_claimed() {
                return Err(ClaimError::AlreadyClaimed);
            }
            Ok(CredentialRecord {
                host_token: current.host_token.clone(),
                manager_token: manager_token.to_owned(),
            })
        })?;
        tracing::info!(path = %self.store.path().display(), "host claimed by manager");
        Ok(record)
    }

    /// Rotate the host token, leaving the manager token as it is.
    pub fn generate(&self, length: usize) -> Result<CredentialRecord, ClaimError> {
        let record = self.store.update(|current| {
            Ok::<_, ClaimError>(CredentialRecord {
                host_token: fresh_token(length, &current.host_token)?,
                manager_token: current.manager_token.clone(),
            })
        })?;
        tracing::info!(path = %self.store.path().display(), "host token rotated");
        Ok(record)
    }

    /// Clear the manager token and rotate the host token in one write.
    pub fn reset(&self) -> Result<CredentialRecord, ClaimError> {
        let written = self.store.update(|current| {
            Ok::<_, ClaimError>(CredentialRecord {
                host_token: fresh_token(self.token_bytes, &current.host_token)?,
                manager_token: String::new(),
            })
        })?;

        let persisted = self.store.read()?;
        confirm_persisted(self.store.path(), &written, &persisted)?;
        tracing::info!(path = %self.store.path().display(), "manager released and host token rotated");
        Ok(written)
    }

    /// Set the manager token directly, bypassing the claim endpoint.
    ///
    /// Refuses to replace an existing manager unless `force` is set.
    pub fn assign_manager(
        &self,
        manager_token: &str,
        force: bool,
    ) -> Result<CredentialRecord, ClaimError> {
        if manager_token.is_empty() {
            return Err(ClaimError::EmptyManagerToken);
        }
        let record = self.store.update(|current| {
            if current.is_claimed() && !force {
                return Err(ClaimError::AlreadyClaimed);
            }
            Ok(CredentialRecord {
                host_token: current.host_token.clone(),
                manager_token: manager_token.to_owned(),
            })
        })?;
        tracing::info!(path = %self.store.path().display(), force, "manager token assigned");
        Ok(record)
    }
}

/// `persisted` is what a read-back returned after `written` was stored.
fn confirm_persisted(
    path: &Path,
    written: &CredentialRecord,
    persisted: &CredentialRecord,
) -> Result<(), ClaimError> {
    if persisted == written {
        return Ok(());
    }
    tracing::error!(path = %path.display(), "credential record changed underneath reset");
    Err(ClaimError::ResetIncomplete {
        path: path.to_path_buf(),
    })
}

/// A new token guaranteed to differ from `previous`.
fn fresh_token(length: usize, previous: &str) -> Result<String, TokenError> {
    loop {
        let candidate = token::generate(length)?;
        if candidate != previous {
            return Ok(candidate);
        }
    }
}
