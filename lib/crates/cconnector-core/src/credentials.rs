//! The host's persisted identity record.
//!
//! The record is a single YAML file holding the host token and the manager
//! token. It is always rewritten as a whole: writes go to a temporary file in
//! the same directory which is then renamed over the target, so a reader sees
//! either the previous record or the new one.

use std::fmt;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::claim::ClaimState;

/// Host token and manager token, persisted together.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Bearer credential accepted by the agent's protected routes.
    #[serde(default)]
    pub host_token: String,
    /// Identity of the manager that claimed this host. Empty when unclaimed.
    #[serde(default)]
    pub manager_token: String,
}

impl CredentialRecord {
    #[must_use]
    pub fn state(&self) -> ClaimState {
        if self.manager_token.is_empty() {
            ClaimState::Unclaimed
        } else {
            ClaimState::Claimed
        }
    }

    #[must_use]
    pub fn is_claimed(&self) -> bool {
        self.state() == ClaimState::Claimed
    }

    #[must_use]
    pub fn has_host_token(&self) -> bool {
        !self.host_token.is_empty()
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(token: &str) -> &'static str {
            if token.is_empty() { "<empty>" } else { "<redacted>" }
        }
        f.debug_struct("CredentialRecord")
            .field("host_token", &redact(&self.host_token))
            .field("manager_token", &redact(&self.manager_token))
            .finish()
    }
}

/// Failures of the credential store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential record not found at {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("cannot read credential record {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse credential record {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("cannot serialize credential record")]
    Serialize(#[source] serde_yaml::Error),

    #[error("cannot write credential record {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// File-backed owner of the [`CredentialRecord`].
///
/// Every mutation performed through one `CredentialStore` is serialised by an
/// internal lock, so a check made inside [`CredentialStore::update`] still
/// holds when the write lands. Other processes writing the same file are not
/// covered by the lock.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CredentialStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the current record.
    ///
    /// An empty file reads as a record with both tokens empty.
    pub fn read(&self) -> Result<CredentialRecord, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    path: self.path.clone(),
                });
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if content.trim().is_empty() {
            return Ok(CredentialRecord::default());
        }
        serde_yaml::from_str(&content).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Overwrite an existing record. Never creates the file.
    pub fn replace(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        let _guard = self.lock();
        self.replace_locked(record)
    }

    /// Create the record with both tokens empty, creating the parent
    /// directory if needed. Any existing record is overwritten.
    pub fn initialize(&self) -> Result<(), StoreError> {
        let _guard = self.lock();
        let dir = self.dir();
        std::fs::create_dir_all(dir).map_err(|source| StoreError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
        self.write_atomic(&CredentialRecord::default())?;
        tracing::info!(path = %self.path.display(), "credential record initialised");
        Ok(())
    }

    /// Conditional read-modify-write.
    ///
    /// `f` sees the current record and returns its replacement, or an error
    /// that aborts the update without writing. The store lock is held from
    /// the read until the write completes.
    pub fn update<E, F>(&self, f: F) -> Result<CredentialRecord, E>
    where
        F: FnOnce(&CredentialRecord) -> Result<CredentialRecord, E>,
        E: From<StoreError>,
    {
        let _guard = self.lock();
        let current = self.read()?;
        let next = f(&current)?;
        self.replace_locked(&next)?;
        Ok(next)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    fn replace_locked(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        if !self.exists() {
            return Err(StoreError::NotFound {
                path: self.path.clone(),
            });
        }
        self.write_atomic(record)
    }

    fn write_atomic(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        let content = serde_yaml::to_string(record).map_err(StoreError::Serialize)?;
        let write_err = |source: io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(self.dir()).map_err(write_err)?;
        tmp.write_all(content.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o600))
                .map_err(write_err)?;
        }
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}
