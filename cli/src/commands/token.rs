//! `cconnector token:*`: host and manager token administration.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use cconnector_core::{ClaimError, ClaimService, ClaimState, CredentialStore, StoreError};

use crate::output::OutputContext;

fn service(path: &Path) -> ClaimService {
    ClaimService::new(Arc::new(CredentialStore::new(path)))
}

/// Attach a hint when the record has not been created yet.
fn explain(err: ClaimError) -> anyhow::Error {
    match err {
        ClaimError::Store(StoreError::NotFound { path }) => anyhow::anyhow!(
            "credential record not found at {}; run `cconnector config:initiate` first",
            path.display()
        ),
        other => anyhow::Error::new(other),
    }
}

/// Rotate the host token and print it.
pub fn generate(ctx: &OutputContext, path: &Path, length: usize) -> Result<()> {
    let record = service(path)
        .generate(length)
        .map_err(explain)
        .context("failed to generate host token")?;

    ctx.success("Host token generated");
    ctx.secret(&record.host_token);
    Ok(())
}

/// Store `token` as the manager token without going through a claim.
pub fn manager(ctx: &OutputContext, path: &Path, token: &str, force: bool) -> Result<()> {
    match service(path).assign_manager(token, force) {
        Ok(_) => {
            ctx.success("Manager token set");
            Ok(())
        }
        Err(ClaimError::AlreadyClaimed) => {
            anyhow::bail!("host is already claimed; pass --force to replace the manager token")
        }
        Err(e) => Err(explain(e)).context("failed to set manager token"),
    }
}

/// Clear the manager token, rotate the host token and print the new one.
pub fn reset(ctx: &OutputContext, path: &Path) -> Result<()> {
    let record = service(path)
        .reset()
        .map_err(explain)
        .context("failed to reset tokens")?;

    ctx.success("Manager released and host token rotated");
    ctx.secret(&record.host_token);
    Ok(())
}

/// Print the claim state and whether a host token is set.
pub fn status(ctx: &OutputContext, path: &Path) -> Result<()> {
    let store = CredentialStore::new(path);
    let record = store
        .read()
        .map_err(|e| explain(ClaimError::Store(e)))
        .context("failed to read credential record")?;

    let state = record.state();
    if ctx.quiet {
        ctx.secret(&state.to_string());
        return Ok(());
    }
    ctx.kv("record:", &path.display().to_string());
    ctx.kv("state:", &state.to_string());
    ctx.kv(
        "host token:",
        if record.has_host_token() { "set" } else { "empty" },
    );
    if state == ClaimState::Unclaimed && !record.has_host_token() {
        ctx.warn("No host token: every authenticated request will be rejected");
    }
    Ok(())
}
