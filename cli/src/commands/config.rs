//! `cconnector config:initiate`: create an empty credential record.

use std::path::Path;

use anyhow::{Context, Result};
use cconnector_core::CredentialStore;

use crate::output::OutputContext;

/// Create the record at `path`, replacing any existing one.
///
/// Both tokens start empty; run `token:generate` afterwards.
pub fn initiate(ctx: &OutputContext, path: &Path) -> Result<()> {
    let store = CredentialStore::new(path);
    if store.exists() {
        ctx.warn(&format!(
            "Overwriting existing credential record at {}",
            path.display()
        ));
    }
    store
        .initialize()
        .context("failed to create credential record")?;

    ctx.success(&format!("Config file created at {}", path.display()));
    ctx.info("Run `cconnector token:generate` to issue a host token");
    Ok(())
}
