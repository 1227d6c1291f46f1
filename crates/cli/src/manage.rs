// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tfauth forget` and `tfauth show`.

use tfauth::config::AuthConfig;
use tfauth::store::CredentialStore;
use url::Url;

use crate::fetch::open_store;

/// Remove the stored credentials for `server`.
pub fn forget(auth: &AuthConfig, server: &Url) -> anyhow::Result<()> {
    if auth.credential_store.is_none() {
        anyhow::bail!("no credential store configured (--credential-store)");
    }
    open_store(auth).remove(server)?;
    tracing::info!(server = %server, "stored credentials removed");
    Ok(())
}

/// Kind of the stored credentials for `server`, never the secret itself.
pub fn show(auth: &AuthConfig, server: &Url) -> anyhow::Result<Option<&'static str>> {
    if auth.credential_store.is_none() {
        anyhow::bail!("no credential store configured (--credential-store)");
    }
    Ok(open_store(auth).get(server)?.map(|c| c.kind()))
}

#[cfg(test)]
#[path = "manage_tests.rs"]
mod tests;
