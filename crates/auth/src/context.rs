// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;

use parking_lot::RwLock;
use url::Url;

use crate::credential::Credential;
use crate::store::CredentialStore;

/// Authentication state of one server connection.
///
/// Every request reads the current credential to configure its own call;
/// only the request handler writes it.
#[derive(Debug)]
pub struct ConnectionContext {
    server_uri: Url,
    credential: RwLock<Credential>,
    /// Lowercased service name -> whether it may prompt interactively.
    service_hints: HashMap<String, bool>,
}

impl ConnectionContext {
    pub fn new(server_uri: Url, credential: Credential) -> Self {
        Self { server_uri, credential: RwLock::new(credential), service_hints: HashMap::new() }
    }

    /// Seed the connection from the store, falling back to platform auth.
    pub fn load(server_uri: Url, store: &dyn CredentialStore) -> Self {
        let credential = match store.get(&server_uri) {
            Ok(Some(c)) => {
                tracing::debug!(server = %server_uri, kind = c.kind(), "using stored credentials");
                c
            }
            Ok(None) => Credential::PlatformDefault,
            Err(e) => {
                tracing::warn!(server = %server_uri, err = %e, "could not read stored credentials");
                Credential::PlatformDefault
            }
        };
        Self::new(server_uri, credential)
    }

    pub fn with_service_hint(mut self, service: &str, prompt_allowed: bool) -> Self {
        self.service_hints.insert(service.to_lowercase(), prompt_allowed);
        self
    }

    pub fn server_uri(&self) -> &Url {
        &self.server_uri
    }

    pub fn credential(&self) -> Credential {
        self.credential.read().clone()
    }

    /// Replace the credential. Returns whether it actually changed.
    pub(crate) fn set_credential(&self, credential: Credential) -> bool {
        let mut current = self.credential.write();
        if *current == credential {
            return false;
        }
        *current = credential;
        true
    }

    /// Services prompt unless a hint says otherwise.
    pub fn prompt_allowed(&self, service: &str) -> bool {
        self.service_hints.get(&service.to_lowercase()).copied().unwrap_or(true)
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
