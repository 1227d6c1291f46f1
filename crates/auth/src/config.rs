// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::context::ConnectionContext;
use crate::credential::Credential;
use crate::handler::HandlerSettings;

/// Authentication settings, flattened into a host binary's parser.
#[derive(Debug, Clone, Args)]
pub struct AuthConfig {
    /// Use browser federated login instead of OAuth for federated failures.
    #[arg(long, env = "TFAUTH_LEGACY_FEDERATED")]
    pub legacy_federated: bool,

    /// JSON credential store. Credentials are kept in memory only when unset.
    #[arg(long, env = "TFAUTH_CREDENTIAL_STORE")]
    pub credential_store: Option<PathBuf>,

    /// Service account username, tried before any interactive prompt.
    #[arg(long, env = "TFAUTH_SERVICE_USERNAME")]
    pub service_username: Option<String>,

    /// Service account password.
    #[arg(long, env = "TFAUTH_SERVICE_PASSWORD", hide_env_values = true)]
    pub service_password: Option<String>,

    /// Service that must never prompt for credentials (repeatable).
    #[arg(
        long = "no-prompt-service",
        env = "TFAUTH_NO_PROMPT_SERVICES",
        value_delimiter = ','
    )]
    pub no_prompt_services: Vec<String>,

    /// How long the UI loop sleeps when it has no events, in milliseconds.
    #[arg(long, env = "TFAUTH_UI_IDLE_MS", default_value = "50")]
    pub ui_idle_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            legacy_federated: false,
            credential_store: None,
            service_username: None,
            service_password: None,
            no_prompt_services: Vec::new(),
            ui_idle_ms: 50,
        }
    }
}

impl AuthConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.service_password.is_some() && self.service_username.is_none() {
            anyhow::bail!("--service-password requires --service-username");
        }
        if self.ui_idle_ms == 0 {
            anyhow::bail!("--ui-idle-ms must be greater than zero");
        }
        Ok(())
    }

    pub fn ui_idle(&self) -> Duration {
        Duration::from_millis(self.ui_idle_ms)
    }

    /// Baseline service credential, if a username was configured.
    pub fn service_credential(&self) -> Option<Credential> {
        let username = self.service_username.as_deref()?;
        let password = self.service_password.as_deref().unwrap_or_default();
        Some(Credential::username_password(username, password))
    }

    pub fn settings(&self) -> HandlerSettings {
        HandlerSettings { legacy_federated: self.legacy_federated }
    }

    /// Attach the no-prompt service hints to `connection`.
    pub fn apply_hints(&self, mut connection: ConnectionContext) -> ConnectionContext {
        for service in self.no_prompt_services.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            connection = connection.with_service_hint(service, false);
        }
        connection
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
