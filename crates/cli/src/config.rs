// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tfauth::config::AuthConfig;
use tfauth::credential::Credential;
use url::Url;

/// Authenticating web-service client for Team Foundation servers.
#[derive(Debug, Parser)]
#[command(name = "tfauth", version, about)]
pub struct Config {
    /// Log format (json or text).
    #[arg(long, env = "TFAUTH_LOG_FORMAT", default_value = "json", global = true)]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "TFAUTH_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    #[command(flatten)]
    pub auth: AuthConfig,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// GET one or more URLs through a single authenticated connection.
    Fetch(FetchArgs),
    /// Remove the stored credentials for a server.
    Forget {
        server: Url,
    },
    /// Print which kind of credentials are stored for a server.
    Show {
        server: Url,
    },
}

#[derive(Debug, Clone, Args)]
pub struct FetchArgs {
    /// URLs to fetch.
    #[arg(required = true, num_args = 1..)]
    pub urls: Vec<Url>,

    /// Server the connection authenticates against. Defaults to the origin
    /// of the first URL.
    #[arg(long)]
    pub server: Option<Url>,

    /// Service name the requests are made on behalf of.
    #[arg(long, default_value = "default")]
    pub service: String,

    /// Worker threads fetching each URL.
    #[arg(long, default_value = "1")]
    pub concurrency: usize,

    /// Start with this username instead of stored credentials.
    #[arg(long, env = "TFAUTH_USERNAME")]
    pub username: Option<String>,

    /// Password for --username. Prompted for when left empty.
    #[arg(long, env = "TFAUTH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Start with a personal access token.
    #[arg(long, env = "TFAUTH_PAT", hide_env_values = true)]
    pub pat: Option<String>,

    /// Token handed out by the silent OAuth flow.
    #[arg(long, env = "TFAUTH_OAUTH_TOKEN", hide_env_values = true)]
    pub oauth_token: Option<String>,

    /// Per-request timeout in milliseconds.
    #[arg(long, env = "TFAUTH_TIMEOUT_MS", default_value = "30000")]
    pub timeout_ms: u64,
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !matches!(self.log_format.as_str(), "json" | "text") {
            anyhow::bail!("invalid log format: {} (expected json or text)", self.log_format);
        }
        self.auth.validate()?;
        if let Command::Fetch(args) = &self.command {
            args.validate()?;
        }
        Ok(())
    }
}

impl FetchArgs {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.concurrency == 0 {
            anyhow::bail!("--concurrency must be at least 1");
        }
        if self.password.is_some() && self.username.is_none() {
            anyhow::bail!("--password requires --username");
        }
        if self.pat.is_some() && self.username.is_some() {
            anyhow::bail!("cannot specify both --pat and --username");
        }
        if self.server.is_none() && self.urls.iter().all(|u| u.host_str().is_none()) {
            anyhow::bail!("cannot derive a server from the urls; pass --server");
        }
        Ok(())
    }

    /// The connection's server URI.
    pub fn server_uri(&self) -> anyhow::Result<Url> {
        if let Some(server) = &self.server {
            return Ok(server.clone());
        }
        let first = self
            .urls
            .iter()
            .find(|u| u.host_str().is_some())
            .ok_or_else(|| anyhow::anyhow!("no url with a host"))?;
        Ok(Url::parse(&first.origin().ascii_serialization())?)
    }

    /// Credential given on the command line, if any.
    pub fn initial_credential(&self) -> Option<Credential> {
        if let Some(token) = &self.pat {
            return Some(Credential::pat(token.as_str()));
        }
        let username = self.username.as_deref()?;
        Some(Credential::username_password(username, self.password.as_deref().unwrap_or_default()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
