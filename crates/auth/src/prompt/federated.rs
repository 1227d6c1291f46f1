// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Browser-based federated login.

use super::{basic, PromptEnv, PromptOutcome, PromptRequest};

const UNAVAILABLE_TITLE: &str = "Federated authentication unavailable";

/// Show the federated login page at the failure's auth URL.
pub fn run(request: &PromptRequest, env: &PromptEnv) -> anyhow::Result<PromptOutcome> {
    if !env.interaction.federated_supported() {
        env.interaction.show_error(
            UNAVAILABLE_TITLE,
            "Signing in to this server requires a web browser, which is not available.",
        );
        return Ok(PromptOutcome::Cancelled);
    }
    let Some(auth_url) = request.auth_url() else {
        env.interaction.show_error(
            UNAVAILABLE_TITLE,
            "The server did not say where to sign in.",
        );
        return Ok(PromptOutcome::Cancelled);
    };

    match env.interaction.federated_login(request.server_uri.as_ref(), auth_url)? {
        Some(credential) => Ok(PromptOutcome::Credential(credential)),
        None => Ok(PromptOutcome::Cancelled),
    }
}

/// Federated login when possible, otherwise a username/password dialog
/// seeded with the same failure.
pub fn run_with_fallback(request: &PromptRequest, env: &PromptEnv) -> anyhow::Result<PromptOutcome> {
    if env.interaction.federated_supported() && request.auth_url().is_some() {
        return run(request, env);
    }
    tracing::debug!("federated login unavailable, asking for username and password");
    basic::run(request, env)
}
