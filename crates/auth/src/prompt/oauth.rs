// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Silent OAuth token acquisition.

use super::{persist, PromptEnv, PromptOutcome, PromptRequest};

/// Try to obtain a token without UI. No token is reported as cancelled.
pub fn run(request: &PromptRequest, env: &PromptEnv) -> anyhow::Result<PromptOutcome> {
    let server_uri = request
        .server_uri
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("oauth token acquisition needs a server uri"))?;

    match env.interaction.acquire_token_silently(server_uri)? {
        Some(credential) => {
            tracing::info!(server = %server_uri, kind = credential.kind(), "acquired oauth credentials");
            persist(env, server_uri, &credential);
            Ok(PromptOutcome::Credential(credential))
        }
        None => {
            tracing::info!(server = %server_uri, "no oauth credentials available");
            Ok(PromptOutcome::Cancelled)
        }
    }
}
