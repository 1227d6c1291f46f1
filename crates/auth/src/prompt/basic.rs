// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{persist, LoginForm, PromptEnv, PromptOutcome, PromptRequest};

/// Ask for a username and password, pre-filled from the failed credential.
pub fn run(request: &PromptRequest, env: &PromptEnv) -> anyhow::Result<PromptOutcome> {
    let offer_save = env.store.can_persist() && request.server_uri.is_some();
    let form = LoginForm {
        server_uri: request.server_uri.as_ref(),
        username: request.current.username(),
        message: request.message.as_deref(),
        offer_save,
    };

    let Some(answer) = env.interaction.request_credentials(&form)? else {
        return Ok(PromptOutcome::Cancelled);
    };

    if answer.save && offer_save {
        if let Some(server_uri) = &request.server_uri {
            persist(env, server_uri, &answer.credential);
        }
    }
    Ok(PromptOutcome::Credential(answer.credential))
}
