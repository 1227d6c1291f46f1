// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive credential prompts.
//!
//! A prompt runs once on the UI thread and produces one [`PromptOutcome`]
//! that every request waiting on it observes. Rendering is delegated to an
//! [`Interaction`] supplied by the host.

pub mod basic;
pub mod federated;
pub mod oauth;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use url::Url;

use crate::credential::Credential;
use crate::error::AuthErrorKind;
use crate::store::CredentialStore;
use crate::transport::AuthFailure;

/// Which flow a prompt runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Silent OAuth token acquisition; shows no UI.
    OAuth,
    /// Browser login at the federated auth URL.
    Federated,
    /// Federated login, or username/password when no browser is available.
    FederatedFallback,
    UsernamePassword,
}

impl PromptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OAuth => "oauth",
            Self::Federated => "federated",
            Self::FederatedFallback => "federated_fallback",
            Self::UsernamePassword => "username_password",
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single result of a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    Credential(Credential),
    /// Dismissed by the user, or the prompt failed.
    Cancelled,
}

impl PromptOutcome {
    pub fn into_credential(self) -> Option<Credential> {
        match self {
            Self::Credential(c) => Some(c),
            Self::Cancelled => None,
        }
    }
}

/// Input to a prompt, created per failure and consumed once.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    /// `None` connects to the whole service rather than one server.
    pub server_uri: Option<Url>,
    /// The credential that failed.
    pub current: Credential,
    pub failure: Option<AuthFailure>,
    /// Message of the failure, shown alongside the prompt.
    pub message: Option<String>,
}

impl PromptRequest {
    pub fn auth_url(&self) -> Option<&Url> {
        match &self.failure {
            Some(AuthFailure::Federated { auth_url }) => auth_url.as_ref(),
            _ => None,
        }
    }
}

/// Contents of a username/password dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm<'a> {
    pub server_uri: Option<&'a Url>,
    pub username: Option<&'a str>,
    pub message: Option<&'a str>,
    /// Offer a "save password" option.
    pub offer_save: bool,
}

/// What the user entered in a username/password dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAnswer {
    pub credential: Credential,
    pub save: bool,
}

/// Host-side rendering of prompts. Called on the UI thread only.
///
/// `Ok(None)` means the user dismissed the dialog.
pub trait Interaction: Send + Sync {
    /// Acquire an OAuth token without showing UI.
    fn acquire_token_silently(&self, server_uri: &Url) -> anyhow::Result<Option<Credential>>;

    /// Whether a browser is available for federated login.
    fn federated_supported(&self) -> bool;

    fn federated_login(
        &self,
        server_uri: Option<&Url>,
        auth_url: &Url,
    ) -> anyhow::Result<Option<Credential>>;

    fn request_credentials(&self, form: &LoginForm<'_>) -> anyhow::Result<Option<LoginAnswer>>;

    fn show_error(&self, title: &str, message: &str);

    /// Forget session state held by embedded browsers.
    fn clear_browser_sessions(&self) {}
}

/// Collaborators a prompt needs while it runs.
#[derive(Clone)]
pub struct PromptEnv {
    pub interaction: Arc<dyn Interaction>,
    pub store: Arc<dyn CredentialStore>,
}

/// Write-once outcome cell. Waiters block on the same lock that guards it.
#[derive(Default)]
pub struct Completion {
    outcome: Mutex<Option<PromptOutcome>>,
    done: Condvar,
}

impl Completion {
    /// Record the outcome and wake every waiter. Later calls are no-ops.
    pub fn complete(&self, outcome: PromptOutcome) -> bool {
        let mut slot = self.outcome.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(outcome);
        self.done.notify_all();
        true
    }

    pub fn outcome(&self) -> Option<PromptOutcome> {
        self.outcome.lock().clone()
    }

    pub fn is_complete(&self) -> bool {
        self.outcome.lock().is_some()
    }

    pub fn wait(&self) -> PromptOutcome {
        let mut slot = self.outcome.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            self.done.wait(&mut slot);
        }
    }
}

/// Completes with `Cancelled` if the prompt unwinds before finishing.
struct CancelOnDrop<'a>(&'a Completion);

impl Drop for CancelOnDrop<'_> {
    fn drop(&mut self) {
        if self.0.complete(PromptOutcome::Cancelled) {
            tracing::warn!(kind = %AuthErrorKind::PromptFailed, "prompt ended without an outcome");
        }
    }
}

/// One prompt instance.
pub struct AuthPrompt {
    id: u64,
    kind: PromptKind,
    request: PromptRequest,
    env: PromptEnv,
    started: AtomicBool,
    completion: Completion,
}

impl AuthPrompt {
    pub fn new(id: u64, kind: PromptKind, request: PromptRequest, env: PromptEnv) -> Self {
        Self {
            id,
            kind,
            request,
            env,
            started: AtomicBool::new(false),
            completion: Completion::default(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> PromptKind {
        self.kind
    }

    /// Run the flow. Only the first call does anything.
    pub fn run(&self) {
        if self.started.swap(true, Ordering::AcqRel) {
            tracing::debug!(prompt_id = self.id, "prompt already ran");
            return;
        }
        if self.completion.is_complete() {
            tracing::debug!(prompt_id = self.id, "prompt cancelled before it ran");
            return;
        }
        let _guard = CancelOnDrop(&self.completion);

        tracing::debug!(prompt_id = self.id, kind = %self.kind, "running credential prompt");
        let result = match self.kind {
            PromptKind::OAuth => oauth::run(&self.request, &self.env),
            PromptKind::Federated => federated::run(&self.request, &self.env),
            PromptKind::FederatedFallback => federated::run_with_fallback(&self.request, &self.env),
            PromptKind::UsernamePassword => basic::run(&self.request, &self.env),
        };
        let outcome = result.unwrap_or_else(|e| {
            tracing::warn!(prompt_id = self.id, kind = %AuthErrorKind::PromptFailed, err = %e, "credential prompt failed");
            PromptOutcome::Cancelled
        });
        self.completion.complete(outcome);
    }

    /// Resolve as cancelled without running (or after a failed launch).
    pub fn cancel(&self) {
        self.completion.complete(PromptOutcome::Cancelled);
    }

    pub fn is_complete(&self) -> bool {
        self.completion.is_complete()
    }

    pub fn outcome(&self) -> Option<PromptOutcome> {
        self.completion.outcome()
    }

    /// Block the calling thread until the prompt resolves.
    pub fn wait(&self) -> PromptOutcome {
        self.completion.wait()
    }
}

/// Persist a credential the user or a token flow produced.
pub(crate) fn persist(env: &PromptEnv, server_uri: &Url, credential: &Credential) {
    if let Err(e) = env.store.set(server_uri, credential) {
        tracing::warn!(
            server = %server_uri,
            kind = %AuthErrorKind::PersistenceFailed,
            err = %e,
            "could not save credentials"
        );
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
