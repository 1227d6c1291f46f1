// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request lifecycle handler: the hooks the transport calls around each
//! web-service request.

use std::sync::Arc;

use crate::context::ConnectionContext;
use crate::cookie::{self, CookieOrigin};
use crate::coordinator::SingleFlight;
use crate::credential::Credential;
use crate::error::AuthErrorKind;
use crate::prompt::{AuthPrompt, Interaction, PromptEnv, PromptKind, PromptOutcome, PromptRequest};
use crate::store::CredentialStore;
use crate::transport::{AuthFailure, RequestContext, Status, TransportClient, TransportError};
use crate::ui::UiContext;

/// Behavioural switches for the handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerSettings {
    /// Use browser federated login (falling back to username/password)
    /// instead of OAuth for federated failures.
    pub legacy_federated: bool,
}

/// Satisfies federated failures with statically configured service
/// credentials, before anything interactive is tried.
#[derive(Debug, Clone, Default)]
pub struct ServiceCredentials {
    credential: Option<Credential>,
}

impl ServiceCredentials {
    pub fn new(credential: Option<Credential>) -> Self {
        Self { credential }
    }

    pub fn on_exception(
        &self,
        connection: &ConnectionContext,
        transport: &dyn TransportClient,
        failure: &AuthFailure,
    ) -> Status {
        let (AuthFailure::Federated { .. }, Some(credential)) = (failure, &self.credential) else {
            return Status::Continue;
        };
        // Already rejected once; don't loop on the same credentials.
        if connection.credential() == *credential {
            return Status::Continue;
        }
        tracing::debug!(server = %connection.server_uri(), "applying service credentials");
        connection.set_credential(credential.clone());
        transport.configure_credentials(credential);
        Status::Complete
    }
}

/// Everything a [`RequestHandler`] is built from.
pub struct HandlerParts {
    pub connection: Arc<ConnectionContext>,
    pub transport: Arc<dyn TransportClient>,
    pub store: Arc<dyn CredentialStore>,
    pub interaction: Arc<dyn Interaction>,
    pub ui: Arc<dyn UiContext>,
    pub service_credentials: ServiceCredentials,
    pub settings: HandlerSettings,
}

pub struct RequestHandler {
    connection: Arc<ConnectionContext>,
    transport: Arc<dyn TransportClient>,
    store: Arc<dyn CredentialStore>,
    interaction: Arc<dyn Interaction>,
    ui: Arc<dyn UiContext>,
    flight: SingleFlight,
    baseline: ServiceCredentials,
    settings: HandlerSettings,
}

impl RequestHandler {
    pub fn new(parts: HandlerParts) -> Self {
        Self {
            connection: parts.connection,
            transport: parts.transport,
            store: parts.store,
            interaction: parts.interaction,
            flight: SingleFlight::new(Arc::clone(&parts.ui)),
            ui: parts.ui,
            baseline: parts.service_credentials,
            settings: parts.settings,
        }
    }

    pub fn connection(&self) -> &Arc<ConnectionContext> {
        &self.connection
    }

    pub fn flight(&self) -> &SingleFlight {
        &self.flight
    }

    /// Before sending: a username with an empty password is known to fail,
    /// so ask for credentials first. Cancels the request if the user aborts.
    pub fn prepare(&self, request: &RequestContext) -> Status {
        let current = self.connection.credential();
        if !current.has_empty_password() {
            return Status::Continue;
        }

        tracing::debug!(service = %request.service, "credentials with an empty password detected");
        let prompt = PromptRequest {
            server_uri: Some(self.connection.server_uri().clone()),
            current,
            failure: None,
            message: None,
        };
        match self.obtain(PromptKind::UsernamePassword, prompt) {
            PromptOutcome::Credential(credential) => self.apply(credential),
            PromptOutcome::Cancelled => {
                tracing::debug!(service = %request.service, "no credentials provided, cancelling request");
                request.cancel();
            }
        }
        Status::Continue
    }

    /// After a successful call: harvest federated-auth cookies.
    pub fn on_success(&self, request: &RequestContext, set_cookies: &[String]) -> Status {
        if set_cookies.is_empty() {
            return Status::Continue;
        }
        let Some(origin) = CookieOrigin::from_url(&request.url) else {
            tracing::error!(url = %request.url, "request url has no host, ignoring cookies");
            return Status::Continue;
        };

        let cookies = cookie::extract(set_cookies, &origin);
        if cookies.is_empty() {
            return Status::Continue;
        }

        let credential = Credential::CookieSet { cookies };
        if !self.connection.set_credential(credential.clone()) {
            return Status::Continue;
        }

        tracing::debug!(service = %request.service, "new federated cookies received");
        self.transport.configure_credentials(&credential);
        let server_uri = self.connection.server_uri();
        if let Err(e) = self.store.set(server_uri, &credential) {
            tracing::warn!(
                server = %server_uri,
                kind = %AuthErrorKind::PersistenceFailed,
                err = %e,
                "could not save federated cookies"
            );
        }
        Status::Continue
    }

    /// After a failed call: classify the failure and, if it is one we can
    /// fix, obtain new credentials. `Complete` asks the transport to retry.
    pub fn on_exception(&self, request: &RequestContext, error: &TransportError) -> Status {
        let prompt_allowed = self.connection.prompt_allowed(&request.service);
        let failure = AuthFailure::classify(error, prompt_allowed);
        tracing::info!(service = %request.service, failure = ?failure, err = %error, "authentication requested");

        if self.baseline.on_exception(&self.connection, self.transport.as_ref(), &failure)
            == Status::Complete
        {
            tracing::debug!("service credentials handled the failure");
            return Status::Complete;
        }

        let current = self.connection.credential();
        let kind = match &failure {
            AuthFailure::Federated { .. } => {
                self.cleanup_saved_credentials();
                if self.settings.legacy_federated {
                    PromptKind::FederatedFallback
                } else {
                    PromptKind::OAuth
                }
            }
            AuthFailure::Unauthorized { prompt_allowed: false } => {
                tracing::debug!(service = %request.service, "service does not prompt for credentials");
                return Status::Continue;
            }
            AuthFailure::Unauthorized { prompt_allowed: true } if current.is_pat() => {
                tracing::info!("personal access token rejected, treating it as expired");
                self.forget_stored();
                PromptKind::OAuth
            }
            AuthFailure::Unauthorized { prompt_allowed: true } => PromptKind::UsernamePassword,
            AuthFailure::FederatedRetryExhausted => {
                self.cleanup_saved_credentials();
                return Status::Continue;
            }
            AuthFailure::Other => {
                tracing::debug!(kind = %AuthErrorKind::ClassificationUnknown, "not an authentication failure we handle");
                return Status::Continue;
            }
        };

        let prompt = PromptRequest {
            server_uri: Some(self.connection.server_uri().clone()),
            current,
            failure: Some(failure),
            message: Some(error.to_string()),
        };
        match self.obtain(kind, prompt) {
            PromptOutcome::Credential(credential) => {
                self.apply(credential);
                Status::Complete
            }
            PromptOutcome::Cancelled => {
                tracing::info!(service = %request.service, kind = %AuthErrorKind::PromptCancelled, "credentials prompt cancelled");
                request.cancel();
                Status::Continue
            }
        }
    }

    fn obtain(&self, kind: PromptKind, request: PromptRequest) -> PromptOutcome {
        let env = PromptEnv {
            interaction: Arc::clone(&self.interaction),
            store: Arc::clone(&self.store),
        };
        self.flight.submit(|id| AuthPrompt::new(id, kind, request, env))
    }

    fn apply(&self, credential: Credential) {
        tracing::debug!(kind = credential.kind(), "applying new credentials");
        self.transport.configure_credentials(&credential);
        self.connection.set_credential(credential);
    }

    fn forget_stored(&self) {
        let server_uri = self.connection.server_uri();
        if let Err(e) = self.store.remove(server_uri) {
            tracing::warn!(
                server = %server_uri,
                kind = %AuthErrorKind::PersistenceFailed,
                err = %e,
                "could not remove stored credentials"
            );
        }
    }

    /// Whatever credentials were used have failed: drop them everywhere.
    fn cleanup_saved_credentials(&self) {
        tracing::debug!(server = %self.connection.server_uri(), "clearing saved credentials");
        self.transport.clear_auth_state();
        self.forget_stored();
        self.connection.set_credential(Credential::PlatformDefault);
        self.transport.configure_credentials(&Credential::PlatformDefault);
        self.clear_browser_sessions();
    }

    /// Browser state belongs to the UI thread. Runs inline there, otherwise
    /// it is queued without waiting.
    fn clear_browser_sessions(&self) {
        let interaction = Arc::clone(&self.interaction);
        let on_ui_thread = self.ui.is_ui_thread();
        let task = Box::new(move || interaction.clear_browser_sessions());
        if let Err(e) = self.ui.run_on_ui_thread(on_ui_thread, task) {
            tracing::warn!(err = %e, "could not clear browser sessions");
        }
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
