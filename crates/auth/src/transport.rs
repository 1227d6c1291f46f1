// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The transport side of the request lifecycle: raw failures, their
//! classification, and the hook-driving call loop.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use url::Url;

use crate::credential::Credential;
use crate::handler::RequestHandler;

const FEDAUTH_REDIRECT: &str = "X-TFS-FedAuthRedirect";
const FEDAUTH_ISSUER: &str = "X-TFS-FedAuthIssuer";
const FEDAUTH_REALM: &str = "X-TFS-FedAuthRealm";
const SERVICE_ERROR: &str = "X-TFS-ServiceError";

/// Verdict of a lifecycle hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Proceed normally: send the request, or propagate the original result.
    Continue,
    /// The failure was handled; retry the call with the updated credentials.
    Complete,
}

/// The live credential configuration of an HTTP client.
pub trait TransportClient: Send + Sync {
    /// Apply `credential` to all subsequent outgoing requests.
    fn configure_credentials(&self, credential: &Credential);
    /// Drop the cookie jar and any credentials cached by the client.
    fn clear_auth_state(&self);
}

/// One in-flight web-service call.
#[derive(Debug)]
pub struct RequestContext {
    pub service: String,
    pub url: Url,
    cancelled: AtomicBool,
}

impl RequestContext {
    pub fn new(service: impl Into<String>, url: Url) -> Self {
        Self { service: service.into(), url, cancelled: AtomicBool::new(false) }
    }

    /// Mark the call cancelled; the transport must not send or retry it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Details of a federated-auth redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedChallenge {
    pub uri: String,
    pub auth_url: Option<Url>,
    pub issuer: Option<String>,
    pub realm: String,
    pub mechanisms: Vec<String>,
    pub server_error: Option<String>,
}

/// A failed call as reported by the transport.
#[derive(Debug)]
pub enum TransportError {
    /// The server redirected to a federated login.
    FederatedAuth(FederatedChallenge),
    /// Federated cookies were presented and rejected.
    FederatedAuthFailed { server_error: Option<String>, realm: String },
    Unauthorized { uri: String },
    Endpoint { uri: String, status: u16, message: Option<String> },
    Other(anyhow::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FederatedAuth(c) => match &c.auth_url {
                Some(url) => write!(f, "federated authentication required at {url}"),
                None => write!(f, "federated authentication required for realm {}", c.realm),
            },
            Self::FederatedAuthFailed { server_error: Some(e), .. } => {
                write!(f, "federated authentication failed: {e}")
            }
            Self::FederatedAuthFailed { realm, .. } => {
                write!(f, "federated authentication failed for realm {realm}")
            }
            Self::Unauthorized { uri } => write!(f, "access denied connecting to {uri}"),
            Self::Endpoint { uri, status, message: Some(m) } => {
                write!(f, "{uri} returned {status}: {m}")
            }
            Self::Endpoint { uri, status, message: None } => {
                write!(f, "web service {uri} could not be contacted ({status})")
            }
            Self::Other(e) => write!(f, "{e:#}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// An authentication failure, derived once per failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    Federated { auth_url: Option<Url> },
    Unauthorized { prompt_allowed: bool },
    /// Stored federated cookies are corrupt or expired.
    FederatedRetryExhausted,
    Other,
}

impl AuthFailure {
    pub fn classify(error: &TransportError, prompt_allowed: bool) -> Self {
        match error {
            TransportError::FederatedAuth(c) => Self::Federated { auth_url: c.auth_url.clone() },
            TransportError::FederatedAuthFailed { .. } => Self::FederatedRetryExhausted,
            TransportError::Unauthorized { .. } => Self::Unauthorized { prompt_allowed },
            TransportError::Endpoint { .. } | TransportError::Other(_) => Self::Other,
        }
    }
}

/// Turn a non-success HTTP response into a [`TransportError`].
///
/// Returns `None` for 2xx responses. `headers` are `(name, value)` pairs;
/// names match case-insensitively.
pub fn classify_response(
    uri: &str,
    status: u16,
    headers: &[(String, String)],
) -> Option<TransportError> {
    if (200..300).contains(&status) {
        return None;
    }

    let header = |name: &str| {
        headers.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    };
    let decoded = |name: &str| {
        header(name).and_then(|raw| {
            let value = url_decode(raw);
            if value.is_none() {
                tracing::warn!(header = name, "could not decode federated authentication header");
            }
            value
        })
    };

    let auth_header =
        if header(FEDAUTH_REDIRECT).is_some() { FEDAUTH_REDIRECT } else { "Location" };
    let server_error = decoded(SERVICE_ERROR);

    if header(auth_header).is_some()
        && header(FEDAUTH_ISSUER).is_some()
        && header(FEDAUTH_REALM).is_some()
    {
        if let (Some(auth_url), Some(realm)) = (decoded(auth_header), decoded(FEDAUTH_REALM)) {
            if status == 302 {
                let mechanisms = headers
                    .iter()
                    .filter(|(n, _)| n.eq_ignore_ascii_case("WWW-Authenticate"))
                    .filter_map(|(_, v)| url_decode(v))
                    .collect();
                let parsed = Url::parse(&auth_url)
                    .map_err(|e| {
                        tracing::warn!(err = %e, "federated authentication url is not a valid url");
                    })
                    .ok();
                return Some(TransportError::FederatedAuth(FederatedChallenge {
                    uri: uri.to_owned(),
                    auth_url: parsed,
                    issuer: decoded(FEDAUTH_ISSUER),
                    realm,
                    mechanisms,
                    server_error,
                }));
            }
            return Some(TransportError::FederatedAuthFailed { server_error, realm });
        }
    }

    if status == 401 {
        return Some(TransportError::Unauthorized { uri: uri.to_owned() });
    }
    Some(TransportError::Endpoint { uri: uri.to_owned(), status, message: server_error })
}

/// Decode `application/x-www-form-urlencoded` text. Malformed `%` escapes
/// and invalid UTF-8 are rejected rather than passed through.
fn url_decode(s: &str) -> Option<String> {
    let well_formed = s
        .split('%')
        .skip(1)
        .all(|rest| rest.as_bytes().get(..2).is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)));
    if !well_formed {
        return None;
    }
    urlencoding::decode(&s.replace('+', " ")).ok().map(|decoded| decoded.into_owned())
}

/// A successful transport response.
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// Raw `Set-Cookie` header values.
    pub set_cookies: Vec<String>,
    pub body: T,
}

/// Why [`execute`] did not produce a response.
#[derive(Debug)]
pub enum CallError {
    /// Cancelled by the user; never retried.
    Cancelled,
    Transport(TransportError),
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("request cancelled"),
            Self::Transport(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for CallError {}

/// Run one call through the request lifecycle hooks.
///
/// `send` performs the request with whatever credentials the transport is
/// currently configured with. A `Complete` verdict retries exactly once; a
/// second failure is returned as-is.
pub fn execute<T>(
    handler: &RequestHandler,
    request: &RequestContext,
    mut send: impl FnMut(&RequestContext) -> Result<Response<T>, TransportError>,
) -> Result<T, CallError> {
    handler.prepare(request);
    if request.is_cancelled() {
        return Err(CallError::Cancelled);
    }

    let error = match send(request) {
        Ok(response) => {
            handler.on_success(request, &response.set_cookies);
            return Ok(response.body);
        }
        Err(e) => e,
    };

    match handler.on_exception(request, &error) {
        Status::Complete => {
            tracing::debug!(service = %request.service, url = %request.url, "retrying with new credentials");
            let response = send(request).map_err(CallError::Transport)?;
            handler.on_success(request, &response.set_cookies);
            Ok(response.body)
        }
        Status::Continue if request.is_cancelled() => Err(CallError::Cancelled),
        Status::Continue => Err(CallError::Transport(error)),
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
