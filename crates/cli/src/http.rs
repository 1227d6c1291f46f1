// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blocking HTTP transport.
//!
//! Redirects are not followed: a 302 carrying federated-auth headers is an
//! authentication challenge, not a page move.

use std::time::Duration;

use base64::Engine;
use parking_lot::RwLock;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use tfauth::credential::Credential;
use tfauth::transport::{classify_response, RequestContext, Response, TransportClient, TransportError};

/// A response that passed classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub status: u16,
    pub body: String,
}

pub struct HttpTransport {
    client: Client,
    credential: RwLock<Credential>,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()?;
        Ok(Self { client, credential: RwLock::new(Credential::PlatformDefault) })
    }

    /// GET the request's URL with the currently configured credentials.
    pub fn send(&self, request: &RequestContext) -> Result<Response<Fetched>, TransportError> {
        let builder = self.authorize(self.client.get(request.url.as_str()));
        let resp = builder.send().map_err(|e| TransportError::Other(e.into()))?;

        let status = resp.status().as_u16();
        let headers: Vec<(String, String)> = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_owned(), value.to_str().ok()?.to_owned())))
            .collect();
        if let Some(err) = classify_response(request.url.as_str(), status, &headers) {
            return Err(err);
        }

        let set_cookies = headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case(SET_COOKIE.as_str()))
            .map(|(_, value)| value.clone())
            .collect();
        let body = resp.text().map_err(|e| TransportError::Other(e.into()))?;
        Ok(Response { set_cookies, body: Fetched { status, body } })
    }

    pub fn credential(&self) -> Credential {
        self.credential.read().clone()
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let credential = self.credential.read();
        if let Some((username, password)) = credential.basic_parts() {
            let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
            return builder.header(AUTHORIZATION, format!("Basic {encoded}"));
        }
        match credential.cookie_header() {
            Some(cookies) => builder.header(COOKIE, cookies),
            None => builder,
        }
    }
}

impl TransportClient for HttpTransport {
    fn configure_credentials(&self, credential: &Credential) {
        tracing::debug!(kind = credential.kind(), "transport credentials updated");
        *self.credential.write() = credential.clone();
    }

    fn clear_auth_state(&self) {
        // Cookies live only in the configured credential; there is no jar.
        *self.credential.write() = Credential::PlatformDefault;
    }
}
