// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tfauth fetch`: concurrent GETs through one connection and one handler.
//!
//! The calling thread becomes the UI thread and pumps prompts while the
//! worker threads make the requests.

use std::sync::Arc;
use std::thread;

use tfauth::config::AuthConfig;
use tfauth::context::ConnectionContext;
use tfauth::handler::{HandlerParts, RequestHandler, ServiceCredentials};
use tfauth::prompt::Interaction;
use tfauth::store::{CredentialStore, FileStore, MemoryStore};
use tfauth::transport::{execute, RequestContext, TransportClient};
use tfauth::ui::{EventLoop, UiContext};
use url::Url;

use crate::config::FetchArgs;
use crate::http::{Fetched, HttpTransport};

/// Result of one worker's request.
#[derive(Debug)]
pub struct FetchReport {
    pub url: Url,
    pub worker: usize,
    pub result: Result<Fetched, String>,
}

impl FetchReport {
    pub fn line(&self) -> String {
        match &self.result {
            Ok(fetched) => format!("{} {} ({} bytes)", fetched.status, self.url, fetched.body.len()),
            Err(e) => format!("error {}: {e}", self.url),
        }
    }
}

/// The configured store, or an in-memory one.
pub fn open_store(auth: &AuthConfig) -> Arc<dyn CredentialStore> {
    match &auth.credential_store {
        Some(path) => Arc::new(FileStore::new(path)),
        None => Arc::new(MemoryStore::new()),
    }
}

pub fn run(
    auth: &AuthConfig,
    args: &FetchArgs,
    interaction: Arc<dyn Interaction>,
) -> anyhow::Result<Vec<FetchReport>> {
    let store = open_store(auth);
    let server = args.server_uri()?;
    let connection = match args.initial_credential() {
        Some(credential) => ConnectionContext::new(server, credential),
        None => ConnectionContext::load(server, store.as_ref()),
    };
    let connection = Arc::new(auth.apply_hints(connection));

    let transport = Arc::new(HttpTransport::new(args.timeout())?);
    transport.configure_credentials(&connection.credential());

    let ui = Arc::new(EventLoop::new(auth.ui_idle()));
    let ui_context: Arc<dyn UiContext> = ui.clone();
    let handler = RequestHandler::new(HandlerParts {
        connection,
        transport: transport.clone(),
        store,
        interaction,
        ui: ui_context,
        service_credentials: ServiceCredentials::new(auth.service_credential()),
        settings: auth.settings(),
    });

    tracing::info!(
        server = %handler.connection().server_uri(),
        urls = args.urls.len(),
        concurrency = args.concurrency,
        "fetching"
    );

    let reports = thread::scope(|s| {
        let handles: Vec<_> = args
            .urls
            .iter()
            .flat_map(|url| (0..args.concurrency).map(move |worker| (url, worker)))
            .map(|(url, worker)| {
                let handler = &handler;
                let transport = &transport;
                s.spawn(move || {
                    let request = RequestContext::new(args.service.as_str(), url.clone());
                    let result = execute(handler, &request, |r| transport.send(r)).map_err(|e| e.to_string());
                    FetchReport { url: url.clone(), worker, result }
                })
            })
            .collect();
        ui.run_until(|| handles.iter().all(|h| h.is_finished()));
        handles
            .into_iter()
            .map(|h| h.join().map_err(|_| anyhow::anyhow!("fetch worker panicked")))
            .collect::<anyhow::Result<Vec<_>>>()
    })?;

    tracing::info!(prompts = handler.flight().prompts_created(), "fetch finished");
    Ok(reports)
}
