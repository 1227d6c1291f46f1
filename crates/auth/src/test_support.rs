// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: a recording transport, a scripted
//! interaction, and a builder wiring them into a [`RequestHandler`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use url::Url;

use crate::context::ConnectionContext;
use crate::credential::Credential;
use crate::handler::{HandlerParts, HandlerSettings, RequestHandler, ServiceCredentials};
use crate::prompt::{Interaction, LoginAnswer, LoginForm};
use crate::store::{CredentialStore, MemoryStore, StoreError};
use crate::transport::TransportClient;
use crate::ui::EventLoop;

pub const SERVER: &str = "https://tfs.example.com/tfs";

/// Transport that only records what the handler configures on it.
#[derive(Default)]
pub struct RecordingTransport {
    configured: Mutex<Vec<Credential>>,
    clears: AtomicUsize,
}

impl RecordingTransport {
    pub fn configured(&self) -> Vec<Credential> {
        self.configured.lock().clone()
    }

    pub fn last_configured(&self) -> Option<Credential> {
        self.configured.lock().last().cloned()
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl TransportClient for RecordingTransport {
    fn configure_credentials(&self, credential: &Credential) {
        self.configured.lock().push(credential.clone());
    }

    fn clear_auth_state(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

/// Store whose every operation fails, though it claims it can persist.
pub struct FailingStore;

impl FailingStore {
    fn error() -> StoreError {
        StoreError::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "store is read-only"))
    }
}

impl CredentialStore for FailingStore {
    fn get(&self, _: &Url) -> Result<Option<Credential>, StoreError> {
        Err(Self::error())
    }

    fn set(&self, _: &Url, _: &Credential) -> Result<(), StoreError> {
        Err(Self::error())
    }

    fn remove(&self, _: &Url) -> Result<(), StoreError> {
        Err(Self::error())
    }

    fn can_persist(&self) -> bool {
        true
    }
}

/// A latch that holds prompts open until a test releases it.
#[derive(Default)]
pub struct Gate {
    open: Mutex<bool>,
    cv: Condvar,
}

impl Gate {
    pub fn open(&self) {
        *self.open.lock() = true;
        self.cv.notify_all();
    }

    pub fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.cv.wait(&mut open);
        }
    }
}

/// What a username/password dialog was shown with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShownForm {
    pub username: Option<String>,
    pub message: Option<String>,
    pub offer_save: bool,
}

/// Interaction answering from per-flow queues. An exhausted queue answers
/// as if the user dismissed the dialog.
#[derive(Default)]
pub struct ScriptedInteraction {
    oauth: Mutex<VecDeque<Option<Credential>>>,
    federated: Mutex<VecDeque<Option<Credential>>>,
    logins: Mutex<VecDeque<Option<LoginAnswer>>>,
    browser: bool,
    failure: Option<String>,
    gate: Option<Arc<Gate>>,

    pub oauth_calls: AtomicUsize,
    pub federated_calls: AtomicUsize,
    pub login_calls: AtomicUsize,
    pub browser_clears: AtomicUsize,
    clear_threads: Mutex<Vec<ThreadId>>,
    forms: Mutex<Vec<ShownForm>>,
    errors: Mutex<Vec<String>>,
}

impl ScriptedInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_oauth(self, answer: Option<Credential>) -> Self {
        self.oauth.lock().push_back(answer);
        self
    }

    pub fn with_federated(mut self, answer: Option<Credential>) -> Self {
        self.browser = true;
        self.federated.lock().push_back(answer);
        self
    }

    pub fn with_login(self, answer: Option<LoginAnswer>) -> Self {
        self.logins.lock().push_back(answer);
        self
    }

    pub fn with_browser(mut self, available: bool) -> Self {
        self.browser = available;
        self
    }

    /// Every flow returns an error with `message`.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_owned());
        self
    }

    /// Hold every flow until `gate` opens.
    pub fn gated(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn forms(&self) -> Vec<ShownForm> {
        self.forms.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }

    /// Threads `clear_browser_sessions` ran on.
    pub fn clear_threads(&self) -> Vec<ThreadId> {
        self.clear_threads.lock().clone()
    }

    pub fn prompts_shown(&self) -> usize {
        self.oauth_calls.load(Ordering::SeqCst)
            + self.federated_calls.load(Ordering::SeqCst)
            + self.login_calls.load(Ordering::SeqCst)
    }

    fn enter(&self, counter: &AtomicUsize) -> anyhow::Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.wait();
        }
        match &self.failure {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(()),
        }
    }
}

impl Interaction for ScriptedInteraction {
    fn acquire_token_silently(&self, _server_uri: &Url) -> anyhow::Result<Option<Credential>> {
        self.enter(&self.oauth_calls)?;
        Ok(self.oauth.lock().pop_front().flatten())
    }

    fn federated_supported(&self) -> bool {
        self.browser
    }

    fn federated_login(
        &self,
        _server_uri: Option<&Url>,
        _auth_url: &Url,
    ) -> anyhow::Result<Option<Credential>> {
        self.enter(&self.federated_calls)?;
        Ok(self.federated.lock().pop_front().flatten())
    }

    fn request_credentials(&self, form: &LoginForm<'_>) -> anyhow::Result<Option<LoginAnswer>> {
        self.forms.lock().push(ShownForm {
            username: form.username.map(str::to_owned),
            message: form.message.map(str::to_owned),
            offer_save: form.offer_save,
        });
        self.enter(&self.login_calls)?;
        Ok(self.logins.lock().pop_front().flatten())
    }

    fn show_error(&self, title: &str, _message: &str) {
        self.errors.lock().push(title.to_owned());
    }

    fn clear_browser_sessions(&self) {
        self.clear_threads.lock().push(thread::current().id());
        self.browser_clears.fetch_add(1, Ordering::SeqCst);
    }
}

/// Builder for a [`RequestHandler`] whose UI thread is the calling thread.
pub struct HandlerBuilder {
    credential: Credential,
    hints: Vec<(String, bool)>,
    interaction: ScriptedInteraction,
    store: Option<Arc<dyn CredentialStore>>,
    service_credential: Option<Credential>,
    settings: HandlerSettings,
}

impl Default for HandlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerBuilder {
    pub fn new() -> Self {
        Self {
            credential: Credential::PlatformDefault,
            hints: Vec::new(),
            interaction: ScriptedInteraction::new(),
            store: None,
            service_credential: None,
            settings: HandlerSettings::default(),
        }
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    pub fn service_hint(mut self, service: &str, prompt_allowed: bool) -> Self {
        self.hints.push((service.to_owned(), prompt_allowed));
        self
    }

    pub fn interaction(mut self, interaction: ScriptedInteraction) -> Self {
        self.interaction = interaction;
        self
    }

    pub fn store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn service_credential(mut self, credential: Credential) -> Self {
        self.service_credential = Some(credential);
        self
    }

    pub fn legacy_federated(mut self) -> Self {
        self.settings.legacy_federated = true;
        self
    }

    pub fn build(self) -> anyhow::Result<TestHandler> {
        let server = Url::parse(SERVER)?;
        let ui = Arc::new(EventLoop::new(Duration::from_millis(2)));
        let transport = Arc::new(RecordingTransport::default());
        let interaction = Arc::new(self.interaction);
        let store = self.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));

        let mut connection = ConnectionContext::new(server.clone(), self.credential);
        for (service, allowed) in &self.hints {
            connection = connection.with_service_hint(service, *allowed);
        }

        let handler = Arc::new(RequestHandler::new(HandlerParts {
            connection: Arc::new(connection),
            transport: transport.clone(),
            store: Arc::clone(&store),
            interaction: interaction.clone(),
            ui: ui.clone(),
            service_credentials: ServiceCredentials::new(self.service_credential),
            settings: self.settings,
        }));
        Ok(TestHandler { handler, ui, transport, interaction, store, server })
    }
}

pub struct TestHandler {
    pub handler: Arc<RequestHandler>,
    pub ui: Arc<EventLoop>,
    pub transport: Arc<RecordingTransport>,
    pub interaction: Arc<ScriptedInteraction>,
    pub store: Arc<dyn CredentialStore>,
    pub server: Url,
}

impl TestHandler {
    /// Run `work(i)` on `n` worker threads while the calling (UI) thread
    /// pumps events, and collect the results in worker order.
    pub fn run_workers<T, F>(&self, n: usize, work: F) -> anyhow::Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> T + Sync,
    {
        thread::scope(|s| {
            let work = &work;
            let handles: Vec<_> = (0..n).map(|i| s.spawn(move || work(i))).collect();
            self.ui.run_until(|| handles.iter().all(|h| h.is_finished()));
            handles
                .into_iter()
                .map(|h| h.join().map_err(|_| anyhow::anyhow!("worker thread panicked")))
                .collect()
        })
    }

    /// Open `gate` once `waiters` requests are queued behind the in-flight
    /// prompt, or after `timeout` so a broken coordinator cannot hang a test.
    pub fn release_when_waiting(
        &self,
        gate: Arc<Gate>,
        waiters: usize,
        timeout: Duration,
    ) -> thread::JoinHandle<()> {
        let handler = Arc::clone(&self.handler);
        thread::spawn(move || {
            let deadline = Instant::now() + timeout;
            while Instant::now() < deadline {
                if handler.flight().in_flight().is_some_and(|s| s.waiters >= waiters) {
                    break;
                }
                thread::sleep(Duration::from_millis(1));
            }
            gate.open();
        })
    }
}
