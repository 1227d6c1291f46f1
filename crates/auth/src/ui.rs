// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! UI-thread marshaling.
//!
//! Prompts create UI and must run on the one UI thread. [`UiContext`] is the
//! host toolkit's contract; [`EventLoop`] is a channel-backed implementation
//! for hosts (the CLI, tests) that have no toolkit of their own.

use std::panic::AssertUnwindSafe;
use std::sync::mpsc;
use std::thread::{self, ThreadId};
use std::time::Duration;

use parking_lot::Mutex;

/// Work posted to the UI thread.
pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

pub trait UiContext: Send + Sync {
    fn is_ui_thread(&self) -> bool;

    /// Run `action` on the UI thread. When `blocking`, return only after it ran.
    fn run_on_ui_thread(&self, blocking: bool, action: UiTask) -> anyhow::Result<()>;

    /// Dispatch one pending UI event, or sleep briefly if there is none.
    ///
    /// Only meaningful on the UI thread; other threads just sleep.
    fn pump_or_sleep(&self);
}

/// A single-threaded event queue owned by the thread that created it.
pub struct EventLoop {
    tx: mpsc::Sender<UiTask>,
    rx: Mutex<mpsc::Receiver<UiTask>>,
    ui_thread: ThreadId,
    idle: Duration,
}

impl EventLoop {
    /// Create an event loop whose UI thread is the calling thread.
    pub fn new(idle: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx: Mutex::new(rx), ui_thread: thread::current().id(), idle }
    }

    /// Pump events until `done` returns true. Must be called on the UI thread.
    pub fn run_until(&self, mut done: impl FnMut() -> bool) {
        while !done() {
            self.pump_or_sleep();
        }
    }

    fn dispatch(task: UiTask) {
        if std::panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
            tracing::error!("ui task panicked");
        }
    }
}

impl UiContext for EventLoop {
    fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.ui_thread
    }

    fn run_on_ui_thread(&self, blocking: bool, action: UiTask) -> anyhow::Result<()> {
        if !blocking {
            return self
                .tx
                .send(action)
                .map_err(|_| anyhow::anyhow!("ui event loop has shut down"));
        }

        if self.is_ui_thread() {
            Self::dispatch(action);
            return Ok(());
        }

        let (done_tx, done_rx) = mpsc::sync_channel::<()>(1);
        self.tx
            .send(Box::new(move || {
                action();
                let _ = done_tx.send(());
            }))
            .map_err(|_| anyhow::anyhow!("ui event loop has shut down"))?;
        done_rx.recv().map_err(|_| anyhow::anyhow!("ui task was dropped before it ran"))
    }

    fn pump_or_sleep(&self) {
        if !self.is_ui_thread() {
            thread::sleep(self.idle);
            return;
        }
        // Release the queue before running so the task may pump re-entrantly.
        let next = self.rx.lock().recv_timeout(self.idle);
        if let Ok(task) = next {
            Self::dispatch(task);
        }
    }
}

#[cfg(test)]
#[path = "ui_tests.rs"]
mod tests;
