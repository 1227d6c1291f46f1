// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight coordination of credential prompts.
//!
//! The first caller that needs credentials becomes the owner of the slot and
//! launches its prompt on the UI thread. Everyone arriving while the slot is
//! occupied waits for that same prompt. The owner clears the slot once the
//! prompt resolves, so the next failure starts a fresh prompt.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::AuthErrorKind;
use crate::prompt::{AuthPrompt, PromptKind, PromptOutcome};
use crate::ui::UiContext;

struct Slot {
    prompt: Arc<AuthPrompt>,
    waiters: usize,
}

/// Point-in-time view of an occupied slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSnapshot {
    pub prompt_id: u64,
    pub kind: PromptKind,
    pub waiters: usize,
    pub resolved: bool,
}

pub struct SingleFlight {
    ui: Arc<dyn UiContext>,
    slot: Mutex<Option<Slot>>,
    created: AtomicU64,
}

impl SingleFlight {
    pub fn new(ui: Arc<dyn UiContext>) -> Self {
        Self { ui, slot: Mutex::new(None), created: AtomicU64::new(0) }
    }

    /// Obtain a prompt outcome, running `factory`'s prompt only if no other
    /// prompt is in flight. Callable from any thread, including the UI thread.
    pub fn submit(&self, factory: impl FnOnce(u64) -> AuthPrompt) -> PromptOutcome {
        let (prompt, owner) = {
            let mut slot = self.slot.lock();
            match slot.as_mut() {
                Some(occupied) => {
                    occupied.waiters += 1;
                    (Arc::clone(&occupied.prompt), false)
                }
                None => {
                    let id = self.created.fetch_add(1, Ordering::Relaxed) + 1;
                    let prompt = Arc::new(factory(id));
                    *slot = Some(Slot { prompt: Arc::clone(&prompt), waiters: 0 });
                    (prompt, true)
                }
            }
        };

        if !owner {
            tracing::debug!(prompt_id = prompt.id(), "waiting for credential prompt in flight");
            let outcome = self.await_outcome(&prompt);
            self.leave(prompt.id());
            return outcome;
        }

        let _clear = ClearSlot { flight: self, prompt_id: prompt.id() };
        let task = Arc::clone(&prompt);
        if let Err(e) = self.ui.run_on_ui_thread(false, Box::new(move || task.run())) {
            tracing::warn!(
                prompt_id = prompt.id(),
                kind = %AuthErrorKind::PromptFailed,
                err = %e,
                "could not schedule credential prompt"
            );
            prompt.cancel();
        }
        self.await_outcome(&prompt)
    }

    /// The in-flight prompt, if any.
    pub fn in_flight(&self) -> Option<SlotSnapshot> {
        self.slot.lock().as_ref().map(|s| SlotSnapshot {
            prompt_id: s.prompt.id(),
            kind: s.prompt.kind(),
            waiters: s.waiters,
            resolved: s.prompt.is_complete(),
        })
    }

    /// Number of prompt instances created so far.
    pub fn prompts_created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    fn await_outcome(&self, prompt: &AuthPrompt) -> PromptOutcome {
        if !self.ui.is_ui_thread() {
            return prompt.wait();
        }
        // Blocking here would starve the prompt of the UI thread it runs on.
        loop {
            if let Some(outcome) = prompt.outcome() {
                return outcome;
            }
            self.ui.pump_or_sleep();
        }
    }

    fn leave(&self, prompt_id: u64) {
        let mut slot = self.slot.lock();
        if let Some(occupied) = slot.as_mut().filter(|s| s.prompt.id() == prompt_id) {
            occupied.waiters = occupied.waiters.saturating_sub(1);
        }
    }
}

/// Clears the owner's slot on every exit path.
struct ClearSlot<'a> {
    flight: &'a SingleFlight,
    prompt_id: u64,
}

impl Drop for ClearSlot<'_> {
    fn drop(&mut self) {
        let mut slot = self.flight.slot.lock();
        if let Some(occupied) = slot.as_ref().filter(|s| s.prompt.id() == self.prompt_id) {
            occupied.prompt.cancel();
            tracing::debug!(
                prompt_id = self.prompt_id,
                waiters = occupied.waiters,
                "credential prompt resolved"
            );
            *slot = None;
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
