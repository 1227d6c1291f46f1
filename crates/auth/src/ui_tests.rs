// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;

const IDLE: Duration = Duration::from_millis(5);

#[test]
fn creating_thread_is_the_ui_thread() {
    let ui = EventLoop::new(IDLE);
    assert!(ui.is_ui_thread());
    thread::scope(|s| {
        s.spawn(|| assert!(!ui.is_ui_thread()));
    });
}

#[test]
fn posted_tasks_run_in_order_when_pumped() -> anyhow::Result<()> {
    let ui = EventLoop::new(IDLE);
    let log = Arc::new(Mutex::new(Vec::new()));
    for i in 0..3 {
        let log = Arc::clone(&log);
        ui.run_on_ui_thread(false, Box::new(move || log.lock().push(i)))?;
    }
    assert!(log.lock().is_empty(), "non-blocking posts must not run inline");

    ui.run_until(|| log.lock().len() == 3);
    assert_eq!(*log.lock(), [0, 1, 2]);
    Ok(())
}

#[test]
fn blocking_run_from_ui_thread_is_inline() -> anyhow::Result<()> {
    let ui = EventLoop::new(IDLE);
    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    ui.run_on_ui_thread(true, Box::new(move || flag.store(true, Ordering::SeqCst)))?;
    assert!(ran.load(Ordering::SeqCst));
    Ok(())
}

#[test]
fn blocking_run_from_worker_waits_for_the_pump() {
    let ui = EventLoop::new(IDLE);
    let counter = Arc::new(AtomicUsize::new(0));
    let finished = AtomicBool::new(false);

    thread::scope(|s| {
        s.spawn(|| {
            let c = Arc::clone(&counter);
            let result =
                ui.run_on_ui_thread(true, Box::new(move || { c.fetch_add(1, Ordering::SeqCst); }));
            assert!(result.is_ok());
            // The task has run by the time the blocking call returns.
            assert_eq!(counter.load(Ordering::SeqCst), 1);
            finished.store(true, Ordering::SeqCst);
        });
        ui.run_until(|| finished.load(Ordering::SeqCst));
    });
}

#[test]
fn panicking_task_does_not_stop_the_loop() -> anyhow::Result<()> {
    let ui = EventLoop::new(IDLE);
    let ran = Arc::new(AtomicBool::new(false));
    ui.run_on_ui_thread(false, Box::new(|| panic!("boom")))?;
    let flag = Arc::clone(&ran);
    ui.run_on_ui_thread(false, Box::new(move || flag.store(true, Ordering::SeqCst)))?;
    ui.run_until(|| ran.load(Ordering::SeqCst));
    Ok(())
}
