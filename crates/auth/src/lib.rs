// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tfauth: transport-level authentication retry coordination.
//!
//! The transport calls into a [`handler::RequestHandler`] around every
//! web-service request. Authentication failures are classified, a single
//! interactive prompt is driven per connection no matter how many requests
//! are waiting on it, and the resulting credential is fed back into the
//! transport so the failed call can be retried.

pub mod config;
pub mod context;
pub mod cookie;
pub mod coordinator;
pub mod credential;
pub mod error;
pub mod handler;
pub mod prompt;
pub mod store;
pub mod test_support;
pub mod transport;
pub mod ui;
