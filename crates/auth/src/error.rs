// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Classes of authentication trouble seen on the request path.
///
/// None of these are fatal to a request: they collapse to "no new
/// credential" at the coordinator boundary and are reported through logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// The user dismissed the prompt.
    PromptCancelled,
    /// The prompt could not be shown or failed internally.
    PromptFailed,
    /// The transport failure is not an authentication failure we handle.
    ClassificationUnknown,
    /// The credential store rejected a write or remove.
    PersistenceFailed,
}

impl AuthErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PromptCancelled => "PROMPT_CANCELLED",
            Self::PromptFailed => "PROMPT_FAILED",
            Self::ClassificationUnknown => "CLASSIFICATION_UNKNOWN",
            Self::PersistenceFailed => "PERSISTENCE_FAILED",
        }
    }
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
