// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential model shared by the store, the prompts and the transport.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Username that marks a username/password pair as a personal access token.
pub const PAT_USERNAME: &str = "_PersonalAccessToken";

/// A single HTTP cookie as parsed from a `Set-Cookie` header.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,
}

impl Cookie {
    /// Render this cookie for a `Cookie` request header.
    ///
    /// The path attribute is always emitted so the value is terminated by a
    /// semicolon; the server rejects bare base64 values otherwise.
    pub fn to_request_pair(&self) -> String {
        format!("{}={}; $Path={}", self.name, self.value, self.path)
    }
}

impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cookie")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .field("domain", &self.domain)
            .field("path", &self.path)
            .field("secure", &self.secure)
            .finish()
    }
}

/// Authentication material configured on a connection.
///
/// Equality is structural and is what decides whether an authentication
/// state change needs to be pushed to the transport and persisted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Credential {
    Anonymous,
    UsernamePassword { username: String, password: String },
    /// Sent on the wire as a username/password pair with [`PAT_USERNAME`].
    PersonalAccessToken { token: String },
    CookieSet { cookies: Vec<Cookie> },
    /// Integrated platform authentication (NTLM/Kerberos of the current user).
    PlatformDefault,
}

impl Credential {
    /// Build a username/password credential, recognising the PAT sentinel.
    pub fn username_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        let username = username.into();
        let password = password.into();
        if username == PAT_USERNAME {
            Self::PersonalAccessToken { token: password }
        } else {
            Self::UsernamePassword { username, password }
        }
    }

    pub fn pat(token: impl Into<String>) -> Self {
        Self::PersonalAccessToken { token: token.into() }
    }

    /// Short, secret-free name of the variant for logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::UsernamePassword { .. } => "username_password",
            Self::PersonalAccessToken { .. } => "personal_access_token",
            Self::CookieSet { .. } => "cookie_set",
            Self::PlatformDefault => "platform_default",
        }
    }

    pub fn is_pat(&self) -> bool {
        matches!(self, Self::PersonalAccessToken { .. })
    }

    /// A username/password pair with an empty password can never succeed.
    pub fn has_empty_password(&self) -> bool {
        match self {
            Self::UsernamePassword { password, .. } => password.is_empty(),
            Self::PersonalAccessToken { token } => token.is_empty(),
            _ => false,
        }
    }

    /// Username/password as sent via HTTP basic authentication.
    pub fn basic_parts(&self) -> Option<(&str, &str)> {
        match self {
            Self::UsernamePassword { username, password } => Some((username, password)),
            Self::PersonalAccessToken { token } => Some((PAT_USERNAME, token)),
            _ => None,
        }
    }

    /// The username to pre-fill in a credential prompt.
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::UsernamePassword { username, .. } => Some(username),
            _ => None,
        }
    }

    /// Value for a `Cookie` request header, if this is a cookie credential.
    pub fn cookie_header(&self) -> Option<String> {
        match self {
            Self::CookieSet { cookies } if !cookies.is_empty() => Some(
                cookies.iter().map(Cookie::to_request_pair).collect::<Vec<_>>().join("; "),
            ),
            _ => None,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::UsernamePassword { username, .. } => f
                .debug_struct("UsernamePassword")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::PersonalAccessToken { .. } => {
                f.debug_struct("PersonalAccessToken").field("token", &"<redacted>").finish()
            }
            Self::CookieSet { cookies } => {
                f.debug_struct("CookieSet").field("cookies", cookies).finish()
            }
            Self::PlatformDefault => f.write_str("PlatformDefault"),
        }
    }
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
