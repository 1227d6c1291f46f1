// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn fedauth(name: &str, value: &str) -> Cookie {
    Cookie {
        name: name.to_owned(),
        value: value.to_owned(),
        domain: "tfs.example.com".to_owned(),
        path: "/".to_owned(),
        secure: false,
        max_age: None,
    }
}

#[test]
fn pat_sentinel_username_becomes_pat() {
    let cred = Credential::username_password(PAT_USERNAME, "tok");
    assert_eq!(cred, Credential::pat("tok"));
    assert!(cred.is_pat());
    assert_eq!(cred.basic_parts(), Some((PAT_USERNAME, "tok")));
}

#[yare::parameterized(
    empty_password = { Credential::username_password("alice", ""), true },
    password = { Credential::username_password("alice", "pw"), false },
    empty_pat = { Credential::pat(""), true },
    anonymous = { Credential::Anonymous, false },
    platform = { Credential::PlatformDefault, false },
)]
fn empty_password_detection(cred: Credential, expected: bool) {
    assert_eq!(cred.has_empty_password(), expected);
}

#[test]
fn cookie_sets_compare_structurally() {
    let a = Credential::CookieSet { cookies: vec![fedauth("FedAuth", "abc")] };
    let b = Credential::CookieSet { cookies: vec![fedauth("FedAuth", "abc")] };
    let c = Credential::CookieSet { cookies: vec![fedauth("FedAuth", "xyz")] };
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn cookie_header_terminates_every_value() {
    let cred = Credential::CookieSet {
        cookies: vec![fedauth("FedAuth", "abc"), fedauth("FedAuth1", "def")],
    };
    assert_eq!(
        cred.cookie_header().as_deref(),
        Some("FedAuth=abc; $Path=/; FedAuth1=def; $Path=/")
    );
    assert_eq!(Credential::CookieSet { cookies: vec![] }.cookie_header(), None);
}

#[test]
fn debug_output_redacts_secrets() {
    let rendered = format!(
        "{:?} {:?} {:?}",
        Credential::username_password("alice", "hunter2"),
        Credential::pat("secret-token"),
        Credential::CookieSet { cookies: vec![fedauth("FedAuth", "cookie-secret")] },
    );
    assert!(rendered.contains("alice"));
    assert!(!rendered.contains("hunter2"));
    assert!(!rendered.contains("secret-token"));
    assert!(!rendered.contains("cookie-secret"));
}

#[test]
fn serde_uses_kind_tag() -> anyhow::Result<()> {
    let json = serde_json::to_value(Credential::pat("t"))?;
    assert_eq!(json["kind"], "personal_access_token");
    let back: Credential = serde_json::from_value(json)?;
    assert_eq!(back, Credential::pat("t"));
    Ok(())
}
