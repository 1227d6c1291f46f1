// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::cell::Cell;

use super::*;
use crate::prompt::LoginAnswer;
use crate::test_support::{HandlerBuilder, ScriptedInteraction, TestHandler};

const URI: &str = "https://tfs.example.com/tfs/_apis/projects";

fn headers(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs.iter().map(|(n, v)| (n.to_string(), v.to_string())).collect()
}

fn fedauth_headers() -> Vec<(String, String)> {
    headers(&[
        ("X-TFS-FedAuthRedirect", "https%3A%2F%2Flogin.example.com%2Ffedauth%3Fwa%3Dsignin"),
        ("X-TFS-FedAuthIssuer", "https%3A%2F%2Flogin.example.com"),
        ("X-TFS-FedAuthRealm", "https%3A%2F%2Ftfs.example.com%2F"),
        ("WWW-Authenticate", "Bearer"),
        ("WWW-Authenticate", "Basic+realm"),
    ])
}

#[test]
fn success_is_not_classified() {
    assert!(classify_response(URI, 200, &fedauth_headers()).is_none());
    assert!(classify_response(URI, 204, &[]).is_none());
}

#[test]
fn redirect_with_fedauth_headers_is_a_challenge() {
    let Some(TransportError::FederatedAuth(challenge)) = classify_response(URI, 302, &fedauth_headers())
    else {
        panic!("expected a federated challenge");
    };
    assert_eq!(
        challenge.auth_url.as_ref().map(Url::as_str),
        Some("https://login.example.com/fedauth?wa=signin")
    );
    assert_eq!(challenge.issuer.as_deref(), Some("https://login.example.com"));
    assert_eq!(challenge.realm, "https://tfs.example.com/");
    assert_eq!(challenge.mechanisms, ["Bearer", "Basic realm"]);
    assert_eq!(challenge.uri, URI);
}

#[test]
fn location_is_the_fallback_auth_header() {
    let hdrs = headers(&[
        ("location", "https://login.example.com/"),
        ("x-tfs-fedauthissuer", "issuer"),
        ("x-tfs-fedauthrealm", "realm"),
    ]);
    let Some(TransportError::FederatedAuth(challenge)) = classify_response(URI, 302, &hdrs) else {
        panic!("expected a federated challenge");
    };
    assert_eq!(challenge.auth_url.as_ref().map(Url::as_str), Some("https://login.example.com/"));
}

#[test]
fn non_redirect_with_fedauth_headers_is_a_failed_attempt() {
    let mut hdrs = fedauth_headers();
    hdrs.push(("X-TFS-ServiceError".to_owned(), "Cookie+expired".to_owned()));
    let err = classify_response(URI, 401, &hdrs);
    assert!(matches!(
        err,
        Some(TransportError::FederatedAuthFailed { server_error: Some(ref e), ref realm })
            if e == "Cookie expired" && realm == "https://tfs.example.com/"
    ));
}

#[test]
fn missing_realm_is_not_federated() {
    let hdrs = headers(&[("Location", "https://x/"), ("X-TFS-FedAuthIssuer", "i")]);
    assert!(matches!(classify_response(URI, 302, &hdrs), Some(TransportError::Endpoint { status: 302, .. })));
    assert!(matches!(classify_response(URI, 401, &hdrs), Some(TransportError::Unauthorized { .. })));
}

#[test]
fn undecodable_realm_is_not_federated() {
    let hdrs = headers(&[
        ("Location", "https://x/"),
        ("X-TFS-FedAuthIssuer", "i"),
        ("X-TFS-FedAuthRealm", "bad%zz"),
    ]);
    assert!(matches!(classify_response(URI, 401, &hdrs), Some(TransportError::Unauthorized { .. })));
}

#[test]
fn other_statuses_carry_the_service_error() {
    let hdrs = headers(&[("X-TFS-ServiceError", "TF400898%3A+internal+error")]);
    match classify_response(URI, 500, &hdrs) {
        Some(TransportError::Endpoint { status, message, .. }) => {
            assert_eq!(status, 500);
            assert_eq!(message.as_deref(), Some("TF400898: internal error"));
        }
        other => panic!("unexpected classification: {other:?}"),
    }
}

#[yare::parameterized(
    plain = { "abc", Some("abc") },
    plus = { "a+b", Some("a b") },
    escapes = { "a%2Fb%3d", Some("a/b=") },
    escaped_plus = { "1%2B1+%3D+2", Some("1+1 = 2") },
    double_percent = { "%%41", None },
    utf8 = { "caf%C3%A9", Some("café") },
    truncated = { "abc%4", None },
    bad_hex = { "%zz", None },
    bad_utf8 = { "%ff", None },
)]
fn url_decoding(raw: &str, expected: Option<&str>) {
    assert_eq!(url_decode(raw).as_deref(), expected);
}

#[yare::parameterized(
    federated = { TransportError::FederatedAuth(FederatedChallenge {
        uri: URI.to_owned(), auth_url: None, issuer: None, realm: "r".to_owned(),
        mechanisms: Vec::new(), server_error: None,
    }), true, AuthFailure::Federated { auth_url: None } },
    failed = { TransportError::FederatedAuthFailed { server_error: None, realm: "r".to_owned() }, true, AuthFailure::FederatedRetryExhausted },
    unauthorized = { TransportError::Unauthorized { uri: URI.to_owned() }, true, AuthFailure::Unauthorized { prompt_allowed: true } },
    unauthorized_no_prompt = { TransportError::Unauthorized { uri: URI.to_owned() }, false, AuthFailure::Unauthorized { prompt_allowed: false } },
    endpoint = { TransportError::Endpoint { uri: URI.to_owned(), status: 404, message: None }, true, AuthFailure::Other },
    other = { TransportError::Other(anyhow::anyhow!("reset")), true, AuthFailure::Other },
)]
fn failures_classify(error: TransportError, prompt_allowed: bool, expected: AuthFailure) {
    assert_eq!(AuthFailure::classify(&error, prompt_allowed), expected);
}

fn request() -> RequestContext {
    RequestContext::new("projects", Url::parse(URI).unwrap())
}

fn ok(set_cookies: &[&str]) -> Result<Response<&'static str>, TransportError> {
    Ok(Response { set_cookies: set_cookies.iter().map(|s| s.to_string()).collect(), body: "ok" })
}

fn unauthorized() -> Result<Response<&'static str>, TransportError> {
    Err(TransportError::Unauthorized { uri: URI.to_owned() })
}

fn basic_handler(answer: Option<LoginAnswer>) -> TestHandler {
    HandlerBuilder::new()
        .interaction(ScriptedInteraction::new().with_login(answer))
        .build()
        .unwrap()
}

fn answer(username: &str, password: &str) -> Option<LoginAnswer> {
    Some(LoginAnswer { credential: Credential::username_password(username, password), save: false })
}

#[test]
fn success_harvests_fedauth_cookies() {
    let t = basic_handler(None);
    let sends = Cell::new(0);
    let body = execute(&t.handler, &request(), |_| {
        sends.set(sends.get() + 1);
        ok(&["FedAuth=abc; path=/", "ASP.NET_SessionId=x; path=/"])
    });

    assert_eq!(body.unwrap(), "ok");
    assert_eq!(sends.get(), 1);
    let Credential::CookieSet { cookies } = t.handler.connection().credential() else {
        panic!("expected cookies on the connection");
    };
    assert_eq!(cookies.len(), 1);
    assert_eq!(cookies[0].name, "FedAuth");
}

#[test]
fn unauthorized_prompts_then_retries_once() {
    let t = basic_handler(answer("alice", "pw"));
    let sends = Cell::new(0);
    let body = execute(&t.handler, &request(), |_| {
        sends.set(sends.get() + 1);
        if sends.get() == 1 {
            unauthorized()
        } else {
            ok(&[])
        }
    });

    assert_eq!(body.unwrap(), "ok");
    assert_eq!(sends.get(), 2);
    assert_eq!(t.transport.last_configured(), Some(Credential::username_password("alice", "pw")));
}

#[test]
fn second_failure_is_returned_without_another_prompt() {
    let t = basic_handler(answer("alice", "pw"));
    let sends = Cell::new(0);
    let result = execute(&t.handler, &request(), |_| {
        sends.set(sends.get() + 1);
        unauthorized()
    });

    assert!(matches!(result, Err(CallError::Transport(TransportError::Unauthorized { .. }))));
    assert_eq!(sends.get(), 2);
    assert_eq!(t.interaction.prompts_shown(), 1);
}

#[test]
fn cancelled_prompt_cancels_the_call() {
    let t = basic_handler(None);
    let req = request();
    let sends = Cell::new(0);
    let result = execute(&t.handler, &req, |_| {
        sends.set(sends.get() + 1);
        unauthorized()
    });

    assert!(matches!(result, Err(CallError::Cancelled)));
    assert!(req.is_cancelled());
    assert_eq!(sends.get(), 1);
}

#[test]
fn non_auth_failures_propagate_untouched() {
    let t = basic_handler(answer("alice", "pw"));
    let result = execute(&t.handler, &request(), |_| -> Result<Response<()>, _> {
        Err(TransportError::Endpoint { uri: URI.to_owned(), status: 503, message: None })
    });

    assert!(matches!(result, Err(CallError::Transport(TransportError::Endpoint { status: 503, .. }))));
    assert_eq!(t.interaction.prompts_shown(), 0);
}

#[test]
fn empty_password_cancelled_before_sending() {
    let t = HandlerBuilder::new()
        .credential(Credential::username_password("alice", ""))
        .interaction(ScriptedInteraction::new().with_login(None))
        .build()
        .unwrap();
    let sends = Cell::new(0);
    let result = execute(&t.handler, &request(), |_| {
        sends.set(sends.get() + 1);
        ok(&[])
    });

    assert!(matches!(result, Err(CallError::Cancelled)));
    assert_eq!(sends.get(), 0);
    assert_eq!(t.interaction.login_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[test]
fn error_messages_are_readable() {
    let err = TransportError::Unauthorized { uri: URI.to_owned() };
    assert_eq!(err.to_string(), format!("access denied connecting to {URI}"));
    assert_eq!(CallError::Cancelled.to_string(), "request cancelled");
}
