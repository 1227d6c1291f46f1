// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use proptest::prelude::*;

use super::*;

fn origin() -> CookieOrigin {
    CookieOrigin::new("TFS.example.com", 443)
}

#[test]
fn extract_keeps_only_fedauth_cookies() {
    let headers = ["FedAuth1=abc; Path=/", "SessionID=xyz; Path=/"];
    let cookies = extract(&headers, &origin());
    assert_eq!(cookies.len(), 1);
    assert_eq!(cookies[0].name, "FedAuth1");
    assert_eq!(cookies[0].value, "abc");
    assert_eq!(cookies[0].domain, "tfs.example.com");
    assert_eq!(cookies[0].path, "/");
}

#[test]
fn extract_skips_only_the_malformed_header() {
    let headers = ["FedAuth=abc", "FedAuth1=def; Max-Age=soon", "FedAuth2=ghi"];
    let names: Vec<_> = extract(&headers, &origin()).into_iter().map(|c| c.name).collect();
    assert_eq!(names, ["FedAuth", "FedAuth2"]);
}

#[test]
fn prefix_match_is_case_sensitive() {
    let headers = ["fedauth=abc", "FEDAUTH=def", "FedAuthX=ghi"];
    let names: Vec<_> = extract(&headers, &origin()).into_iter().map(|c| c.name).collect();
    assert_eq!(names, ["FedAuthX"]);
}

#[test]
fn comma_separates_elements() -> anyhow::Result<()> {
    let cookies = parse_set_cookie("FedAuth=a; Version=1, FedAuth1=b; Path=/tfs", &origin())?;
    assert_eq!(cookies.len(), 2);
    assert_eq!(cookies[1].name, "FedAuth1");
    assert_eq!(cookies[1].path, "/tfs");
    Ok(())
}

#[test]
fn expires_keeps_header_as_one_element() -> anyhow::Result<()> {
    let cookies =
        parse_set_cookie("FedAuth=a; expires=Wed, 09 Jun 2021 10:18:14 GMT; secure", &origin())?;
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].secure);
    Ok(())
}

#[yare::parameterized(
    rfc1123 = { "Wed, 09 Jun 2021 10:18:14 GMT" },
    rfc1036 = { "Wednesday, 09-Jun-21 10:18:14 GMT" },
    netscape = { "Wed, 09-Jun-2021 10:18:14 GMT" },
    asctime = { "Wed Jun  9 10:18:14 2021" },
)]
fn expiry_date_formats_are_accepted(date: &str) {
    let header = format!("FedAuth=a; expires={date}; path=/");
    let cookies = parse_set_cookie(&header, &origin()).unwrap();
    assert_eq!(cookies.len(), 1);
    assert_eq!(cookies[0].value, "a");
}

#[test]
fn unparseable_expiry_does_not_merge_elements() {
    // Split at the comma, then the element carrying the bad date fails.
    let result = parse_set_cookie("FedAuth=a, FedAuth1=b; expires=garbage", &origin());
    assert!(result.is_err(), "{result:?}");

    let headers = ["FedAuth=a, FedAuth1=b; expires=garbage", "FedAuth2=c"];
    let cookies = extract(&headers, &origin());
    assert_eq!(cookies.len(), 1);
    assert_eq!(cookies[0].name, "FedAuth2");
    assert_eq!(cookies[0].value, "c");
}

#[test]
fn quoted_values_are_unquoted_and_may_contain_separators() -> anyhow::Result<()> {
    let cookies = parse_set_cookie(r#"FedAuth="a,b;c"; Domain=.Example.com"#, &origin())?;
    assert_eq!(cookies.len(), 1);
    assert_eq!(cookies[0].value, "a,b;c");
    assert_eq!(cookies[0].domain, ".example.com");
    Ok(())
}

#[test]
fn attributes_are_applied() -> anyhow::Result<()> {
    let cookies =
        parse_set_cookie("FedAuth=v; Path=; Max-Age=3600; Comment=hi; Version=1", &origin())?;
    assert_eq!(cookies[0].path, "/");
    assert_eq!(cookies[0].max_age, Some(3600));
    assert!(!cookies[0].secure);
    Ok(())
}

#[yare::parameterized(
    blank_name = { "=abc" },
    dollar_name = { "$Version=1" },
    spaced_name = { "Fed Auth=abc" },
    blank_domain = { "FedAuth=a; Domain=" },
    missing_domain = { "FedAuth=a; Domain" },
    bad_max_age = { "FedAuth=a; Max-Age=never" },
    bad_version = { "FedAuth=a; Version=x" },
    missing_version = { "FedAuth=a; Version" },
    bad_expires = { "FedAuth=a; expires=notadate" },
    missing_expires = { "FedAuth=a; expires" },
)]
fn malformed_headers_are_rejected(header: &str) {
    assert!(parse_set_cookie(header, &origin()).is_err(), "{header} should be rejected");
}

#[yare::parameterized(
    https_default = { "https://tfs.example.com/tfs", 443 },
    http_default = { "http://tfs.example.com/tfs", 80 },
    explicit = { "https://tfs.example.com:8443/tfs", 8443 },
)]
fn origin_port_defaults_by_scheme(url: &str, port: u16) {
    let url = Url::parse(url).unwrap();
    let origin = CookieOrigin::from_url(&url).unwrap();
    assert_eq!(origin.port, port);
    assert_eq!(origin.path, "/");
}

proptest! {
    #[test]
    fn parser_never_panics(header in ".{0,64}") {
        let _ = parse_set_cookie(&header, &origin());
    }

    #[test]
    fn extract_only_returns_prefixed_names(names in proptest::collection::vec("[A-Za-z][A-Za-z0-9]{0,8}", 0..6)) {
        let headers: Vec<String> = names.iter().map(|n| format!("{n}=v; Path=/")).collect();
        let cookies = extract(&headers, &origin());
        let expected = names.iter().filter(|n| n.starts_with(FEDAUTH_PREFIX)).count();
        prop_assert_eq!(cookies.len(), expected);
        prop_assert!(cookies.iter().all(is_federated));
    }
}
