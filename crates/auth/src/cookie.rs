// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RFC 2109 `Set-Cookie` parsing and federated-auth cookie extraction.

use std::fmt;

use chrono::{DateTime, NaiveDateTime};
use url::Url;

use crate::credential::Cookie;

/// Name prefix of the session cookies issued by federated authentication.
pub const FEDAUTH_PREFIX: &str = "FedAuth";

/// The request a `Set-Cookie` header arrived on.
///
/// Federated-auth cookies carry no attributes, so the origin supplies the
/// domain and path every parsed cookie defaults to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOrigin {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl CookieOrigin {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_lowercase(), port, path: "/".to_owned() }
    }

    /// Origin for a request URL, with the port defaulted by scheme.
    pub fn from_url(url: &Url) -> Option<Self> {
        let host = url.host_str()?;
        let port = url.port().unwrap_or_else(|| default_port(url.scheme()));
        Some(Self::new(host, port))
    }
}

/// Default port for a scheme: 443 for `https`, 80 for everything else.
pub fn default_port(scheme: &str) -> u16 {
    if scheme.eq_ignore_ascii_case("https") {
        443
    } else {
        80
    }
}

/// A `Set-Cookie` value that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieParseError {
    pub message: String,
}

impl CookieParseError {
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl fmt::Display for CookieParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed cookie: {}", self.message)
    }
}

impl std::error::Error for CookieParseError {}

pub fn is_federated(cookie: &Cookie) -> bool {
    cookie.name.starts_with(FEDAUTH_PREFIX)
}

/// Parse every header and keep the federated-auth cookies.
///
/// A header that fails to parse is logged and skipped; the others are
/// unaffected.
pub fn extract<S: AsRef<str>>(headers: &[S], origin: &CookieOrigin) -> Vec<Cookie> {
    let mut found = Vec::new();
    for header in headers {
        let header = header.as_ref();
        match parse_set_cookie(header, origin) {
            Ok(cookies) => found.extend(cookies.into_iter().filter(is_federated)),
            Err(e) => {
                tracing::warn!(host = %origin.host, port = origin.port, err = %e, "could not parse authentication cookie");
            }
        }
    }
    found
}

/// Parse one `Set-Cookie` header value according to RFC 2109.
pub fn parse_set_cookie(header: &str, origin: &CookieOrigin) -> Result<Vec<Cookie>, CookieParseError> {
    // A valid expires date contains a comma, so such headers are one element.
    let elements = if has_expiry_date(header) { vec![header] } else { split_unquoted(header, ',') };

    let mut cookies = Vec::with_capacity(elements.len());
    for element in elements {
        if element.trim().is_empty() {
            continue;
        }
        cookies.push(parse_element(element, origin)?);
    }
    Ok(cookies)
}

fn parse_element(element: &str, origin: &CookieOrigin) -> Result<Cookie, CookieParseError> {
    let mut parts = split_unquoted(element, ';').into_iter();
    let head = parts.next().unwrap_or_default();
    let (name, value) = split_pair(head);
    validate_name(name)?;

    let mut cookie = Cookie {
        name: name.to_owned(),
        value: value.map(unquote).unwrap_or_default().to_owned(),
        domain: origin.host.clone(),
        path: origin.path.clone(),
        secure: false,
        max_age: None,
    };

    for attr in parts {
        let (attr_name, attr_value) = split_pair(attr);
        let attr_value = attr_value.map(unquote);
        match attr_name.to_ascii_lowercase().as_str() {
            "" => {}
            "path" => {
                cookie.path = match attr_value {
                    Some(p) if !p.is_empty() => p.to_owned(),
                    _ => "/".to_owned(),
                };
            }
            "domain" => match attr_value {
                None => return Err(CookieParseError::new("missing value for domain attribute")),
                Some("") => return Err(CookieParseError::new("blank value for domain attribute")),
                Some(d) => cookie.domain = d.to_lowercase(),
            },
            "max-age" => {
                let raw = attr_value
                    .ok_or_else(|| CookieParseError::new("missing value for max-age attribute"))?;
                let age = raw
                    .parse::<i64>()
                    .map_err(|_| CookieParseError::new(format!("invalid max-age attribute: {raw}")))?;
                cookie.max_age = Some(age);
            }
            "version" => {
                let raw = attr_value
                    .ok_or_else(|| CookieParseError::new("missing value for version attribute"))?;
                raw.parse::<u32>()
                    .map_err(|_| CookieParseError::new(format!("invalid version: {raw}")))?;
            }
            "secure" => cookie.secure = true,
            "expires" => {
                let raw = attr_value
                    .ok_or_else(|| CookieParseError::new("missing value for expires attribute"))?;
                parse_http_date(raw).ok_or_else(|| {
                    CookieParseError::new(format!("unable to parse expiration date: {raw}"))
                })?;
            }
            // comment and unknown attributes carry nothing we keep
            _ => {}
        }
    }

    Ok(cookie)
}

/// Whether the header has an `expires=` attribute whose value is a date.
fn has_expiry_date(header: &str) -> bool {
    const ATTR: &str = "expires=";
    let Some(start) = header.to_ascii_lowercase().find(ATTR).map(|i| i + ATTR.len()) else {
        return false;
    };
    let rest = &header[start..];
    let value = rest.split(';').next().unwrap_or_default();
    parse_http_date(unquote(value.trim())).is_some()
}

/// Date formats seen in `expires`: RFC 1123, RFC 1036, asctime and the
/// Netscape draft's dashed form.
const DATE_FORMATS: &[&str] = &[
    "%a, %d %b %Y %H:%M:%S",
    "%A, %d-%b-%y %H:%M:%S",
    "%a, %d-%b-%Y %H:%M:%S",
    "%a %b %e %H:%M:%S %Y",
];

fn parse_http_date(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(date) = DateTime::parse_from_rfc2822(raw) {
        return Some(date.naive_utc());
    }
    let raw = raw.trim();
    let local = raw.strip_suffix("GMT").or_else(|| raw.strip_suffix("UTC")).unwrap_or(raw).trim_end();
    DATE_FORMATS.iter().find_map(|fmt| NaiveDateTime::parse_from_str(local, fmt).ok())
}

fn validate_name(name: &str) -> Result<(), CookieParseError> {
    if name.is_empty() {
        return Err(CookieParseError::new("cookie name may not be blank"));
    }
    if name.contains(char::is_whitespace) {
        return Err(CookieParseError::new("cookie name may not contain blanks"));
    }
    if name.starts_with('$') {
        return Err(CookieParseError::new("cookie name may not start with $"));
    }
    Ok(())
}

/// Split `name=value` at the first `=`, trimming both sides.
fn split_pair(s: &str) -> (&str, Option<&str>) {
    match s.split_once('=') {
        Some((name, value)) => (name.trim(), Some(value.trim())),
        None => (s.trim(), None),
    }
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')).unwrap_or(s)
}

/// Split on `sep`, ignoring separators inside double quotes.
fn split_unquoted(s: &str, sep: char) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (i, c) in s.char_indices() {
        if c == '"' {
            quoted = !quoted;
        } else if c == sep && !quoted {
            out.push(&s[start..i]);
            start = i + c.len_utf8();
        }
    }
    out.push(&s[start..]);
    out
}

#[cfg(test)]
#[path = "cookie_tests.rs"]
mod tests;
