//! Identity cookie parsing and `Set-Cookie` construction.

use crate::config::Config;
use axum::http::{header, HeaderMap};

/// Value of cookie `name` from the request's `Cookie` headers,
/// percent-decoded. Empty values count as absent.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim())
        })
        .map(|raw| {
            urlencoding::decode(raw)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| raw.to_string())
        })
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value storing `value` under `name` for the whole site.
pub fn identity_cookie(name: &str, value: &str, config: &Config) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; SameSite=Lax",
        name,
        urlencoding::encode(value)
    );
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that expires `name` immediately.
pub fn cleared_cookie(name: &str, config: &Config) -> String {
    let mut cookie = format!("{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    if let Some(domain) = &config.auth_cookie_domain {
        cookie.push_str("; Domain=");
        cookie.push_str(domain);
    }
    cookie
}
