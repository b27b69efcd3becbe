//! Session cookie captured at login and replayed on every later request.

use crate::http::HttpResponse;

/// Authentication state owned by one client instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    cookie: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session seeded with a cookie obtained elsewhere (e.g. restored by a host).
    pub fn with_cookie(cookie: impl Into<String>) -> Self {
        Self {
            cookie: Some(cookie.into()),
        }
    }

    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.cookie.is_some()
    }

    /// Store the first `set-cookie` header of `response`, keeping only its
    /// `name=value` pair. Returns whether a cookie was found.
    pub fn capture(&mut self, response: &HttpResponse) -> bool {
        match response.header("set-cookie").and_then(cookie_pair) {
            Some(pair) => {
                self.cookie = Some(pair);
                true
            }
            None => false,
        }
    }
}

/// `AuthSession=abc; Version=1; Path=/` -> `AuthSession=abc`.
fn cookie_pair(set_cookie: &str) -> Option<String> {
    let pair = set_cookie.split(';').next()?.trim();
    if pair.is_empty() || !pair.contains('=') {
        return None;
    }
    Some(pair.to_string())
}
