//! Store configuration read from the environment.
//!
//! `DOCSTORE_URL` wins when set; otherwise the endpoint is derived from
//! `DOCSTORE_ACCOUNT` (falling back to the login user) and `DOCSTORE_HOST`.

use std::env;

use crate::client::{DocStoreClient, DEFAULT_HOST};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub url: Option<String>,
    pub account: Option<String>,
    pub host: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            account: None,
            host: DEFAULT_HOST.to_string(),
            user: None,
            password: None,
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            url: get("DOCSTORE_URL"),
            account: get("DOCSTORE_ACCOUNT"),
            host: get("DOCSTORE_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            user: get("DOCSTORE_USER"),
            password: get("DOCSTORE_PASSWORD"),
        }
    }

    /// Endpoint the client should talk to, if one can be determined.
    pub fn base_url(&self) -> Option<String> {
        if let Some(url) = &self.url {
            return Some(url.trim_end_matches('/').to_string());
        }
        self.account
            .as_ref()
            .or(self.user.as_ref())
            .map(|account| format!("https://{account}.{}", self.host))
    }

    pub fn client(&self) -> Option<DocStoreClient> {
        self.base_url().map(|url| DocStoreClient::new(&url))
    }
}
