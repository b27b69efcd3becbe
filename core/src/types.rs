//! Wire DTOs for the document-store API.
//!
//! # Design
//! Only the envelopes the store itself defines are typed here. Document
//! bodies stay untyped (`Document`) because the client enforces no schema;
//! callers deserialize them into their own records.

use serde::{Deserialize, Serialize};

/// A document as read from the store, including `_id` and `_rev`.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Body of a successful `POST /_session`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginReply {
    #[serde(default = "succeeded")]
    pub ok: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Body of a document create, update or delete.
///
/// `rev` is the revision the caller must thread into the next mutation of
/// the same document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocRevision {
    #[serde(default)]
    pub ok: bool,
    pub id: String,
    pub rev: String,
}

impl Default for LoginReply {
    fn default() -> Self {
        Self {
            ok: true,
            name: None,
            roles: Vec::new(),
        }
    }
}

/// Body of a database create or delete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DbStatus {
    #[serde(default = "succeeded")]
    pub ok: bool,
}

impl Default for DbStatus {
    fn default() -> Self {
        Self { ok: true }
    }
}

/// Envelopes only reach decoding after a 2xx status.
fn succeeded() -> bool {
    true
}
