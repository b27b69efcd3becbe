//! Operation kinds, their default tags, and the decoded reply delivered to
//! listeners.
//!
//! # Design
//! Each tagged operation carries a default tag string so a listener keyed on
//! tags keeps working, while `Response` gives the same reply as a typed
//! variant so callers can `match` instead of comparing strings.

use crate::types::{DbStatus, DocRevision, Document};

pub const DATABASE_CREATE_TAG: &str = "create_database";
pub const DATABASE_DELETE_TAG: &str = "delete_database";
pub const DOC_READ_TAG: &str = "read";
pub const DOC_CREATE_TAG: &str = "create";
pub const DOC_UPDATE_TAG: &str = "update";
pub const DOC_DELETE_TAG: &str = "delete";

/// A listener-visible operation. Login and logout are not tagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateDatabase,
    DeleteDatabase,
    ReadDocument,
    CreateDocument,
    UpdateDocument,
    DeleteDocument,
}

impl Operation {
    pub fn default_tag(&self) -> &'static str {
        match self {
            Operation::CreateDatabase => DATABASE_CREATE_TAG,
            Operation::DeleteDatabase => DATABASE_DELETE_TAG,
            Operation::ReadDocument => DOC_READ_TAG,
            Operation::CreateDocument => DOC_CREATE_TAG,
            Operation::UpdateDocument => DOC_UPDATE_TAG,
            Operation::DeleteDocument => DOC_DELETE_TAG,
        }
    }

    /// The caller's tag override, or this operation's default.
    pub fn resolve_tag(&self, tag: Option<&str>) -> String {
        tag.unwrap_or(self.default_tag()).to_string()
    }
}

/// A decoded successful reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    DatabaseCreated(DbStatus),
    DatabaseDeleted(DbStatus),
    DocumentRead(Document),
    DocumentCreated(DocRevision),
    DocumentUpdated(DocRevision),
    DocumentDeleted(DocRevision),
}

impl Response {
    pub fn operation(&self) -> Operation {
        match self {
            Response::DatabaseCreated(_) => Operation::CreateDatabase,
            Response::DatabaseDeleted(_) => Operation::DeleteDatabase,
            Response::DocumentRead(_) => Operation::ReadDocument,
            Response::DocumentCreated(_) => Operation::CreateDocument,
            Response::DocumentUpdated(_) => Operation::UpdateDocument,
            Response::DocumentDeleted(_) => Operation::DeleteDocument,
        }
    }

    /// The revision carried by document mutations.
    pub fn revision(&self) -> Option<&DocRevision> {
        match self {
            Response::DocumentCreated(r)
            | Response::DocumentUpdated(r)
            | Response::DocumentDeleted(r) => Some(r),
            _ => None,
        }
    }
}

/// What a listener receives for a successful tagged operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub tag: String,
    /// Raw response body as returned by the store.
    pub body: String,
    pub response: Response,
}
