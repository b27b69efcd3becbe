//! Error types for the document-store client.
//!
//! # Design
//! The store's status codes that callers act on get their own variants:
//! `NotFound`, `Conflict` (stale `_rev`) and `Unauthorized` (missing or
//! expired session). All other non-2xx responses land in `HttpError` with the
//! raw status and body. `Transport` covers failures where no response was
//! received at all.

use thiserror::Error;

/// Errors returned by `DocStoreClient` and `Dispatcher`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 404: the database or document does not exist.
    #[error("resource not found")]
    NotFound,

    /// 409: the supplied revision is not the latest one for the document.
    #[error("document update conflict")]
    Conflict,

    /// 401/403: no valid session cookie accompanied the request.
    #[error("unauthorized")]
    Unauthorized,

    /// Any other non-2xx status.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// Login answered 200 but carried no `set-cookie` header.
    #[error("login response carried no session cookie")]
    MissingCookie,

    /// A mandatory argument was empty.
    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The document could not be serialized to a JSON object.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The request never produced a response.
    #[error("transport failed: {0}")]
    Transport(String),
}

impl ApiError {
    /// HTTP status associated with this error, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound => Some(404),
            ApiError::Conflict => Some(409),
            ApiError::Unauthorized => Some(401),
            ApiError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }
}
