//! HTTP request builder and response parser for the document-store API.
//!
//! # Design
//! `DocStoreClient` holds the store endpoint and the `Session`. Each
//! operation is split into a `build_*` method that produces an `HttpRequest`
//! and a parse method that consumes the `HttpResponse`. The caller executes
//! the actual HTTP round-trip, keeping the client free of I/O.
//!
//! The session sits behind a `RwLock` so one client can be shared between
//! in-flight requests; `parse_login` is the only writer.

use std::sync::{PoisonError, RwLock};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::operation::{Operation, Response};
use crate::session::Session;
use crate::types::{DbStatus, DocRevision, Document, LoginReply};

pub const DEFAULT_HOST: &str = "cloudant.com";

const SESSION_PATH: &str = "_session";
const JSON: &str = "application/json";
const FORM: &str = "application/x-www-form-urlencoded";

/// Unreserved characters stay; everything else in a database name, document
/// id or revision is escaped. `/` is escaped too so `_design/x` stays one
/// segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn encode(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Client for one store endpoint and one session.
#[derive(Debug)]
pub struct DocStoreClient {
    base_url: String,
    session: RwLock<Session>,
}

impl DocStoreClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_session(base_url, Session::new())
    }

    /// Client for a hosted account: `https://<account>.<host>`.
    pub fn for_account(account: &str, host: &str) -> Self {
        Self::new(&format!("https://{account}.{host}"))
    }

    pub fn with_session(base_url: &str, session: Session) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            session: RwLock::new(session),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    pub fn build_login(&self, name: &str, password: &str) -> HttpRequest {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("name", name)
            .append_pair("password", password)
            .finish();
        HttpRequest {
            method: HttpMethod::Post,
            url: self.url(&[SESSION_PATH]),
            headers: vec![("content-type".to_string(), FORM.to_string())],
            body: Some(body),
        }
    }

    /// Parse a login response and store the session cookie it carries.
    pub fn parse_login(&self, response: HttpResponse) -> Result<LoginReply, ApiError> {
        check_status(&response)?;
        let captured = self
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .capture(&response);
        if !captured {
            return Err(ApiError::MissingCookie);
        }
        debug!(base_url = %self.base_url, "session cookie captured");
        match serde_json::from_str(&response.body) {
            Ok(reply) => Ok(reply),
            Err(e) => {
                if !response.body.trim().is_empty() {
                    debug!("login body is not a session reply: {e}");
                }
                Ok(LoginReply::default())
            }
        }
    }

    pub fn build_logout(&self) -> HttpRequest {
        self.request(HttpMethod::Delete, self.url(&[SESSION_PATH]), None)
    }

    pub fn parse_logout(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    // -----------------------------------------------------------------------
    // Databases
    // -----------------------------------------------------------------------

    pub fn build_create_database(&self, name: &str) -> HttpRequest {
        self.request(HttpMethod::Put, self.url(&[name]), None)
    }

    pub fn build_delete_database(&self, name: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, self.url(&[name]), None)
    }

    // -----------------------------------------------------------------------
    // Documents
    // -----------------------------------------------------------------------

    pub fn build_read_document(&self, database: &str, id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, self.url(&[database, id]), None)
    }

    /// Serialize `item` and build the insert request. `item` must serialize
    /// to a JSON object; a `serde_json::Value` object is sent as is.
    pub fn build_create_document<T>(&self, database: &str, item: &T) -> Result<HttpRequest, ApiError>
    where
        T: Serialize + ?Sized,
    {
        let body = to_json_object(item)?;
        Ok(self.request(HttpMethod::Post, self.url(&[database]), Some(body)))
    }

    pub fn build_update_document<T>(
        &self,
        database: &str,
        item: &T,
        id: &str,
        rev: &str,
    ) -> Result<HttpRequest, ApiError>
    where
        T: Serialize + ?Sized,
    {
        let url = self.revision_url(database, id, rev)?;
        let body = to_json_object(item)?;
        Ok(self.request(HttpMethod::Put, url, Some(body)))
    }

    pub fn build_delete_document(&self, database: &str, id: &str, rev: &str) -> Result<HttpRequest, ApiError> {
        let url = self.revision_url(database, id, rev)?;
        Ok(self.request(HttpMethod::Delete, url, None))
    }

    /// Decode the response of any tagged operation into its `Response` variant.
    pub fn parse_response(&self, operation: Operation, response: &HttpResponse) -> Result<Response, ApiError> {
        check_status(response)?;
        let body = &response.body;
        Ok(match operation {
            Operation::CreateDatabase => Response::DatabaseCreated(decode_status(body)),
            Operation::DeleteDatabase => Response::DatabaseDeleted(decode_status(body)),
            Operation::ReadDocument => Response::DocumentRead(decode::<Document>(body)?),
            Operation::CreateDocument => Response::DocumentCreated(decode_revision(body)?),
            Operation::UpdateDocument => Response::DocumentUpdated(decode_revision(body)?),
            Operation::DeleteDocument => Response::DocumentDeleted(decode_revision(body)?),
        })
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(&encode(segment));
        }
        url
    }

    fn revision_url(&self, database: &str, id: &str, rev: &str) -> Result<String, ApiError> {
        if id.is_empty() {
            return Err(ApiError::MissingArgument("id"));
        }
        if rev.is_empty() {
            return Err(ApiError::MissingArgument("rev"));
        }
        Ok(format!("{}?rev={}", self.url(&[database, id]), encode(rev)))
    }

    /// Attach the session cookie, when there is one, and the JSON content
    /// type when a body is present.
    fn request(&self, method: HttpMethod, url: String, body: Option<String>) -> HttpRequest {
        let mut headers = Vec::new();
        if body.is_some() {
            headers.push(("content-type".to_string(), JSON.to_string()));
        }
        if let Some(cookie) = self.session().cookie() {
            headers.push(("cookie".to_string(), cookie.to_string()));
        }
        HttpRequest {
            method,
            url,
            headers,
            body,
        }
    }
}

fn to_json_object<T: Serialize + ?Sized>(item: &T) -> Result<String, ApiError> {
    let value = serde_json::to_value(item).map_err(|e| ApiError::SerializationError(e.to_string()))?;
    if !value.is_object() {
        return Err(ApiError::SerializationError(
            "document must serialize to a JSON object".to_string(),
        ));
    }
    Ok(value.to_string())
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Any 2xx database reply is a success; a body without `ok` reads as `ok: true`.
fn decode_status(body: &str) -> DbStatus {
    serde_json::from_str(body).unwrap_or_default()
}

/// Mutation replies must carry a usable id and revision.
fn decode_revision(body: &str) -> Result<DocRevision, ApiError> {
    let revision: DocRevision = decode(body)?;
    if revision.id.is_empty() || revision.rev.is_empty() {
        return Err(ApiError::DeserializationError(
            "mutation reply without id or rev".to_string(),
        ));
    }
    Ok(revision)
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(match response.status {
        401 | 403 => ApiError::Unauthorized,
        404 => ApiError::NotFound,
        409 => ApiError::Conflict,
        status => ApiError::HttpError {
            status,
            body: response.body.clone(),
        },
    })
}
