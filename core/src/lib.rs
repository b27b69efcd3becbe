//! Client core for a CouchDB-style document store.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values for session,
//! database and document operations (host-does-IO pattern). A `Dispatcher`
//! runs those round-trips asynchronously over a `Transport` and reports
//! successes to a `ResponseListener`.
//!
//! # Design
//! - `DocStoreClient` owns the endpoint and the `Session` cookie; nothing is
//!   process-global.
//! - Each operation is split into `build_*` (produces request) and a parse
//!   step (consumes response), so the I/O boundary is explicit and the FFI
//!   crate can hand execution to a mobile host.
//! - Replies carry both the tag string and a typed `Response` variant.
//! - Failures never reach the listener; they resolve the request's handle.

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod operation;
pub mod session;
pub mod transport;
pub mod types;

pub use client::{DocStoreClient, DEFAULT_HOST};
pub use config::StoreConfig;
pub use dispatcher::{Dispatcher, Pending, ResponseListener};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use operation::{Operation, Reply, Response};
pub use session::Session;
pub use transport::{Transport, UreqTransport};
pub use types::{DbStatus, DocRevision, Document, LoginReply};
