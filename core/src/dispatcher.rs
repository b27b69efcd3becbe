//! Asynchronous front end over `DocStoreClient` and a `Transport`.
//!
//! # Design
//! Every call builds its request on the caller's thread, then runs the
//! round-trip on tokio's blocking pool and returns at once with a `Pending`
//! handle. Calls are not ordered relative to each other; completions may
//! interleave.
//!
//! Successes of tagged operations are forwarded to the registered
//! `ResponseListener`; a successful login fires `on_login_success` instead.
//! Failures are logged and resolved through the handle only, so a listener
//! never hears about them. Logout notifies nobody.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::client::DocStoreClient;
use crate::error::ApiError;
use crate::http::HttpRequest;
use crate::operation::{Operation, Reply};
use crate::session::Session;
use crate::transport::Transport;
use crate::types::LoginReply;

/// Handle to one in-flight request. Await it for the outcome, or `abort` it.
pub type Pending<T> = JoinHandle<Result<T, ApiError>>;

/// Receives successful replies. Implementations must be cheap to call from
/// any worker thread.
pub trait ResponseListener: Send + Sync {
    /// A tagged operation succeeded.
    fn on_response(&self, reply: &Reply);

    /// A login succeeded and the session cookie is stored.
    fn on_login_success(&self);
}

/// Runs client operations over a `Transport` and reports to an optional
/// listener.
///
/// Every operation spawns onto tokio's blocking pool, so it must be called
/// from within a Tokio runtime; outside one it panics.
pub struct Dispatcher<T: Transport> {
    client: Arc<DocStoreClient>,
    transport: Arc<T>,
    listener: Option<Arc<dyn ResponseListener>>,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(client: DocStoreClient, transport: T) -> Self {
        Self {
            client: Arc::new(client),
            transport: Arc::new(transport),
            listener: None,
        }
    }

    pub fn set_listener(&mut self, listener: Arc<dyn ResponseListener>) {
        self.listener = Some(listener);
    }

    pub fn client(&self) -> &DocStoreClient {
        &self.client
    }

    pub fn session(&self) -> Session {
        self.client.session()
    }

    pub fn login(&self, name: &str, password: &str) -> Pending<LoginReply> {
        let request = self.client.build_login(name, password);
        let client = Arc::clone(&self.client);
        let transport = Arc::clone(&self.transport);
        let listener = self.listener.clone();
        tokio::task::spawn_blocking(move || {
            let result = transport
                .execute(&request)
                .and_then(|response| client.parse_login(response));
            match &result {
                Ok(_) => {
                    if let Some(listener) = listener {
                        listener.on_login_success();
                    }
                }
                Err(e) => error!(url = %request.url, "login failed: {e}"),
            }
            result
        })
    }

    pub fn logout(&self) -> Pending<()> {
        let request = self.client.build_logout();
        let client = Arc::clone(&self.client);
        let transport = Arc::clone(&self.transport);
        tokio::task::spawn_blocking(move || {
            let result = transport
                .execute(&request)
                .and_then(|response| client.parse_logout(response));
            if let Err(e) = &result {
                debug!(url = %request.url, "logout failed: {e}");
            }
            result
        })
    }

    pub fn create_database(&self, name: &str, tag: Option<&str>) -> Pending<Reply> {
        let request = self.client.build_create_database(name);
        self.dispatch(Operation::CreateDatabase, request, tag)
    }

    pub fn delete_database(&self, name: &str, tag: Option<&str>) -> Pending<Reply> {
        let request = self.client.build_delete_database(name);
        self.dispatch(Operation::DeleteDatabase, request, tag)
    }

    pub fn read_document(&self, database: &str, id: &str, tag: Option<&str>) -> Pending<Reply> {
        let request = self.client.build_read_document(database, id);
        self.dispatch(Operation::ReadDocument, request, tag)
    }

    /// Serialization errors surface here, before anything is sent.
    pub fn create_document<D>(&self, database: &str, item: &D, tag: Option<&str>) -> Result<Pending<Reply>, ApiError>
    where
        D: Serialize + ?Sized,
    {
        let request = self.client.build_create_document(database, item)?;
        Ok(self.dispatch(Operation::CreateDocument, request, tag))
    }

    pub fn update_document<D>(
        &self,
        database: &str,
        item: &D,
        id: &str,
        rev: &str,
        tag: Option<&str>,
    ) -> Result<Pending<Reply>, ApiError>
    where
        D: Serialize + ?Sized,
    {
        let request = self.client.build_update_document(database, item, id, rev)?;
        Ok(self.dispatch(Operation::UpdateDocument, request, tag))
    }

    pub fn delete_document(&self, database: &str, id: &str, rev: &str, tag: Option<&str>) -> Result<Pending<Reply>, ApiError> {
        let request = self.client.build_delete_document(database, id, rev)?;
        Ok(self.dispatch(Operation::DeleteDocument, request, tag))
    }

    fn dispatch(&self, operation: Operation, request: HttpRequest, tag: Option<&str>) -> Pending<Reply> {
        let tag = operation.resolve_tag(tag);
        let client = Arc::clone(&self.client);
        let transport = Arc::clone(&self.transport);
        let listener = self.listener.clone();
        debug!(%tag, method = %request.method, url = %request.url, "dispatching");
        tokio::task::spawn_blocking(move || {
            let result = transport.execute(&request).and_then(|response| {
                let decoded = client.parse_response(operation, &response)?;
                Ok(Reply {
                    tag,
                    body: response.body,
                    response: decoded,
                })
            });
            match &result {
                Ok(reply) => {
                    if let Some(listener) = listener {
                        listener.on_response(reply);
                    }
                }
                Err(e) => error!(method = %request.method, url = %request.url, "request failed: {e}"),
            }
            result
        })
    }
}
