//! Dispatcher behavior against a scripted in-process transport.
//!
//! The transport answers from a closure and records every request it sees,
//! and the listener records every callback, so tests can assert both what
//! went over the wire and what the caller was told.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use docstore_core::{
    ApiError, Dispatcher, DocStoreClient, HttpMethod, HttpRequest, HttpResponse, Reply, Response,
    ResponseListener, Transport,
};
use serde_json::json;

type Handler = dyn Fn(&HttpRequest) -> Result<HttpResponse, ApiError> + Send + Sync;

struct ScriptedTransport {
    handler: Box<Handler>,
    seen: Arc<Mutex<Vec<HttpRequest>>>,
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.seen.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }
}

#[derive(Default)]
struct RecordingListener {
    replies: Mutex<Vec<Reply>>,
    logins: AtomicUsize,
}

impl RecordingListener {
    fn calls(&self) -> usize {
        self.replies.lock().unwrap().len() + self.logins.load(Ordering::SeqCst)
    }
}

impl ResponseListener for RecordingListener {
    fn on_response(&self, reply: &Reply) {
        self.replies.lock().unwrap().push(reply.clone());
    }

    fn on_login_success(&self) {
        self.logins.fetch_add(1, Ordering::SeqCst);
    }
}

fn ok(status: u16, body: &str) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse {
        status,
        headers: Vec::new(),
        body: body.to_string(),
    })
}

fn login_ok() -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse {
        status: 200,
        headers: vec![(
            "Set-Cookie".to_string(),
            "AuthSession=c2Vzc2lvbg; Version=1; Path=/; HttpOnly".to_string(),
        )],
        body: r#"{"ok":true,"name":"kevin","roles":[]}"#.to_string(),
    })
}

/// A store that accepts logins and answers every other call with `status`/`body`.
fn store(status: u16, body: &'static str) -> Box<Handler> {
    Box::new(move |req: &HttpRequest| {
        if req.url.ends_with("/_session") && req.method == HttpMethod::Post {
            login_ok()
        } else {
            ok(status, body)
        }
    })
}

fn setup(handler: Box<Handler>) -> (Dispatcher<ScriptedTransport>, Arc<RecordingListener>, Arc<Mutex<Vec<HttpRequest>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let transport = ScriptedTransport {
        handler,
        seen: Arc::clone(&seen),
    };
    let listener = Arc::new(RecordingListener::default());
    let mut dispatcher = Dispatcher::new(DocStoreClient::new("https://kevin.cloudant.com"), transport);
    dispatcher.set_listener(listener.clone());
    (dispatcher, listener, seen)
}

#[tokio::test]
async fn login_notifies_once_and_never_on_response() {
    let (dispatcher, listener, _) = setup(store(200, "{}"));

    let reply = dispatcher.login("kevin", "secret").await.unwrap().unwrap();
    assert_eq!(reply.name.as_deref(), Some("kevin"));
    assert_eq!(listener.logins.load(Ordering::SeqCst), 1);
    assert!(listener.replies.lock().unwrap().is_empty());
    assert_eq!(dispatcher.session().cookie(), Some("AuthSession=c2Vzc2lvbg"));
}

#[tokio::test]
async fn login_with_plain_text_body_still_notifies() {
    let (dispatcher, listener, _) = setup(Box::new(|_: &HttpRequest| {
        Ok(HttpResponse {
            status: 200,
            headers: vec![("Set-Cookie".to_string(), "AuthSession=x".to_string())],
            body: "OK".to_string(),
        })
    }));

    let reply = dispatcher.login("kevin", "secret").await.unwrap().unwrap();
    assert!(reply.ok);
    assert_eq!(listener.logins.load(Ordering::SeqCst), 1);
    assert_eq!(dispatcher.session().cookie(), Some("AuthSession=x"));
}

#[tokio::test]
async fn read_after_login_carries_cookie() {
    let (dispatcher, _, seen) = setup(store(200, r#"{"_id":"welcome","_rev":"1-a","message":"hi"}"#));

    dispatcher.login("kevin", "secret").await.unwrap().unwrap();
    dispatcher.read_document("crud", "welcome", None).await.unwrap().unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].url, "https://kevin.cloudant.com/crud/welcome");
    assert_eq!(seen[1].header("cookie"), Some("AuthSession=c2Vzc2lvbg"));
}

#[tokio::test]
async fn calls_before_login_go_out_without_cookie() {
    let (dispatcher, listener, seen) = setup(store(401, r#"{"error":"unauthorized"}"#));

    let err = dispatcher.read_document("crud", "welcome", None).await.unwrap().unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].header("cookie"), None);
    assert_eq!(listener.calls(), 0);
}

#[tokio::test]
async fn create_database_uses_default_tag() {
    let (dispatcher, listener, seen) = setup(store(201, r#"{"ok":true}"#));

    let reply = dispatcher.create_database("data1", None).await.unwrap().unwrap();
    assert_eq!(reply.tag, "create_database");
    assert_eq!(seen.lock().unwrap()[0].method, HttpMethod::Put);

    let replies = listener.replies.lock().unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].tag, "create_database");
    assert_eq!(replies[0].body, r#"{"ok":true}"#);
}

#[tokio::test]
async fn database_reply_without_ok_still_notifies() {
    let (dispatcher, listener, _) = setup(store(201, "{}"));

    let reply = dispatcher.create_database("data1", None).await.unwrap().unwrap();
    assert_eq!(reply.body, "{}");
    assert_eq!(listener.replies.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn explicit_tag_is_passed_verbatim() {
    let (dispatcher, listener, _) = setup(store(200, r#"{"ok":true}"#));

    dispatcher.delete_database("data1", Some("cleanup")).await.unwrap().unwrap();
    assert_eq!(listener.replies.lock().unwrap()[0].tag, "cleanup");
}

#[tokio::test]
async fn create_document_reply_has_id_and_rev() {
    let (dispatcher, listener, _) = setup(store(201, r#"{"ok":true,"id":"test_data","rev":"1-abc"}"#));

    let pending = dispatcher
        .create_document("crud", &json!({"_id": "test_data", "name": "someone"}), None)
        .unwrap();
    let reply = pending.await.unwrap().unwrap();
    assert_eq!(reply.tag, "create");

    let replies = listener.replies.lock().unwrap();
    let body: serde_json::Value = serde_json::from_str(&replies[0].body).unwrap();
    assert!(!body["id"].as_str().unwrap().is_empty());
    assert!(!body["rev"].as_str().unwrap().is_empty());
    match &replies[0].response {
        Response::DocumentCreated(rev) => assert_eq!(rev.rev, "1-abc"),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn stale_rev_conflict_reaches_handle_not_listener() {
    let (dispatcher, listener, seen) = setup(Box::new(|req: &HttpRequest| {
        if req.url.ends_with("rev=1-fresh") {
            ok(201, r#"{"ok":true,"id":"doc","rev":"2-next"}"#)
        } else {
            ok(409, r#"{"error":"conflict","reason":"Document update conflict."}"#)
        }
    }));

    let item = json!({"name": "Polly"});
    let reply = dispatcher
        .update_document("crud", &item, "doc", "1-fresh", None)
        .unwrap()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply.response.revision().unwrap().rev, "2-next");
    assert_eq!(listener.calls(), 1);

    let err = dispatcher
        .update_document("crud", &item, "doc", "1-fresh-but-stale", None)
        .unwrap()
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict));
    assert_eq!(listener.calls(), 1);
    assert_eq!(
        seen.lock().unwrap()[1].url,
        "https://kevin.cloudant.com/crud/doc?rev=1-fresh-but-stale"
    );
}

#[tokio::test]
async fn logout_never_notifies() {
    let (dispatcher, listener, seen) = setup(store(200, r#"{"ok":true}"#));

    dispatcher.logout().await.unwrap().unwrap();
    assert_eq!(listener.calls(), 0);
    assert_eq!(seen.lock().unwrap()[0].method, HttpMethod::Delete);
}

#[tokio::test]
async fn transport_failure_is_silent_for_listener() {
    let (dispatcher, listener, _) = setup(Box::new(|_: &HttpRequest| {
        Err(ApiError::Transport("connection refused".to_string()))
    }));

    let login = dispatcher.login("kevin", "secret").await.unwrap();
    assert!(matches!(login, Err(ApiError::Transport(_))));
    let logout = dispatcher.logout().await.unwrap();
    assert!(logout.is_err());
    let delete = dispatcher.delete_document("crud", "doc", "1-a", None).unwrap().await.unwrap();
    assert!(matches!(delete, Err(ApiError::Transport(_))));

    assert_eq!(listener.calls(), 0);
    assert!(!dispatcher.session().is_authenticated());
}

#[tokio::test]
async fn serialization_error_is_synchronous() {
    let (dispatcher, _, seen) = setup(store(201, "{}"));

    let err = dispatcher.create_document("crud", &"just a string", None).unwrap_err();
    assert!(matches!(err, ApiError::SerializationError(_)));
    let err = dispatcher.update_document("crud", &42, "doc", "1-a", None).unwrap_err();
    assert!(matches!(err, ApiError::SerializationError(_)));
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_calls_complete_independently() {
    let (dispatcher, listener, _) = setup(Box::new(|req: &HttpRequest| match req.method {
        HttpMethod::Get => ok(200, r#"{"_id":"welcome","_rev":"1-a"}"#),
        _ => ok(201, r#"{"ok":true,"id":"x","rev":"1-b"}"#),
    }));

    let read = dispatcher.read_document("crud", "welcome", None);
    let create = dispatcher.create_document("crud", &json!({"a": 1}), None).unwrap();
    let (read, create) = tokio::join!(read, create);
    assert_eq!(read.unwrap().unwrap().tag, "read");
    assert_eq!(create.unwrap().unwrap().tag, "create");

    let mut tags: Vec<String> = listener.replies.lock().unwrap().iter().map(|r| r.tag.clone()).collect();
    tags.sort();
    assert_eq!(tags, vec!["create", "read"]);
}
