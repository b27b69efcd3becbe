use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, MockConfig, MutationReply};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn request(method: &str, uri: &str, cookie: Option<&str>, body: Option<&str>) -> Request<String> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(http::header::COOKIE, cookie);
    }
    if body.is_some() {
        builder = builder.header(http::header::CONTENT_TYPE, "application/json");
    }
    builder.body(body.unwrap_or_default().to_string()).unwrap()
}

fn login_request(name: &str, password: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri("/_session")
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(format!("name={name}&password={password}"))
        .unwrap()
}

/// Log in as the default user and return the `name=value` cookie pair.
async fn login(app: &Router) -> String {
    let resp = app.clone().oneshot(login_request("admin", "pass")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let set_cookie = resp
        .headers()
        .get(http::header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

// --- session ---

#[tokio::test]
async fn login_sets_session_cookie() {
    let app = app(MockConfig::default());
    let resp = app.oneshot(login_request("admin", "pass")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp.headers().get(http::header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with("AuthSession="));
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["name"], "admin");
}

#[tokio::test]
async fn login_wrong_password_is_401() {
    let app = app(MockConfig::default());
    let resp = app.oneshot(login_request("admin", "nope")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().get(http::header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn logout_invalidates_cookie() {
    let app = app(MockConfig::default());
    let cookie = login(&app).await;

    let resp = app
        .clone()
        .oneshot(request("DELETE", "/_session", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(request("GET", "/crud/welcome", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- auth ---

#[tokio::test]
async fn read_without_cookie_is_401() {
    let app = app(MockConfig::default());
    let resp = app.oneshot(request("GET", "/crud/welcome", None, None)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["error"], "unauthorized");
}

// --- databases ---

#[tokio::test]
async fn create_and_delete_database() {
    let app = app(MockConfig::default());
    let cookie = login(&app).await;

    let resp = app.clone().oneshot(request("PUT", "/data1", Some(&cookie), None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app.clone().oneshot(request("PUT", "/data1", Some(&cookie), None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);

    let resp = app.clone().oneshot(request("DELETE", "/data1", Some(&cookie), None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.oneshot(request("DELETE", "/data1", Some(&cookie), None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- documents ---

#[tokio::test]
async fn seeded_welcome_document_is_readable() {
    let app = app(MockConfig::default());
    let cookie = login(&app).await;

    let resp = app.oneshot(request("GET", "/crud/welcome", Some(&cookie), None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let doc: serde_json::Value = body_json(resp).await;
    assert_eq!(doc["_id"], "welcome");
    assert!(doc["_rev"].as_str().unwrap().starts_with("1-"));
}

#[tokio::test]
async fn create_document_uses_supplied_id() {
    let app = app(MockConfig::default());
    let cookie = login(&app).await;

    let resp = app
        .clone()
        .oneshot(request("POST", "/crud", Some(&cookie), Some(r#"{"_id":"test_data","name":"someone"}"#)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let reply: MutationReply = body_json(resp).await;
    assert_eq!(reply.id, "test_data");
    assert!(reply.rev.starts_with("1-"));

    let resp = app
        .oneshot(request("POST", "/crud", Some(&cookie), Some(r#"{"_id":"test_data"}"#)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn create_document_generates_id() {
    let app = app(MockConfig::default());
    let cookie = login(&app).await;

    let resp = app
        .oneshot(request("POST", "/crud", Some(&cookie), Some(r#"{"name":"Polly"}"#)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let reply: MutationReply = body_json(resp).await;
    assert!(!reply.id.is_empty());
}

#[tokio::test]
async fn create_document_in_missing_database_is_404() {
    let app = app(MockConfig::default());
    let cookie = login(&app).await;

    let resp = app
        .oneshot(request("POST", "/nowhere", Some(&cookie), Some("{}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_requires_current_rev() {
    let app = app(MockConfig::default());
    let cookie = login(&app).await;

    let resp = app
        .clone()
        .oneshot(request("POST", "/crud", Some(&cookie), Some(r#"{"_id":"doc"}"#)))
        .await
        .unwrap();
    let created: MutationReply = body_json(resp).await;

    let uri = format!("/crud/doc?rev={}", created.rev);
    let resp = app
        .clone()
        .oneshot(request("PUT", &uri, Some(&cookie), Some(r#"{"name":"Polly"}"#)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let updated: MutationReply = body_json(resp).await;
    assert!(updated.rev.starts_with("2-"));

    // The create revision is now stale.
    let resp = app
        .clone()
        .oneshot(request("PUT", &uri, Some(&cookie), Some(r#"{"name":"Again"}"#)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = app.oneshot(request("GET", "/crud/doc", Some(&cookie), None)).await.unwrap();
    let doc: serde_json::Value = body_json(resp).await;
    assert_eq!(doc["name"], "Polly");
    assert_eq!(doc["_rev"], updated.rev.as_str());
}

#[tokio::test]
async fn delete_document_with_stale_rev_is_conflict() {
    let app = app(MockConfig::default());
    let cookie = login(&app).await;

    let resp = app
        .clone()
        .oneshot(request("DELETE", "/crud/welcome?rev=0-stale", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let bytes = body_bytes(resp).await;
    assert!(std::str::from_utf8(&bytes).unwrap().contains("conflict"));
}

#[tokio::test]
async fn delete_document_then_read_is_404() {
    let app = app(MockConfig::default());
    let cookie = login(&app).await;

    let resp = app
        .clone()
        .oneshot(request("GET", "/crud/welcome", Some(&cookie), None))
        .await
        .unwrap();
    let doc: serde_json::Value = body_json(resp).await;
    let uri = format!("/crud/welcome?rev={}", doc["_rev"].as_str().unwrap());

    let resp = app.clone().oneshot(request("DELETE", &uri, Some(&cookie), None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let deleted: MutationReply = body_json(resp).await;
    assert!(deleted.rev.starts_with("2-"));

    let resp = app.oneshot(request("GET", "/crud/welcome", Some(&cookie), None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
