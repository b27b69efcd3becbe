//! In-memory document store speaking the CouchDB session/database/document
//! HTTP API, for tests and the demo.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{post, put},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "AuthSession";

#[derive(Clone, Debug)]
pub struct MockConfig {
    pub users: HashMap<String, String>,
    /// Seed database `crud` with a `welcome` document.
    pub seed: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            users: HashMap::from([("admin".to_string(), "pass".to_string())]),
            seed: true,
        }
    }
}

impl MockConfig {
    pub fn from_env() -> Self {
        let user = std::env::var("MOCK_USER").unwrap_or_else(|_| "admin".to_string());
        let password = std::env::var("MOCK_PASSWORD").unwrap_or_else(|_| "pass".to_string());
        Self {
            users: HashMap::from([(user, password)]),
            seed: true,
        }
    }
}

#[derive(Deserialize)]
pub struct Credentials {
    pub name: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RevQuery {
    pub rev: Option<String>,
}

/// Body of every successful document mutation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MutationReply {
    pub ok: bool,
    pub id: String,
    pub rev: String,
}

#[derive(Default)]
pub struct Store {
    users: HashMap<String, String>,
    sessions: HashSet<String>,
    databases: HashMap<String, HashMap<String, Map<String, Value>>>,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app(config: MockConfig) -> Router {
    let mut store = Store {
        users: config.users,
        ..Store::default()
    };
    if config.seed {
        let mut welcome = Map::new();
        welcome.insert("_id".to_string(), json!("welcome"));
        welcome.insert("_rev".to_string(), json!(next_rev(None)));
        welcome.insert("message".to_string(), json!("Welcome to the document store"));
        store
            .databases
            .insert("crud".to_string(), HashMap::from([("welcome".to_string(), welcome)]));
    }
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/_session", post(login).delete(logout))
        .route("/{db}", put(create_database).delete(delete_database).post(create_document))
        .route(
            "/{db}/{id}",
            put(update_document).get(read_document).delete(delete_document),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!("mock store listening on {addr}");
    }
    axum::serve(listener, app(config)).await
}

/// `N-<hex>` with N one past the previous revision's generation.
pub fn next_rev(previous: Option<&str>) -> String {
    let generation = previous
        .and_then(|rev| rev.split('-').next())
        .and_then(|n| n.parse::<u64>().ok())
        .unwrap_or(0);
    format!("{}-{}", generation + 1, Uuid::new_v4().simple())
}

fn error(status: StatusCode, error: &str, reason: &str) -> Response {
    (status, Json(json!({ "error": error, "reason": reason }))).into_response()
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    let prefix = format!("{SESSION_COOKIE}=");
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(&prefix).map(str::to_string))
}

fn authorized(store: &Store, headers: &HeaderMap) -> bool {
    session_token(headers).is_some_and(|token| store.sessions.contains(&token))
}

fn unauthorized() -> Response {
    error(
        StatusCode::UNAUTHORIZED,
        "unauthorized",
        "You are not authorized to access this db.",
    )
}

fn not_found(reason: &str) -> Response {
    error(StatusCode::NOT_FOUND, "not_found", reason)
}

fn conflict() -> Response {
    error(StatusCode::CONFLICT, "conflict", "Document update conflict.")
}

async fn login(State(db): State<Db>, Form(input): Form<Credentials>) -> Response {
    let mut store = db.write().await;
    if store.users.get(&input.name) != Some(&input.password) {
        return error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "Name or password is incorrect.",
        );
    }
    let token = Uuid::new_v4().simple().to_string();
    store.sessions.insert(token.clone());
    debug!(user = %input.name, "session opened");
    let cookie = format!("{SESSION_COOKIE}={token}; Version=1; Path=/; HttpOnly");
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "ok": true, "name": input.name, "roles": [] })),
    )
        .into_response()
}

async fn logout(State(db): State<Db>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        db.write().await.sessions.remove(&token);
    }
    (StatusCode::OK, Json(json!({ "ok": true }))).into_response()
}

async fn create_database(State(db): State<Db>, Path(name): Path<String>, headers: HeaderMap) -> Response {
    let mut store = db.write().await;
    if !authorized(&store, &headers) {
        return unauthorized();
    }
    if store.databases.contains_key(&name) {
        return error(
            StatusCode::PRECONDITION_FAILED,
            "file_exists",
            "The database could not be created, the file already exists.",
        );
    }
    store.databases.insert(name, HashMap::new());
    (StatusCode::CREATED, Json(json!({ "ok": true }))).into_response()
}

async fn delete_database(State(db): State<Db>, Path(name): Path<String>, headers: HeaderMap) -> Response {
    let mut store = db.write().await;
    if !authorized(&store, &headers) {
        return unauthorized();
    }
    match store.databases.remove(&name) {
        Some(_) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        None => not_found("Database does not exist."),
    }
}

async fn create_document(
    State(db): State<Db>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(mut doc): Json<Map<String, Value>>,
) -> Response {
    let mut store = db.write().await;
    if !authorized(&store, &headers) {
        return unauthorized();
    }
    let Some(docs) = store.databases.get_mut(&name) else {
        return not_found("Database does not exist.");
    };
    let id = match doc.get("_id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => Uuid::new_v4().simple().to_string(),
    };
    if docs.contains_key(&id) {
        return conflict();
    }
    let rev = next_rev(None);
    doc.insert("_id".to_string(), json!(id));
    doc.insert("_rev".to_string(), json!(rev));
    docs.insert(id.clone(), doc);
    (StatusCode::CREATED, Json(MutationReply { ok: true, id, rev })).into_response()
}

async fn read_document(
    State(db): State<Db>,
    Path((name, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let store = db.read().await;
    if !authorized(&store, &headers) {
        return unauthorized();
    }
    match store.databases.get(&name).and_then(|docs| docs.get(&id)) {
        Some(doc) => (StatusCode::OK, Json(doc.clone())).into_response(),
        None => not_found("missing"),
    }
}

async fn update_document(
    State(db): State<Db>,
    Path((name, id)): Path<(String, String)>,
    Query(query): Query<RevQuery>,
    headers: HeaderMap,
    Json(mut doc): Json<Map<String, Value>>,
) -> Response {
    let mut store = db.write().await;
    if !authorized(&store, &headers) {
        return unauthorized();
    }
    let Some(docs) = store.databases.get_mut(&name) else {
        return not_found("Database does not exist.");
    };
    let supplied = query
        .rev
        .or_else(|| doc.get("_rev").and_then(Value::as_str).map(str::to_string));
    let current = docs
        .get(&id)
        .and_then(|d| d.get("_rev"))
        .and_then(Value::as_str)
        .map(str::to_string);
    if supplied != current {
        return conflict();
    }
    let rev = next_rev(current.as_deref());
    doc.insert("_id".to_string(), json!(id));
    doc.insert("_rev".to_string(), json!(rev));
    docs.insert(id.clone(), doc);
    (StatusCode::CREATED, Json(MutationReply { ok: true, id, rev })).into_response()
}

async fn delete_document(
    State(db): State<Db>,
    Path((name, id)): Path<(String, String)>,
    Query(query): Query<RevQuery>,
    headers: HeaderMap,
) -> Response {
    let mut store = db.write().await;
    if !authorized(&store, &headers) {
        return unauthorized();
    }
    let Some(docs) = store.databases.get_mut(&name) else {
        return not_found("Database does not exist.");
    };
    let Some(current) = docs.get(&id).and_then(|d| d.get("_rev")).and_then(Value::as_str) else {
        return not_found("deleted");
    };
    if query.rev.as_deref() != Some(current) {
        return conflict();
    }
    let rev = next_rev(Some(current));
    docs.remove(&id);
    (StatusCode::OK, Json(MutationReply { ok: true, id, rev })).into_response()
}
