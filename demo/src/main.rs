//! Walk through one session against a document store.
//!
//! Uses `DOCSTORE_*` from the environment when an endpoint is configured;
//! otherwise starts the mock store in-process and logs in as admin/pass.

use std::sync::Arc;

use docstore_core::{Dispatcher, Reply, ResponseListener, Response, StoreConfig, UreqTransport};
use mock_server::MockConfig;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Debug, Serialize)]
struct Item {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Welcome {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    message: String,
}

struct Printer;

impl ResponseListener for Printer {
    fn on_response(&self, reply: &Reply) {
        println!("{}:{}", reply.tag, reply.body);
    }

    fn on_login_success(&self) {
        println!("login:ok");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = StoreConfig::from_env();
    let (client, user, password) = match config.client() {
        Some(client) => (
            client,
            config.user.clone().unwrap_or_default(),
            config.password.clone().unwrap_or_default(),
        ),
        None => {
            let listener = TcpListener::bind("127.0.0.1:0").await?;
            let addr = listener.local_addr()?;
            tokio::spawn(mock_server::run(listener, MockConfig::default()));
            info!(%addr, "no DOCSTORE_URL set, using in-process mock store");
            (
                docstore_core::DocStoreClient::new(&format!("http://{addr}")),
                "admin".to_string(),
                "pass".to_string(),
            )
        }
    };

    let mut dispatcher = Dispatcher::new(client, UreqTransport::new());
    dispatcher.set_listener(Arc::new(Printer));

    dispatcher.login(&user, &password).await??;

    let welcome = dispatcher.read_document("crud", "welcome", None).await??;
    if let Response::DocumentRead(doc) = welcome.response {
        let welcome: Welcome = serde_json::from_value(serde_json::Value::Object(doc))?;
        info!(id = %welcome.id, "{}", welcome.message);
    }

    let item = Item {
        id: Some("test_data".to_string()),
        name: "someone".to_string(),
        phone: "18501020333".to_string(),
        address: None,
    };
    let created = dispatcher.create_document("crud", &item, None)?.await??;
    let created = created.response.revision().cloned().ok_or("create reply without revision")?;

    let item = Item {
        id: None,
        name: "Polly".to_string(),
        phone: "1838383838383".to_string(),
        address: None,
    };
    let updated = dispatcher
        .update_document("crud", &item, &created.id, &created.rev, None)?
        .await??;
    let updated = updated.response.revision().cloned().ok_or("update reply without revision")?;

    dispatcher
        .delete_document("crud", &updated.id, &updated.rev, None)?
        .await??;

    dispatcher.create_database("data1", None).await??;
    dispatcher.delete_database("data1", None).await??;

    dispatcher.logout().await??;
    println!("logout:ok");
    Ok(())
}
