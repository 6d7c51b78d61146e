#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::Value;

use daily_flow_api::config::AppConfig;
use daily_flow_api::database::{Document, DocumentStore, MemoryStore};

/// An in-process server over a fresh memory store.
/// Each test gets its own so collections never leak between tests.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub client: reqwest::Client,
}

impl TestServer {
    async fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let store = Arc::new(MemoryStore::new());
        let mut config = AppConfig::development();
        config.api.enable_request_logging = false;
        let app = daily_flow_api::app(store.clone() as Arc<dyn DocumentStore>, &config)?;

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { port, base_url, store, client: reqwest::Client::new() })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline { break; }
            if let Ok(resp) = self.client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Insert straight into the store, bypassing HTTP (for read-only resources)
    pub async fn seed(&self, collection: &str, doc: Value) -> Result<String> {
        let doc: Document = doc.as_object().cloned().context("seed document must be an object")?;
        let ack = self.store.collection(collection)?.insert_one(doc).await?;
        Ok(ack.inserted_id.to_string())
    }

    /// POST a document and return its generated id
    pub async fn create(&self, path: &str, doc: Value) -> Result<String> {
        let res = self.client.post(self.url(path)).json(&doc).send().await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "create failed: {}", res.status());
        let body = res.json::<Value>().await?;
        body["insertedId"]
            .as_str()
            .map(str::to_string)
            .context("missing insertedId")
    }

    /// GET a list endpoint and return the documents
    pub async fn list(&self, path_and_query: &str) -> Result<Vec<Value>> {
        let res = self.client.get(self.url(path_and_query)).send().await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "list failed: {}", res.status());
        let body = res.json::<Value>().await?;
        body.as_array().cloned().context("list response is not an array")
    }
}

pub async fn spawn_server() -> Result<TestServer> {
    let server = TestServer::spawn().await?;
    server.wait_ready(Duration::from_secs(5)).await?;
    Ok(server)
}
