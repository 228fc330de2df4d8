//! Test helpers: a mock backend server and signed-in sessions.
//!
//! Run from workspace root: `cargo test -p scholar-api-client`.

#![allow(dead_code)]

pub mod auth;
pub mod fixtures;

use mockito::{Server, ServerGuard};
use scholar_api_client::ApiClient;
use std::time::Duration;

/// Mock backend plus a client pointed at it.
pub struct TestBackend {
    pub server: ServerGuard,
    pub client: ApiClient,
}

impl TestBackend {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.server.url(), path)
    }
}

pub async fn setup_backend() -> TestBackend {
    let server = Server::new_async().await;
    let client = ApiClient::new(server.url(), Duration::from_secs(5)).expect("client");
    TestBackend { server, client }
}

/// Wrap a payload the way the gateway's non-proxy integration does.
pub fn envelope(status: u16, payload: serde_json::Value) -> String {
    serde_json::json!({
        "statusCode": status,
        "body": payload.to_string(),
    })
    .to_string()
}
