//! Shared HTTP client for the Scholar Hub backend.
//!
//! Provides a minimal client with Bearer auth taken from an explicit [`Session`],
//! generic GET/POST helpers that normalize the backend's response envelope, and
//! the domain pieces built on top of it: the post submission pipeline, the
//! my-posts view, and the identity provider client. The CLI uses this crate
//! directly.

pub mod api;
pub mod envelope;
pub mod identity;
pub mod my_posts;
pub mod pipeline;
pub mod session;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use scholar_core::{ClientConfig, ClientError, ClientResult};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub use session::{Session, SessionStore};

/// HTTP client for the post backend.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        Self::new(
            config.api_url.clone(),
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: RequestBuilder, session: &Session) -> ClientResult<RequestBuilder> {
        let token = session.access_token()?;
        Ok(request.header("Authorization", format!("Bearer {}", token)))
    }

    /// GET request. Deserializes the (possibly enveloped) JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, session: &Session) -> ClientResult<T> {
        let url = self.build_url(path);
        let request = self.apply_auth(self.client.get(&url), session)?;

        let response = request.send().await.map_err(transport_error)?;
        read_payload(response).await
    }

    /// POST JSON body and return the raw response text once the HTTP status
    /// is a success. The body is not unwrapped.
    pub(crate) async fn post_for_text<B: serde::Serialize>(
        &self,
        path: &str,
        session: &Session,
        body: &B,
    ) -> ClientResult<String> {
        let url = self.build_url(path);
        let request = self.apply_auth(self.client.post(&url).json(body), session)?;

        let response = request.send().await.map_err(transport_error)?;
        read_text(response).await
    }

    /// POST JSON body and deserialize the (possibly enveloped) JSON response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        session: &Session,
        body: &B,
    ) -> ClientResult<T> {
        let url = self.build_url(path);
        let request = self.apply_auth(self.client.post(&url).json(body), session)?;

        let response = request.send().await.map_err(transport_error)?;
        read_payload(response).await
    }

    /// Raw client for requests against presigned URLs, which must not carry
    /// the Authorization header.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn transport_error(err: reqwest::Error) -> ClientError {
    ClientError::Backend {
        status: err.status().map(|s| s.as_u16()),
        message: format!("Failed to send request: {}", err),
    }
}

/// Map a non-success HTTP status to the error taxonomy.
fn status_error(status: StatusCode, body: &str) -> ClientError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return ClientError::Authentication(format!(
            "API rejected the access token ({})",
            status
        ));
    }
    let message = envelope::error_message(body).unwrap_or_else(|| {
        if body.trim().is_empty() {
            "Unknown error".to_string()
        } else {
            body.to_string()
        }
    });
    ClientError::backend_status(status.as_u16(), message)
}

async fn read_text(response: Response) -> ClientResult<String> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ClientError::backend_status(status.as_u16(), format!("Failed to read response: {}", e)))?;

    if !status.is_success() {
        return Err(status_error(status, &text));
    }
    Ok(text)
}

async fn read_payload<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let text = read_text(response).await?;
    envelope::normalize_payload(&text)
}
