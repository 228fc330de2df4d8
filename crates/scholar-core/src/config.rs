//! Configuration module
//!
//! Client configuration is read from the environment (and a `.env` file when
//! present). Only the backend URL is mandatory; identity settings are checked
//! lazily by the commands that need them.

use std::env;
use std::path::PathBuf;

const DEFAULT_COGNITO_REGION: &str = "us-east-1";
const HTTP_TIMEOUT_SECS: u64 = 60;

/// Configuration for the backend API, identity provider, and local session file.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the post backend (API Gateway stage), without trailing slash
    pub api_url: String,
    /// AWS region hosting the Cognito user pool
    pub cognito_region: String,
    /// Cognito app client id (required for register/confirm/login)
    pub cognito_client_id: Option<String>,
    /// Custom identity endpoint (overrides the regional Cognito URL)
    pub cognito_endpoint: Option<String>,
    pub http_timeout_secs: u64,
    /// Override for the persisted session location
    pub session_file: Option<PathBuf>,
}

impl ClientConfig {
    /// Load configuration from process environment.
    ///
    /// `SCHOLAR_API_URL` (or `API_URL`) is required. See [`ClientConfig::from_lookup`]
    /// for the full list of variables.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Recognised keys: `SCHOLAR_API_URL`/`API_URL`, `SCHOLAR_COGNITO_REGION`,
    /// `SCHOLAR_COGNITO_CLIENT_ID`, `SCHOLAR_COGNITO_ENDPOINT`,
    /// `SCHOLAR_HTTP_TIMEOUT_SECS`, `SCHOLAR_SESSION_FILE`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = non_empty("SCHOLAR_API_URL")
            .or_else(|| non_empty("API_URL"))
            .ok_or_else(|| anyhow::anyhow!("SCHOLAR_API_URL (or API_URL) must be set"))?;

        let http_timeout_secs = match non_empty("SCHOLAR_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                anyhow::anyhow!("SCHOLAR_HTTP_TIMEOUT_SECS must be a positive number")
            })?,
            None => HTTP_TIMEOUT_SECS,
        };

        let config = ClientConfig {
            api_url: api_url.trim().trim_end_matches('/').to_string(),
            cognito_region: non_empty("SCHOLAR_COGNITO_REGION")
                .unwrap_or_else(|| DEFAULT_COGNITO_REGION.to_string()),
            cognito_client_id: non_empty("SCHOLAR_COGNITO_CLIENT_ID"),
            cognito_endpoint: non_empty("SCHOLAR_COGNITO_ENDPOINT"),
            http_timeout_secs,
            session_file: non_empty("SCHOLAR_SESSION_FILE").map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        validate_http_url("SCHOLAR_API_URL", &self.api_url)?;
        if let Some(endpoint) = &self.cognito_endpoint {
            validate_http_url("SCHOLAR_COGNITO_ENDPOINT", endpoint)?;
        }
        if self.http_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "SCHOLAR_HTTP_TIMEOUT_SECS must be greater than zero"
            ));
        }
        if self.cognito_region.trim().is_empty() {
            return Err(anyhow::anyhow!("SCHOLAR_COGNITO_REGION cannot be empty"));
        }
        Ok(())
    }

    /// Identity endpoint: the explicit override, else the regional Cognito URL.
    pub fn identity_endpoint(&self) -> String {
        match &self.cognito_endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://cognito-idp.{}.amazonaws.com/", self.cognito_region),
        }
    }

    pub fn require_cognito_client_id(&self) -> Result<&str, anyhow::Error> {
        self.cognito_client_id
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("SCHOLAR_COGNITO_CLIENT_ID must be set"))
    }
}

fn validate_http_url(name: &str, value: &str) -> Result<(), anyhow::Error> {
    let parsed = url::Url::parse(value)
        .map_err(|e| anyhow::anyhow!("{} is not a valid URL ({}): {}", name, value, e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(anyhow::anyhow!(
            "{} must use http or https, got '{}'",
            name,
            other
        )),
    }
}
