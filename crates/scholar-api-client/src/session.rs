//! Authenticated session and its on-disk store.
//!
//! A [`Session`] is created at sign-in and passed explicitly to every API call.
//! The caller's user id is read from the access token's `sub` claim. Signature
//! verification is the backend's job; the client only reads claims.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};
use scholar_core::models::AuthTokens;
use scholar_core::{ClientConfig, ClientError, ClientResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Claims read from an identity-provider token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub exp: Option<u64>,
    /// Present in access tokens
    #[serde(default)]
    pub username: Option<String>,
    /// Present in id tokens
    #[serde(default)]
    pub email: Option<String>,
}

/// Read the claims of a token without verifying its signature.
///
/// Expiry is still checked when the token carries an `exp` claim.
pub fn decode_claims(token: &str) -> ClientResult<TokenClaims> {
    let header = jsonwebtoken::decode_header(token)
        .map_err(|e| ClientError::Authentication(format!("Malformed access token: {}", e)))?;

    let mut validation = Validation::new(header.alg);
    validation.insecure_disable_signature_validation();
    validation.required_spec_claims.clear();
    validation.validate_aud = false;

    decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => {
                ClientError::Authentication("Session expired, please sign in again".to_string())
            }
            _ => ClientError::Authentication(format!("Malformed access token: {}", e)),
        })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Email awaiting confirmation between sign-up and confirm
    #[serde(default)]
    pending_email: Option<String>,
    #[serde(default)]
    signed_in_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session for freshly issued tokens.
    pub fn signed_in(tokens: AuthTokens) -> Self {
        Self {
            access_token: Some(tokens.access_token),
            id_token: tokens.id_token,
            refresh_token: tokens.refresh_token,
            pending_email: None,
            signed_in_at: Some(Utc::now()),
        }
    }

    pub fn with_access_token(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
            signed_in_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.access_token().is_ok()
    }

    /// The bearer token. Absent, empty, or the literal `"undefined"` left by a
    /// broken storage round-trip all count as signed out.
    pub fn access_token(&self) -> ClientResult<&str> {
        match self.access_token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() && token != "undefined" => Ok(token),
            _ => Err(ClientError::Authentication(
                "Not signed in. Please sign in first".to_string(),
            )),
        }
    }

    pub fn id_token(&self) -> Option<&str> {
        self.id_token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn signed_in_at(&self) -> Option<DateTime<Utc>> {
        self.signed_in_at
    }

    pub fn claims(&self) -> ClientResult<TokenClaims> {
        decode_claims(self.access_token()?)
    }

    /// Caller's user id: the `sub` claim of the access token.
    pub fn user_id(&self) -> ClientResult<String> {
        self.claims()?
            .sub
            .filter(|sub| !sub.is_empty())
            .ok_or_else(|| {
                ClientError::Authentication("Access token has no subject claim".to_string())
            })
    }

    /// Drop all tokens. A pending confirmation email survives sign-out.
    pub fn sign_out(&mut self) {
        self.access_token = None;
        self.id_token = None;
        self.refresh_token = None;
        self.signed_in_at = None;
    }

    pub fn set_pending_email(&mut self, email: impl Into<String>) {
        self.pending_email = Some(email.into());
    }

    pub fn pending_email(&self) -> Option<&str> {
        self.pending_email.as_deref()
    }

    pub fn take_pending_email(&mut self) -> Option<String> {
        self.pending_email.take()
    }
}

/// JSON file holding the session between CLI invocations.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/scholar-hub/session.json`
    pub fn default_path() -> ClientResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("scholar-hub").join("session.json"))
            .ok_or_else(|| {
                ClientError::Config(
                    "Could not determine a config directory; set SCHOLAR_SESSION_FILE".to_string(),
                )
            })
    }

    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        match &config.session_file {
            Some(path) => Ok(Self::new(path.clone())),
            None => Ok(Self::new(Self::default_path()?)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored session. A missing file is an empty session.
    pub fn load(&self) -> ClientResult<Session> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Session::default()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&raw).map_err(|e| {
            ClientError::Config(format!(
                "Session file {} is corrupt: {}",
                self.path.display(),
                e
            ))
        })
    }

    pub fn save(&self, session: &Session) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        tracing::debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    pub fn clear(&self) -> ClientResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
