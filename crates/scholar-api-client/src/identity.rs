//! Identity provider operations.
//!
//! [`CognitoIdentityClient`] speaks the user-pool JSON protocol directly over
//! HTTP: every call is a POST to the regional endpoint with an `X-Amz-Target`
//! header naming the action. Only public-client actions are used, so no
//! request signing is needed.

use async_trait::async_trait;
use reqwest::Client;
use scholar_core::models::{AuthTokens, Identity, Role};
use scholar_core::validation::{validate_otp, SignInForm, SignUpForm};
use scholar_core::{ClientConfig, ClientError, ClientResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";
const AMZ_JSON: &str = "application/x-amz-json-1.1";

/// Result of a sign-up request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpOutcome {
    pub user_sub: Option<String>,
    pub user_confirmed: bool,
    /// Masked address the confirmation code was sent to
    pub code_destination: Option<String>,
}

/// User identity operations.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a new account. The account stays unconfirmed until
    /// [`confirm_sign_up`](Self::confirm_sign_up) succeeds.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: Role,
    ) -> ClientResult<SignUpOutcome>;

    /// Confirm an account with the 6-digit code sent by email.
    async fn confirm_sign_up(&self, email: &str, code: &str) -> ClientResult<()>;

    async fn sign_in(&self, email: &str, password: &str) -> ClientResult<AuthTokens>;

    /// The identity behind an access token, or `None` when the token is no
    /// longer accepted.
    async fn get_current_user(&self, access_token: &str) -> ClientResult<Option<Identity>>;
}

#[derive(Debug, Clone)]
pub struct CognitoIdentityClient {
    client: Client,
    endpoint: String,
    client_id: String,
}

#[derive(Serialize)]
struct AttributeType<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Value")]
    value: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SignUpRequest<'a> {
    client_id: &'a str,
    username: &'a str,
    password: &'a str,
    user_attributes: Vec<AttributeType<'a>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SignUpResponse {
    #[serde(default)]
    user_sub: Option<String>,
    #[serde(default)]
    user_confirmed: bool,
    #[serde(default)]
    code_delivery_details: Option<CodeDeliveryDetails>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CodeDeliveryDetails {
    #[serde(default)]
    destination: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ConfirmSignUpRequest<'a> {
    client_id: &'a str,
    username: &'a str,
    confirmation_code: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthRequest<'a> {
    client_id: &'a str,
    auth_flow: &'static str,
    auth_parameters: AuthParameters<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct AuthParameters<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthResponse {
    #[serde(default)]
    authentication_result: Option<AuthenticationResult>,
    #[serde(default)]
    challenge_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    access_token: String,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetUserRequest<'a> {
    access_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetUserResponse {
    username: String,
    #[serde(default)]
    user_attributes: Vec<UserAttribute>,
}

#[derive(Deserialize)]
struct UserAttribute {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Value", default)]
    value: Option<String>,
}

#[derive(Deserialize, Default)]
struct ServiceErrorBody {
    #[serde(rename = "__type", default)]
    error_type: Option<String>,
    #[serde(default, alias = "Message")]
    message: Option<String>,
}

impl CognitoIdentityClient {
    pub fn new(
        endpoint: impl Into<String>,
        client_id: impl Into<String>,
        timeout: Duration,
    ) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            client_id: client_id.into(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        let client_id = config
            .require_cognito_client_id()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        Self::new(
            config.identity_endpoint(),
            client_id,
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    async fn call<B: Serialize, T: DeserializeOwned>(&self, action: &str, body: &B) -> ClientResult<T> {
        let payload = serde_json::to_vec(body)?;
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Amz-Target", format!("{}.{}", TARGET_PREFIX, action))
            .header("Content-Type", AMZ_JSON)
            .body(payload)
            .send()
            .await
            .map_err(|e| ClientError::Backend {
                status: e.status().map(|s| s.as_u16()),
                message: format!("Failed to reach identity provider: {}", e),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            ClientError::backend_status(status.as_u16(), format!("Failed to read response: {}", e))
        })?;

        if !status.is_success() {
            let body: ServiceErrorBody = serde_json::from_str(&text).unwrap_or_default();
            let kind = body
                .error_type
                .as_deref()
                .map(short_error_type)
                .unwrap_or("UnknownError")
                .to_string();
            let message = body.message.unwrap_or_else(|| status.to_string());
            tracing::debug!(action, status = status.as_u16(), error_type = %kind, "Identity provider rejected request");
            return Err(map_service_error(status.as_u16(), &kind, message));
        }

        let text = if text.trim().is_empty() { "{}" } else { text.as_str() };
        serde_json::from_str(text).map_err(|e| {
            ClientError::backend(format!("Unexpected identity provider response: {}", e))
        })
    }
}

/// `"com.amazonaws...#NotAuthorizedException"` -> `"NotAuthorizedException"`
fn short_error_type(raw: &str) -> &str {
    let raw = raw.rsplit('#').next().unwrap_or(raw);
    raw.split(':').next().unwrap_or(raw)
}

fn map_service_error(status: u16, kind: &str, message: String) -> ClientError {
    match kind {
        "NotAuthorizedException" | "UserNotConfirmedException" | "UserNotFoundException"
        | "PasswordResetRequiredException" => ClientError::Authentication(message),
        "UsernameExistsException"
        | "InvalidPasswordException"
        | "InvalidParameterException"
        | "CodeMismatchException"
        | "ExpiredCodeException"
        | "AliasExistsException" => ClientError::Validation(message),
        _ => ClientError::backend_status(status, message),
    }
}

#[async_trait]
impl IdentityProvider for CognitoIdentityClient {
    #[tracing::instrument(skip(self, password), fields(role = %role))]
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: Role,
    ) -> ClientResult<SignUpOutcome> {
        let form = SignUpForm {
            email: email.trim().to_string(),
            password: password.to_string(),
            name: name.trim().to_string(),
            role,
        };
        form.validate()?;

        let role_name = role.to_string();
        let request = SignUpRequest {
            client_id: &self.client_id,
            username: &form.email,
            password: &form.password,
            user_attributes: vec![
                AttributeType { name: "email", value: &form.email },
                AttributeType { name: "name", value: &form.name },
                AttributeType { name: "custom:role", value: &role_name },
            ],
        };

        let response: SignUpResponse = self.call("SignUp", &request).await?;
        tracing::info!(user_confirmed = response.user_confirmed, "Sign-up accepted");

        Ok(SignUpOutcome {
            user_sub: response.user_sub,
            user_confirmed: response.user_confirmed,
            code_destination: response.code_delivery_details.and_then(|d| d.destination),
        })
    }

    #[tracing::instrument(skip(self, code))]
    async fn confirm_sign_up(&self, email: &str, code: &str) -> ClientResult<()> {
        let code = code.trim();
        validate_otp(code)?;

        let request = ConfirmSignUpRequest {
            client_id: &self.client_id,
            username: email.trim(),
            confirmation_code: code,
        };
        let _: serde_json::Value = self.call("ConfirmSignUp", &request).await?;
        tracing::info!("Account confirmed");
        Ok(())
    }

    #[tracing::instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> ClientResult<AuthTokens> {
        let form = SignInForm {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        form.validate()?;

        let request = InitiateAuthRequest {
            client_id: &self.client_id,
            auth_flow: "USER_PASSWORD_AUTH",
            auth_parameters: AuthParameters {
                username: &form.email,
                password: &form.password,
            },
        };
        let response: InitiateAuthResponse = self.call("InitiateAuth", &request).await?;

        let result = match (response.authentication_result, response.challenge_name) {
            (Some(result), _) => result,
            (None, Some(challenge)) => {
                return Err(ClientError::Authentication(format!(
                    "Sign-in requires an unsupported challenge: {}",
                    challenge
                )))
            }
            (None, None) => {
                return Err(ClientError::backend(
                    "Identity provider returned no tokens",
                ))
            }
        };

        tracing::info!("Signed in");
        Ok(AuthTokens {
            access_token: result.access_token,
            id_token: result.id_token,
            refresh_token: result.refresh_token,
            expires_in: result.expires_in,
        })
    }

    #[tracing::instrument(skip_all)]
    async fn get_current_user(&self, access_token: &str) -> ClientResult<Option<Identity>> {
        let request = GetUserRequest { access_token };
        let response: GetUserResponse = match self.call("GetUser", &request).await {
            Ok(response) => response,
            Err(ClientError::Authentication(message)) => {
                tracing::debug!(%message, "Access token no longer accepted");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let attribute = |key: &str| {
            response
                .user_attributes
                .iter()
                .find(|a| a.name == key)
                .and_then(|a| a.value.clone())
        };

        Ok(Some(Identity {
            sub: attribute("sub"),
            email: attribute("email"),
            name: attribute("name"),
            role: attribute("custom:role"),
            username: response.username.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_error_type() {
        assert_eq!(short_error_type("NotAuthorizedException"), "NotAuthorizedException");
        assert_eq!(
            short_error_type("com.amazonaws.cognito#CodeMismatchException"),
            "CodeMismatchException"
        );
    }

    #[test]
    fn test_service_error_mapping() {
        assert!(map_service_error(400, "NotAuthorizedException", "bad".into()).requires_sign_in());
        assert!(matches!(
            map_service_error(400, "CodeMismatchException", "bad code".into()),
            ClientError::Validation(_)
        ));
        assert!(matches!(
            map_service_error(500, "InternalErrorException", "oops".into()),
            ClientError::Backend { status: Some(500), .. }
        ));
    }

    #[test]
    fn test_auth_parameters_wire_names() {
        let params = AuthParameters {
            username: "ada@uni.edu",
            password: "pw",
        };
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            serde_json::json!({ "USERNAME": "ada@uni.edu", "PASSWORD": "pw" })
        );
    }
}
