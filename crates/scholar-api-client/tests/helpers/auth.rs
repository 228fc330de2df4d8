use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use scholar_api_client::Session;
use serde_json::json;

pub const TEST_USER_ID: &str = "3f9c2a1e-user-sub";

/// Access token shaped like an identity-provider token, signed with a test key.
/// The client never verifies signatures.
pub fn access_token(sub: &str) -> String {
    let claims = json!({
        "sub": sub,
        "username": "ada",
        "token_use": "access",
        "exp": Utc::now().timestamp() + 3600,
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"test-signing-key"),
    )
    .expect("encode token")
}

pub fn signed_in_session() -> Session {
    Session::with_access_token(access_token(TEST_USER_ID))
}

/// Expected Authorization header value for `session`.
pub fn bearer(session: &Session) -> String {
    format!("Bearer {}", session.access_token().expect("token"))
}
