//! Response envelope normalization.
//!
//! The backend's functions sit behind a non-proxy gateway integration, so a
//! response body is either the payload itself or an envelope of the form
//! `{"statusCode": 200, "body": ...}` where `body` is a JSON-encoded string or
//! an already-decoded object. Every endpoint goes through [`normalize_payload`],
//! which unwraps the envelope once and then deserializes into the endpoint's
//! strict schema. Any mismatch is a typed `Backend` error.

use scholar_core::{ClientError, ClientResult};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Unwrap and deserialize a response body. An empty body is treated as `{}`.
pub fn normalize_payload<T: DeserializeOwned>(body: &str) -> ClientResult<T> {
    let value = if body.trim().is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_str(body)
            .map_err(|e| ClientError::backend(format!("Response is not valid JSON: {}", e)))?
    };

    let payload = unwrap_envelope(value)?;
    serde_json::from_value(payload)
        .map_err(|e| ClientError::backend(format!("Unexpected response shape: {}", e)))
}

/// Return the payload inside an envelope, or the value itself when it is not one.
///
/// An envelope whose `statusCode` is outside 2xx becomes a `Backend` error
/// carrying that status and the inner `error`/`message`.
pub fn unwrap_envelope(value: Value) -> ClientResult<Value> {
    let mut object = match value {
        Value::Object(object) => object,
        other => return Ok(other),
    };
    let body = match object.remove("body") {
        Some(body) => body,
        None => return Ok(Value::Object(object)),
    };

    let status = object.get("statusCode").and_then(status_code);
    let inner = match body {
        Value::String(encoded) if encoded.trim().is_empty() => Value::Object(Map::new()),
        Value::String(encoded) => serde_json::from_str(&encoded).map_err(|e| {
            ClientError::backend(format!("Response envelope body is not valid JSON: {}", e))
        })?,
        inner @ (Value::Object(_) | Value::Array(_)) => inner,
        other => {
            return Err(ClientError::backend(format!(
                "Response envelope body has unexpected type: {}",
                type_name(&other)
            )))
        }
    };

    if let Some(code) = status {
        if !(200..300).contains(&code) {
            let message = message_from_value(&inner).unwrap_or_else(|| "Unknown error".to_string());
            return Err(ClientError::backend_status(code, message));
        }
    }

    Ok(inner)
}

/// Best-effort extraction of an error message from a raw response body.
pub fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    if let Some(message) = message_from_value(&value) {
        return Some(message);
    }
    match value.get("body") {
        Some(Value::String(encoded)) => {
            let inner: Value = serde_json::from_str(encoded).ok()?;
            message_from_value(&inner)
        }
        Some(inner) => message_from_value(inner),
        None => None,
    }
}

fn message_from_value(value: &Value) -> Option<String> {
    ["error", "message", "Message"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn status_code(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Upload {
        presigned_url: String,
    }

    #[test]
    fn test_string_encoded_body() {
        let body = r#"{"statusCode":200,"body":"{\"presignedUrl\":\"https://s3/put\"}"}"#;
        let payload: Upload = normalize_payload(body).unwrap();
        assert_eq!(payload.presigned_url, "https://s3/put");
    }

    #[test]
    fn test_object_body_and_bare_payload() {
        let enveloped = r#"{"statusCode":200,"body":{"presignedUrl":"https://s3/a"}}"#;
        let bare = r#"{"presignedUrl":"https://s3/b"}"#;
        assert_eq!(
            normalize_payload::<Upload>(enveloped).unwrap().presigned_url,
            "https://s3/a"
        );
        assert_eq!(
            normalize_payload::<Upload>(bare).unwrap().presigned_url,
            "https://s3/b"
        );
    }

    #[test]
    fn test_inner_error_status() {
        let body = r#"{"statusCode":400,"body":"{\"error\":\"Missing required fields\"}"}"#;
        match normalize_payload::<Upload>(body).unwrap_err() {
            ClientError::Backend { status, message } => {
                assert_eq!(status, Some(400));
                assert_eq!(message, "Missing required fields");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_shape_mismatch_fails_loudly() {
        assert!(matches!(
            normalize_payload::<Upload>(r#"{"body":"not json"}"#),
            Err(ClientError::Backend { .. })
        ));
        assert!(matches!(
            normalize_payload::<Upload>(r#"{"body":42}"#),
            Err(ClientError::Backend { .. })
        ));
        assert!(matches!(
            normalize_payload::<Upload>(r#"{"statusCode":200,"body":"{}"}"#),
            Err(ClientError::Backend { .. })
        ));
        assert!(matches!(
            normalize_payload::<Upload>("<html>gateway timeout</html>"),
            Err(ClientError::Backend { .. })
        ));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error":"Post not found"}"#).as_deref(),
            Some("Post not found")
        );
        assert_eq!(
            error_message(r#"{"statusCode":500,"body":"{\"error\":\"boom\"}"}"#).as_deref(),
            Some("boom")
        );
        assert_eq!(error_message("plain text"), None);
    }
}
