//! Feed and profile endpoint tests.
//!
//! Run with: `cargo test -p scholar-api-client --test feed_test`

mod helpers;

use helpers::auth::{signed_in_session, TEST_USER_ID};
use helpers::fixtures::{post_record, posts_payload};
use helpers::{envelope, setup_backend};
use mockito::Matcher;
use scholar_api_client::Session;
use scholar_core::ClientError;
use serde_json::json;

#[tokio::test]
async fn test_feed_is_newest_first() {
    let mut backend = setup_backend().await;
    let mut older = post_record("a", "research", "2024-01-01T09:00:00");
    older["userId"] = json!("someone-else");
    let newer = post_record("b", "discussion", "2024-02-01T09:00:00.500000");
    let undated = json!({ "postId": "c", "postContent": "legacy" });

    let mock = backend
        .server
        .mock("GET", "/get-all-posts")
        .match_header("authorization", Matcher::Regex("^Bearer .+".to_string()))
        .with_status(200)
        .with_body(envelope(200, posts_payload(vec![older, undated, newer])))
        .expect(1)
        .create_async()
        .await;

    let posts = backend
        .client
        .list_all_posts(&signed_in_session())
        .await
        .unwrap();
    mock.assert_async().await;

    let ids: Vec<_> = posts.iter().map(|p| p.post_id.as_str()).collect();
    assert_eq!(ids, ["b", "a", "c"]);
    assert_eq!(posts[1].user_id.as_deref(), Some("someone-else"));
}

#[tokio::test]
async fn test_empty_feed() {
    let mut backend = setup_backend().await;
    let _mock = backend
        .server
        .mock("GET", "/get-all-posts")
        .with_status(200)
        .with_body(envelope(200, json!({ "message": "No posts found" })))
        .create_async()
        .await;

    let posts = backend
        .client
        .list_all_posts(&signed_in_session())
        .await
        .unwrap();
    assert!(posts.is_empty());
}

#[tokio::test]
async fn test_rejected_token_is_authentication_error() {
    let mut backend = setup_backend().await;
    let _mock = backend
        .server
        .mock("GET", "/get-all-posts")
        .with_status(401)
        .with_body(json!({ "message": "Unauthorized" }).to_string())
        .create_async()
        .await;

    let err = backend
        .client
        .list_all_posts(&signed_in_session())
        .await
        .unwrap_err();
    assert!(err.requires_sign_in());
}

#[tokio::test]
async fn test_missing_token_sends_nothing() {
    let mut backend = setup_backend().await;
    let mock = backend
        .server
        .mock("GET", "/get-all-posts")
        .expect(0)
        .create_async()
        .await;

    let err = backend
        .client
        .list_all_posts(&Session::with_access_token("undefined"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Authentication(_)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_user_profile() {
    let mut backend = setup_backend().await;
    let mock = backend
        .server
        .mock("POST", "/get-user-info")
        .match_body(Matcher::Json(json!({ "userId": TEST_USER_ID })))
        .with_status(200)
        .with_body(envelope(
            200,
            json!({
                "user": {
                    "sub": TEST_USER_ID,
                    "email": "ada@uni.edu",
                    "name": "Ada Lovelace",
                    "role": "researcher"
                }
            }),
        ))
        .expect(1)
        .create_async()
        .await;

    let profile = backend
        .client
        .get_user_profile(&signed_in_session(), TEST_USER_ID)
        .await
        .unwrap();
    mock.assert_async().await;
    assert_eq!(profile.name, "Ada Lovelace");
    assert_eq!(profile.role, "researcher");
}

#[tokio::test]
async fn test_unknown_user_profile() {
    let mut backend = setup_backend().await;
    let _mock = backend
        .server
        .mock("POST", "/get-user-info")
        .with_status(200)
        .with_body(envelope(404, json!({ "error": "User not found" })))
        .create_async()
        .await;

    match backend
        .client
        .get_user_profile(&signed_in_session(), "missing")
        .await
    {
        Err(ClientError::Backend { status, message }) => {
            assert_eq!(status, Some(404));
            assert_eq!(message, "User not found");
        }
        other => panic!("unexpected result {other:?}"),
    }
}
