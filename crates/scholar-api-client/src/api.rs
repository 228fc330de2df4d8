//! Backend endpoints: post creation, listing, deletion, downloads, and profiles.

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use scholar_core::models::{normalize_posts, AttachmentFile, Category, Post, PostRecord, UserProfile};
use scholar_core::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};

use crate::envelope::normalize_payload;
use crate::{ApiClient, Session};

pub const CREATE_POST_PATH: &str = "/create-post";
pub const USER_POSTS_PATH: &str = "/get-user-posts";
pub const ALL_POSTS_PATH: &str = "/get-all-posts";
pub const DELETE_POST_PATH: &str = "/delete-post";
pub const DOWNLOAD_PATH: &str = "/download-object";
pub const USER_INFO_PATH: &str = "/get-user-info";

/// Marker the download endpoint returns when a post has no attachment.
const NOT_AVAILABLE: &str = "Not available";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateUploadRequest<'a> {
    pub user_id: &'a str,
    pub filename: &'a str,
    pub post_content: &'a str,
    pub selected_category: Category,
    pub file_type: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitiateUploadResponse {
    #[serde(default)]
    presigned_url: Option<String>,
    #[serde(default)]
    attachment_url: Option<String>,
    #[serde(default)]
    post_id: Option<String>,
}

/// Where to PUT the file, and the permanent URL to reference it by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub presigned_url: String,
    pub attachment_url: String,
    pub post_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizePostRequest<'a> {
    pub user_id: &'a str,
    pub post_content: &'a str,
    pub selected_category: Category,
    pub attachment_urls: Vec<&'a str>,
    pub status: &'static str,
}

impl<'a> FinalizePostRequest<'a> {
    pub fn completed(
        user_id: &'a str,
        post_content: &'a str,
        selected_category: Category,
        attachment_url: &'a str,
    ) -> Self {
        Self {
            user_id,
            post_content,
            selected_category,
            attachment_urls: vec![attachment_url],
            status: "completed",
        }
    }
}

/// Finalize acknowledgement. The backend may answer with an empty body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizePostResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub post_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct PostsResponse {
    #[serde(default)]
    posts: Vec<PostRecord>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserRequest<'a> {
    user_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PostIdRequest<'a> {
    post_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadUrlResponse {
    #[serde(default)]
    presigned_url: Option<String>,
    #[serde(default)]
    original_url: Option<String>,
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
}

/// Short-lived link to an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    pub url: String,
    pub original_url: Option<String>,
    pub expires_in_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct UserInfoResponse {
    user: UserProfile,
}

impl ApiClient {
    /// Step 1 of a submission: ask the backend for a presigned upload URL.
    #[tracing::instrument(skip(self, session, request), fields(file = %request.filename))]
    pub async fn initiate_upload(
        &self,
        session: &Session,
        request: &InitiateUploadRequest<'_>,
    ) -> ClientResult<UploadTarget> {
        let response: InitiateUploadResponse =
            self.post_json(CREATE_POST_PATH, session, request).await?;

        let presigned_url = response
            .presigned_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ClientError::backend("No presigned URL received from server"))?;
        let attachment_url = response
            .attachment_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ClientError::backend("No attachment URL received from server"))?;

        tracing::debug!(post_id = ?response.post_id, "Received presigned upload URL");
        Ok(UploadTarget {
            presigned_url,
            attachment_url,
            post_id: response.post_id,
        })
    }

    /// Step 2: PUT the raw bytes to object storage. No Authorization header
    /// is sent; the URL carries its own signature.
    #[tracing::instrument(skip(self, presigned_url, file), fields(file = %file.file_name, bytes = file.size()))]
    pub async fn upload_object(&self, presigned_url: &str, file: &AttachmentFile) -> ClientResult<()> {
        let response = self
            .client()
            .put(presigned_url)
            .header(CONTENT_TYPE, &file.content_type)
            .body(file.data.clone())
            .send()
            .await
            .map_err(|e| ClientError::Upload {
                status: e.status().map(|s| s.as_u16()),
                body: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::Upload {
                status: Some(status.as_u16()),
                body,
            });
        }

        tracing::info!("Uploaded attachment to object storage");
        Ok(())
    }

    /// Step 3: record the post with its attachment URL.
    #[tracing::instrument(skip(self, session, request))]
    pub async fn finalize_post(
        &self,
        session: &Session,
        request: &FinalizePostRequest<'_>,
    ) -> ClientResult<FinalizePostResponse> {
        let text = self.post_for_text(CREATE_POST_PATH, session, request).await?;

        // The step is judged by the HTTP status alone. The create function
        // answers a finalize body with an enveloped 400 even though the record
        // was already written at initiate time.
        let response = match normalize_payload::<FinalizePostResponse>(&text) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Finalize acknowledged with an error envelope");
                FinalizePostResponse::default()
            }
        };
        Ok(response)
    }

    /// The caller's own posts, in backend order.
    #[tracing::instrument(skip(self, session))]
    pub async fn list_user_posts(&self, session: &Session) -> ClientResult<Vec<Post>> {
        let user_id = session.user_id()?;
        let response: PostsResponse = self
            .post_json(USER_POSTS_PATH, session, &UserRequest { user_id: &user_id })
            .await?;
        let posts = normalize_posts(response.posts)?;
        tracing::debug!(count = posts.len(), "Fetched user posts");
        Ok(posts)
    }

    /// Every user's posts, newest first.
    #[tracing::instrument(skip(self, session))]
    pub async fn list_all_posts(&self, session: &Session) -> ClientResult<Vec<Post>> {
        let response: PostsResponse = self.get_json(ALL_POSTS_PATH, session).await?;
        let mut posts = normalize_posts(response.posts)?;
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tracing::debug!(count = posts.len(), "Fetched feed");
        Ok(posts)
    }

    #[tracing::instrument(skip(self, session))]
    pub async fn delete_post(&self, session: &Session, post_id: &str) -> ClientResult<()> {
        let _: serde_json::Value = self
            .post_json(DELETE_POST_PATH, session, &PostIdRequest { post_id })
            .await?;
        tracing::info!("Post deleted");
        Ok(())
    }

    /// Presigned GET link for a post's attachment.
    #[tracing::instrument(skip(self, session))]
    pub async fn get_download_url(&self, session: &Session, post_id: &str) -> ClientResult<DownloadLink> {
        let response: DownloadUrlResponse = self
            .post_json(DOWNLOAD_PATH, session, &PostIdRequest { post_id })
            .await?;

        let url = response
            .presigned_url
            .filter(|url| !url.is_empty() && url != NOT_AVAILABLE)
            .ok_or_else(|| {
                ClientError::backend(format!("No downloadable attachment for post {}", post_id))
            })?;

        // Sent as a string ("3600") by the backend.
        let expires_in_secs = match response.expires_in {
            Some(serde_json::Value::Number(n)) => n.as_u64(),
            Some(serde_json::Value::String(s)) => s.parse().ok(),
            _ => None,
        };

        Ok(DownloadLink {
            url,
            original_url: response.original_url.filter(|u| u != NOT_AVAILABLE),
            expires_in_secs,
        })
    }

    /// Fetch an object from a presigned URL. No Authorization header is sent.
    pub async fn fetch_object(&self, url: &str) -> ClientResult<Bytes> {
        let response = self.client().get(url).send().await.map_err(|e| {
            ClientError::Backend {
                status: e.status().map(|s| s.as_u16()),
                message: format!("Failed to download file: {}", e),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::backend_status(
                status.as_u16(),
                format!("Failed to download file: storage returned {}", status),
            ));
        }

        response.bytes().await.map_err(|e| {
            ClientError::backend_status(status.as_u16(), format!("Failed to read file: {}", e))
        })
    }

    /// Profile record the backend keeps for a user id.
    #[tracing::instrument(skip(self, session))]
    pub async fn get_user_profile(&self, session: &Session, user_id: &str) -> ClientResult<UserProfile> {
        let response: UserInfoResponse = self
            .post_json(USER_INFO_PATH, session, &UserRequest { user_id })
            .await?;
        Ok(response.user)
    }
}
