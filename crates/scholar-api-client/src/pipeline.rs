//! Post submission pipeline.
//!
//! A submission runs three steps in strict order: initiate (the backend
//! returns a presigned upload URL), upload (PUT the bytes to object storage),
//! finalize (record the post with its attachment URL). A failure at any step
//! stops the pipeline; no later step runs and no post is reported as created.

use scholar_core::models::{
    Attachment, AttachmentFile, Category, Interactions, Post, PostStatus, UploadSession,
};
use scholar_core::validation::{validate_attachment, validate_post_content};
use scholar_core::{ClientError, ClientResult, OperationState, OperationTracker};
use std::path::Path;

use crate::api::{FinalizePostRequest, InitiateUploadRequest};
use crate::{ApiClient, Session};

/// Message shown after a successful submission.
pub const POST_CREATED_MESSAGE: &str = "Post created successfully!";

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    /// The created post, when the backend reported its id
    pub post: Option<Post>,
    pub attachment_url: String,
    /// Files that were selected but not uploaded; one attachment per post
    pub skipped_files: Vec<String>,
}

/// Create a post with one document attachment.
///
/// Checks run before any network activity, in this order: signed-in user,
/// non-blank content, at least one file. Only the first file is uploaded.
#[tracing::instrument(skip_all, fields(category = %category, files = files.len()))]
pub async fn submit_post(
    client: &ApiClient,
    session: &Session,
    content: &str,
    category: Category,
    files: &[AttachmentFile],
) -> ClientResult<SubmitOutcome> {
    let user_id = session.user_id()?;
    validate_post_content(content)?;
    let (file, rest) = files.split_first().ok_or_else(|| {
        ClientError::Validation("Please attach a document to your post.".to_string())
    })?;

    let skipped_files: Vec<String> = rest.iter().map(|f| f.file_name.clone()).collect();
    if !skipped_files.is_empty() {
        tracing::warn!(skipped = ?skipped_files, "Only the first attachment is uploaded");
    }

    let mut upload = UploadSession::new(file);

    let target = client
        .initiate_upload(
            session,
            &InitiateUploadRequest {
                user_id: &user_id,
                filename: &file.file_name,
                post_content: content,
                selected_category: category,
                file_type: &file.content_type,
            },
        )
        .await?;
    upload.presigned_url = Some(target.presigned_url.clone());
    upload.attachment_url = Some(target.attachment_url.clone());
    upload.post_id = target.post_id.clone();

    client
        .upload_object(&target.presigned_url, upload.file)
        .await?;
    upload.uploaded = true;

    let finalized = client
        .finalize_post(
            session,
            &FinalizePostRequest::completed(&user_id, content, category, &target.attachment_url),
        )
        .await?;

    // The record is keyed by the id issued at initiate time. Without one the
    // post exists but can only be seen after a refresh.
    let post_id = upload.post_id.or(finalized.post_id);
    tracing::info!(post_id = ?post_id, uploaded = upload.uploaded, "Post created");

    let post = post_id.map(|post_id| Post {
        post_id,
        user_id: Some(user_id),
        content: content.to_string(),
        category,
        created_at: Some(chrono::Utc::now()),
        attachments: vec![Attachment::from_url(&target.attachment_url)],
        interactions: Interactions::default(),
        status: PostStatus::Published,
    });

    Ok(SubmitOutcome {
        post,
        attachment_url: target.attachment_url,
        skipped_files,
    })
}

/// Notice shown by the composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerMessage {
    Success(String),
    Error(String),
}

/// Form state for a new post.
///
/// At most one submission runs at a time; [`submissions`](Self::submissions)
/// hands out a tracker that observers can poll to disable the submit action.
#[derive(Debug, Default)]
pub struct PostComposer {
    content: String,
    category: Category,
    attachments: Vec<AttachmentFile>,
    message: Option<ComposerMessage>,
    submissions: OperationTracker<()>,
}

impl PostComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn set_category(&mut self, category: Category) {
        self.category = category;
    }

    pub fn attachments(&self) -> &[AttachmentFile] {
        &self.attachments
    }

    /// Add a file after checking it against the attachment policy. A rejected
    /// file leaves the selection unchanged.
    pub fn add_attachment(&mut self, mut file: AttachmentFile) -> ClientResult<()> {
        match validate_attachment(&file.file_name, Some(&file.content_type)) {
            Ok(content_type) => {
                file.content_type = content_type;
                self.attachments.push(file);
                Ok(())
            }
            Err(e) => {
                self.message = Some(ComposerMessage::Error(e.user_message()));
                Err(e)
            }
        }
    }

    /// Read a local file and add it. The content type comes from the extension.
    pub async fn attach_path(&mut self, path: &Path) -> ClientResult<()> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ClientError::Validation(format!("'{}' is not a file", path.display()))
            })?
            .to_string();
        let content_type = validate_attachment(&file_name, None)?;
        let data = tokio::fs::read(path).await?;
        self.add_attachment(AttachmentFile::new(file_name, content_type, data))
    }

    pub fn remove_attachment(&mut self, index: usize) -> Option<AttachmentFile> {
        (index < self.attachments.len()).then(|| self.attachments.remove(index))
    }

    pub fn message(&self) -> Option<&ComposerMessage> {
        self.message.as_ref()
    }

    pub fn dismiss_message(&mut self) {
        self.message = None;
    }

    pub fn submissions(&self) -> OperationTracker<()> {
        self.submissions.clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.submissions.is_in_flight(&())
    }

    pub fn can_submit(&self) -> bool {
        !self.is_submitting() && !self.content.trim().is_empty()
    }

    /// Run the pipeline with the current form state.
    ///
    /// On success the form is reset (category back to research) and a success
    /// message is set. On failure the form is kept as-is for a retry.
    pub async fn submit(&mut self, client: &ApiClient, session: &Session) -> ClientResult<SubmitOutcome> {
        let guard = self.submissions.try_begin(()).ok_or_else(|| {
            ClientError::Validation("A post is already being submitted".to_string())
        })?;
        self.message = None;

        let result = submit_post(
            client,
            session,
            &self.content,
            self.category,
            &self.attachments,
        )
        .await;

        match &result {
            Ok(_) => {
                guard.finish();
                self.content.clear();
                self.category = Category::default();
                self.attachments.clear();
                self.message = Some(ComposerMessage::Success(POST_CREATED_MESSAGE.to_string()));
            }
            Err(e) => {
                let text = format!("Error: {}", e.user_message());
                guard.fail(text.clone());
                self.message = Some(ComposerMessage::Error(text));
            }
        }
        result
    }

    /// Last submission failure, if not yet dismissed.
    pub fn last_failure(&self) -> Option<String> {
        match self.submissions.state(&()) {
            OperationState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn pdf(name: &str) -> AttachmentFile {
        AttachmentFile::new(name, "application/pdf", b"%PDF-1.4".to_vec())
    }

    #[test]
    fn test_add_attachment_policy() {
        let mut composer = PostComposer::new();
        composer.add_attachment(pdf("notes.pdf")).unwrap();

        let err = composer
            .add_attachment(AttachmentFile::new("cat.png", "image/png", vec![1, 2, 3]))
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert_eq!(composer.attachments().len(), 1);
        assert!(matches!(composer.message(), Some(ComposerMessage::Error(_))));
    }

    #[test]
    fn test_remove_attachment_out_of_range() {
        let mut composer = PostComposer::new();
        composer.add_attachment(pdf("a.pdf")).unwrap();
        assert!(composer.remove_attachment(3).is_none());
        assert_eq!(composer.remove_attachment(0).unwrap().file_name, "a.pdf");
        assert!(composer.attachments().is_empty());
    }

    #[test]
    fn test_can_submit_requires_content() {
        let mut composer = PostComposer::new();
        assert!(!composer.can_submit());
        composer.set_content("   ");
        assert!(!composer.can_submit());
        composer.set_content("Hello");
        assert!(composer.can_submit());
    }

    #[tokio::test]
    async fn test_submit_without_session_touches_no_network() {
        // Unroutable base URL: any request would fail with a backend error.
        let client = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let mut composer = PostComposer::new();
        composer.set_content("Hello world");
        composer.add_attachment(pdf("notes.pdf")).unwrap();

        let err = composer.submit(&client, &Session::new()).await.unwrap_err();
        assert!(err.requires_sign_in());
        assert_eq!(composer.content(), "Hello world");
        assert_eq!(composer.attachments().len(), 1);
        assert!(!composer.is_submitting());
        assert!(composer.last_failure().is_some());
    }

    #[tokio::test]
    async fn test_attach_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.docx");
        std::fs::write(&path, b"docx bytes").unwrap();

        let mut composer = PostComposer::new();
        composer.attach_path(&path).await.unwrap();
        let file = &composer.attachments()[0];
        assert_eq!(file.file_name, "paper.docx");
        assert_eq!(
            file.content_type,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(file.size(), 10);

        assert!(composer.attach_path(&dir.path().join("x.exe")).await.is_err());
    }
}
