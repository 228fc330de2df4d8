//! The caller's own posts: fetch, filter/sort/search, edit, delete, download.
//!
//! All list state lives behind a mutex that is never held across an await, so
//! operations on different posts may run concurrently from different tasks.
//! Deletes and downloads are tracked per entity with [`OperationTracker`].

use scholar_core::models::Post;
use scholar_core::validation::validate_post_content;
use scholar_core::{
    ClientError, ClientResult, OperationState, OperationTracker, PostQuery, PostStats,
};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::{ApiClient, Session};

/// Identifies one attachment download.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DownloadKey {
    pub post_id: String,
    pub file_name: String,
}

impl DownloadKey {
    pub fn new(post_id: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            post_id: post_id.into(),
            file_name: file_name.into(),
        }
    }
}

/// A post being edited. Edits stay local until saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub post_id: String,
    pub content: String,
}

#[derive(Debug, Default)]
struct ViewState {
    posts: Vec<Post>,
    loaded: bool,
    pending_delete: Option<String>,
    editing: Option<EditDraft>,
    error: Option<String>,
}

pub struct MyPosts {
    client: ApiClient,
    session: Session,
    state: Mutex<ViewState>,
    deletes: OperationTracker<String>,
    downloads: OperationTracker<DownloadKey>,
}

impl MyPosts {
    pub fn new(client: ApiClient, session: Session) -> Self {
        Self {
            client,
            session,
            state: Mutex::new(ViewState::default()),
            deletes: OperationTracker::new(),
            downloads: OperationTracker::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record_error(&self, err: &ClientError) {
        self.state().error = Some(err.user_message());
    }

    /// Fetch the caller's posts, replacing the local list.
    ///
    /// On failure the previous list is kept and the error is recorded.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self) -> ClientResult<usize> {
        match self.client.list_user_posts(&self.session).await {
            Ok(posts) => {
                let count = posts.len();
                let mut state = self.state();
                state.posts = posts;
                state.loaded = true;
                state.error = None;
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch posts");
                self.record_error(&e);
                Err(e)
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.state().loaded
    }

    /// All fetched posts in backend order.
    pub fn posts(&self) -> Vec<Post> {
        self.state().posts.clone()
    }

    /// Posts matching `query`, in the query's sort order. Never re-queries the backend.
    pub fn visible(&self, query: &PostQuery) -> Vec<Post> {
        let state = self.state();
        query.apply(&state.posts).into_iter().cloned().collect()
    }

    pub fn stats(&self) -> PostStats {
        PostStats::from_posts(&self.state().posts)
    }

    /// Add a post created in this session without waiting for a refresh.
    pub fn record_created(&self, post: Post) {
        let mut state = self.state();
        state.posts.retain(|p| p.post_id != post.post_id);
        state.posts.insert(0, post);
    }

    // Delete

    /// Open the confirmation prompt for `post_id`.
    ///
    /// An id that is not in the list only closes any open prompt.
    pub fn request_delete(&self, post_id: &str) -> ClientResult<()> {
        let mut state = self.state();
        if !state.posts.iter().any(|p| p.post_id == post_id) {
            tracing::debug!(post_id, "Delete requested for a post not in the list");
            state.pending_delete = None;
            return Ok(());
        }
        state.pending_delete = Some(post_id.to_string());
        Ok(())
    }

    pub fn pending_delete(&self) -> Option<String> {
        self.state().pending_delete.clone()
    }

    pub fn cancel_delete(&self) {
        self.state().pending_delete = None;
    }

    /// Delete the post whose confirmation prompt is open.
    ///
    /// Fails with a validation error when `post_id` was not confirmed first or
    /// a delete of the same post is already in flight. A post that is not in
    /// the list is not sent to the backend; the prompt is closed and the list
    /// is left as it is.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_delete(&self, post_id: &str) -> ClientResult<()> {
        {
            let mut state = self.state();
            if !state.posts.iter().any(|p| p.post_id == post_id) {
                state.pending_delete = None;
                return Ok(());
            }
        }
        if self.state().pending_delete.as_deref() != Some(post_id) {
            return Err(ClientError::Validation(
                "Deleting a post must be confirmed first".to_string(),
            ));
        }

        let guard = self.deletes.try_begin(post_id.to_string()).ok_or_else(|| {
            ClientError::Validation(format!("Post {} is already being deleted", post_id))
        })?;

        match self.client.delete_post(&self.session, post_id).await {
            Ok(()) => {
                guard.finish();
                let mut state = self.state();
                state.posts.retain(|p| p.post_id != post_id);
                state.pending_delete = None;
                if state.editing.as_ref().is_some_and(|d| d.post_id == post_id) {
                    state.editing = None;
                }
                Ok(())
            }
            Err(e) => {
                guard.fail(e.user_message());
                self.record_error(&e);
                Err(e)
            }
        }
    }

    pub fn is_deleting(&self, post_id: &str) -> bool {
        self.deletes.is_in_flight(&post_id.to_string())
    }

    pub fn delete_state(&self, post_id: &str) -> OperationState {
        self.deletes.state(&post_id.to_string())
    }

    // Edit

    pub fn start_edit(&self, post_id: &str) -> ClientResult<()> {
        let mut state = self.state();
        let content = state
            .posts
            .iter()
            .find(|p| p.post_id == post_id)
            .map(|p| p.content.clone())
            .ok_or_else(|| ClientError::Validation(format!("Unknown post {}", post_id)))?;
        state.editing = Some(EditDraft {
            post_id: post_id.to_string(),
            content,
        });
        Ok(())
    }

    pub fn editing(&self) -> Option<EditDraft> {
        self.state().editing.clone()
    }

    pub fn update_edit(&self, content: impl Into<String>) -> ClientResult<()> {
        match self.state().editing.as_mut() {
            Some(draft) => {
                draft.content = content.into();
                Ok(())
            }
            None => Err(ClientError::Validation("No post is being edited".to_string())),
        }
    }

    /// Apply the draft to the local list. There is no backend edit endpoint,
    /// so the change lasts until the next refresh.
    pub fn save_edit(&self) -> ClientResult<Post> {
        let mut state = self.state();
        let draft = state
            .editing
            .clone()
            .ok_or_else(|| ClientError::Validation("No post is being edited".to_string()))?;
        validate_post_content(&draft.content)?;

        let post = state
            .posts
            .iter_mut()
            .find(|p| p.post_id == draft.post_id)
            .ok_or_else(|| ClientError::Validation(format!("Unknown post {}", draft.post_id)))?;
        post.content = draft.content;
        let saved = post.clone();
        state.editing = None;
        Ok(saved)
    }

    pub fn cancel_edit(&self) {
        self.state().editing = None;
    }

    // Download

    /// Download a post's attachment into `dest_dir`.
    ///
    /// Downloads are keyed by post and file name, so different attachments
    /// download concurrently while a repeat of the same one is refused.
    #[tracing::instrument(skip(self, dest_dir))]
    pub async fn download(&self, post_id: &str, file_name: &str, dest_dir: &Path) -> ClientResult<PathBuf> {
        let key = DownloadKey::new(post_id, file_name);
        let guard = self.downloads.try_begin(key).ok_or_else(|| {
            ClientError::Validation(format!("{} is already downloading", file_name))
        })?;

        match self.fetch_to(post_id, file_name, dest_dir).await {
            Ok(path) => {
                guard.finish();
                tracing::info!(path = %path.display(), "Downloaded attachment");
                Ok(path)
            }
            Err(e) => {
                guard.fail(e.user_message());
                self.record_error(&e);
                Err(e)
            }
        }
    }

    async fn fetch_to(&self, post_id: &str, file_name: &str, dest_dir: &Path) -> ClientResult<PathBuf> {
        let link = self.client.get_download_url(&self.session, post_id).await?;
        let bytes = self.client.fetch_object(&link.url).await?;

        // Never let a stored name escape the destination directory.
        let safe_name = Path::new(file_name)
            .file_name()
            .filter(|name| !name.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("attachment"));
        let path = dest_dir.join(safe_name);

        tokio::fs::create_dir_all(dest_dir).await?;
        tokio::fs::write(&path, &bytes).await?;
        Ok(path)
    }

    pub fn is_downloading(&self, post_id: &str, file_name: &str) -> bool {
        self.downloads.is_in_flight(&DownloadKey::new(post_id, file_name))
    }

    pub fn download_state(&self, post_id: &str, file_name: &str) -> OperationState {
        self.downloads.state(&DownloadKey::new(post_id, file_name))
    }

    /// Number of downloads currently running.
    pub fn active_downloads(&self) -> usize {
        self.downloads.in_flight_count()
    }

    // Errors

    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    /// Dismiss the notice along with failed delete and download states.
    pub fn dismiss_error(&self) {
        self.state().error = None;
        self.deletes.clear_failures();
        self.downloads.clear_failures();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholar_core::models::{Category, Interactions, PostStatus};
    use std::time::Duration;

    fn post(id: &str, content: &str) -> Post {
        Post {
            post_id: id.to_string(),
            user_id: None,
            content: content.to_string(),
            category: Category::Research,
            created_at: None,
            attachments: Vec::new(),
            interactions: Interactions::default(),
            status: PostStatus::Published,
        }
    }

    fn view() -> MyPosts {
        let client = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let view = MyPosts::new(client, Session::new());
        view.record_created(post("p2", "second"));
        view.record_created(post("p1", "first"));
        view
    }

    #[test]
    fn test_record_created_prepends() {
        let view = view();
        let ids: Vec<_> = view.posts().into_iter().map(|p| p.post_id).collect();
        assert_eq!(ids, ["p1", "p2"]);
    }

    #[test]
    fn test_edit_flow() {
        let view = view();
        view.start_edit("p1").unwrap();
        view.update_edit("edited").unwrap();
        let saved = view.save_edit().unwrap();
        assert_eq!(saved.content, "edited");
        assert_eq!(view.posts()[0].content, "edited");
        assert!(view.editing().is_none());
    }

    #[test]
    fn test_edit_rejects_blank_and_unknown() {
        let view = view();
        assert!(view.start_edit("missing").is_err());
        view.start_edit("p2").unwrap();
        view.update_edit("   ").unwrap();
        assert!(matches!(view.save_edit(), Err(ClientError::Validation(_))));
        view.cancel_edit();
        assert!(view.update_edit("x").is_err());
        assert_eq!(view.posts()[1].content, "second");
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let view = view();
        let err = view.confirm_delete("p1").await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));

        view.request_delete("p1").unwrap();
        assert_eq!(view.pending_delete().as_deref(), Some("p1"));
        view.cancel_delete();
        assert!(view.pending_delete().is_none());
    }

    #[tokio::test]
    async fn test_delete_of_unlisted_post_only_closes_prompt() {
        let view = view();
        view.request_delete("p1").unwrap();

        view.request_delete("ghost").unwrap();
        assert!(view.pending_delete().is_none());

        view.request_delete("p1").unwrap();
        view.confirm_delete("ghost").await.unwrap();
        assert!(view.pending_delete().is_none());
        assert_eq!(view.posts().len(), 2);
        assert_eq!(view.delete_state("ghost"), OperationState::Idle);
    }

    #[tokio::test]
    async fn test_delete_without_session_keeps_post() {
        let view = view();
        view.request_delete("p1").unwrap();
        let err = view.confirm_delete("p1").await.unwrap_err();
        assert!(err.requires_sign_in());
        assert_eq!(view.posts().len(), 2);
        assert!(!view.is_deleting("p1"));
        assert!(matches!(view.delete_state("p1"), OperationState::Failed(_)));
        assert!(view.error().is_some());
        view.dismiss_error();
        assert!(view.error().is_none());
        assert_eq!(view.delete_state("p1"), OperationState::Idle);
    }
}
