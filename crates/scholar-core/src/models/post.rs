use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use super::attachment::Attachment;
use crate::error::{ClientError, ClientResult};

/// Post category. The set is fixed by the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Research,
    Question,
    Discussion,
    Collaboration,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Research,
        Category::Question,
        Category::Discussion,
        Category::Collaboration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Research => "research",
            Category::Question => "question",
            Category::Discussion => "discussion",
            Category::Collaboration => "collaboration",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "research" => Ok(Category::Research),
            "question" => Ok(Category::Question),
            "discussion" => Ok(Category::Discussion),
            "collaboration" => Ok(Category::Collaboration),
            other => Err(ClientError::Validation(format!(
                "Invalid category '{}'. Must be: research, question, discussion, or collaboration",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Published,
    Draft,
}

/// Interaction counters. The backend does not track these yet, so they
/// default to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interactions {
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub views: u64,
}

/// A post as presented to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub post_id: String,
    /// Author; only present in feed payloads
    pub user_id: Option<String>,
    pub content: String,
    pub category: Category,
    /// `None` when the backend stored no creation time
    pub created_at: Option<DateTime<Utc>>,
    pub attachments: Vec<Attachment>,
    pub interactions: Interactions,
    pub status: PostStatus,
}

/// Post record as returned by the list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub post_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub post_content: Option<String>,
    #[serde(default)]
    pub selected_category: Option<String>,
    #[serde(default)]
    pub attachment_urls: Option<Vec<String>>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub likes: Option<u64>,
    #[serde(default)]
    pub comments: Option<u64>,
    #[serde(default)]
    pub shares: Option<u64>,
    #[serde(default)]
    pub views: Option<u64>,
}

impl TryFrom<PostRecord> for Post {
    type Error = ClientError;

    fn try_from(record: PostRecord) -> Result<Self, Self::Error> {
        if record.post_id.trim().is_empty() {
            return Err(ClientError::backend("Post record is missing postId"));
        }

        // Empty category is what the backend stores for legacy rows.
        let category = match record.selected_category.as_deref().map(str::trim) {
            None | Some("") => Category::default(),
            Some(raw) => raw.parse().map_err(|_| {
                ClientError::backend(format!(
                    "Post {} has unknown category '{}'",
                    record.post_id, raw
                ))
            })?,
        };

        let created_at = match record.created_at.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_timestamp(raw).ok_or_else(|| {
                ClientError::backend(format!(
                    "Post {} has invalid createdAt '{}'",
                    record.post_id, raw
                ))
            })?),
        };

        let status = match record.status.as_deref() {
            Some(s) if s.eq_ignore_ascii_case("draft") => PostStatus::Draft,
            _ => PostStatus::Published,
        };

        let attachments = record
            .attachment_urls
            .unwrap_or_default()
            .iter()
            .map(|url| Attachment::from_url(url))
            .collect();

        Ok(Post {
            post_id: record.post_id,
            user_id: record.user_id.filter(|id| !id.is_empty()),
            content: record.post_content.unwrap_or_default(),
            category,
            created_at,
            attachments,
            interactions: Interactions {
                likes: record.likes.unwrap_or(0),
                comments: record.comments.unwrap_or(0),
                shares: record.shares.unwrap_or(0),
                views: record.views.unwrap_or(0),
            },
            status,
        })
    }
}

/// Convert a batch of records, failing on the first malformed one.
pub fn normalize_posts(records: Vec<PostRecord>) -> ClientResult<Vec<Post>> {
    records.into_iter().map(Post::try_from).collect()
}

/// Parse RFC 3339 timestamps, or naive ISO-8601 timestamps which are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttachmentKind;
    use chrono::{Datelike, Timelike};

    fn record(json: serde_json::Value) -> PostRecord {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("Research".parse::<Category>().unwrap(), Category::Research);
        assert_eq!(
            " collaboration ".parse::<Category>().unwrap(),
            Category::Collaboration
        );
        assert!(matches!(
            "biology".parse::<Category>(),
            Err(ClientError::Validation(_))
        ));
        assert_eq!(Category::default(), Category::Research);
        assert_eq!(Category::Question.to_string(), "question");
    }

    #[test]
    fn test_record_normalization_defaults() {
        let post = Post::try_from(record(serde_json::json!({
            "postId": "p1",
            "postContent": "Hello world",
            "selectedCategory": "question",
            "createdAt": "2025-03-01T10:15:30.123456"
        })))
        .unwrap();

        assert_eq!(post.post_id, "p1");
        assert_eq!(post.content, "Hello world");
        assert_eq!(post.category, Category::Question);
        assert!(post.attachments.is_empty());
        assert_eq!(post.interactions, Interactions::default());
        assert_eq!(post.status, PostStatus::Published);
        let created = post.created_at.unwrap();
        assert_eq!((created.year(), created.month(), created.day()), (2025, 3, 1));
        assert_eq!(created.hour(), 10);
    }

    #[test]
    fn test_record_attachments_inferred() {
        let post = Post::try_from(record(serde_json::json!({
            "postId": "p2",
            "postContent": "Data",
            "selectedCategory": "research",
            "attachmentUrls": [
                "https://bucket.s3.amazonaws.com/posts/p2/attachments/paper.pdf",
                "https://bucket.s3.amazonaws.com/posts/p2/attachments/data.docx"
            ],
            "createdAt": "2025-03-01T10:15:30Z"
        })))
        .unwrap();

        assert_eq!(post.attachments.len(), 2);
        assert_eq!(post.attachments[0].kind, AttachmentKind::Pdf);
        assert_eq!(post.attachments[1].name, "data.docx");
        assert_eq!(post.attachments[1].kind, AttachmentKind::Document);
    }

    #[test]
    fn test_record_null_attachments_and_empty_fields() {
        let post = Post::try_from(record(serde_json::json!({
            "postId": "p3",
            "attachmentUrls": null,
            "selectedCategory": "",
            "createdAt": ""
        })))
        .unwrap();
        assert!(post.attachments.is_empty());
        assert_eq!(post.category, Category::Research);
        assert!(post.created_at.is_none());
    }

    #[test]
    fn test_record_rejects_shape_mismatch() {
        let err = Post::try_from(record(serde_json::json!({
            "postId": "p4",
            "selectedCategory": "gossip"
        })))
        .unwrap_err();
        assert!(matches!(err, ClientError::Backend { .. }));

        let err = Post::try_from(record(serde_json::json!({
            "postId": "p5",
            "createdAt": "yesterday"
        })))
        .unwrap_err();
        assert!(err.to_string().contains("createdAt"));

        let err = Post::try_from(record(serde_json::json!({ "postId": "" }))).unwrap_err();
        assert!(err.to_string().contains("postId"));
    }

    #[test]
    fn test_draft_status() {
        let post = Post::try_from(record(serde_json::json!({
            "postId": "p6",
            "status": "DRAFT"
        })))
        .unwrap();
        assert_eq!(post.status, PostStatus::Draft);
    }
}
