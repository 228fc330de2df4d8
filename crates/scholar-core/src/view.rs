//! Client-side filtering, searching, and sorting of an already-fetched post list.
//!
//! Nothing here re-queries the backend. Sorting is stable, so posts that compare
//! equal keep their fetched order.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ClientError;
use crate::models::{Category, Post, PostStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PostFilter {
    #[default]
    All,
    Drafts,
    Category(Category),
}

impl PostFilter {
    pub fn matches(&self, post: &Post) -> bool {
        match self {
            PostFilter::All => true,
            PostFilter::Drafts => post.status == PostStatus::Draft,
            PostFilter::Category(category) => post.category == *category,
        }
    }
}

impl FromStr for PostFilter {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(PostFilter::All),
            "drafts" | "draft" => Ok(PostFilter::Drafts),
            other => other.parse::<Category>().map(PostFilter::Category).map_err(|_| {
                ClientError::Validation(format!(
                    "Invalid filter '{}'. Must be: all, drafts, or a category",
                    other
                ))
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    MostLiked,
    MostViewed,
}

impl SortOrder {
    /// Ordering of `a` relative to `b`. Missing timestamps sort as oldest.
    pub fn compare(&self, a: &Post, b: &Post) -> Ordering {
        match self {
            SortOrder::Newest => b.created_at.cmp(&a.created_at),
            SortOrder::Oldest => a.created_at.cmp(&b.created_at),
            SortOrder::MostLiked => b.interactions.likes.cmp(&a.interactions.likes),
            SortOrder::MostViewed => b.interactions.views.cmp(&a.interactions.views),
        }
    }
}

impl FromStr for SortOrder {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newest" => Ok(SortOrder::Newest),
            "oldest" => Ok(SortOrder::Oldest),
            "most-liked" => Ok(SortOrder::MostLiked),
            "most-viewed" => Ok(SortOrder::MostViewed),
            other => Err(ClientError::Validation(format!(
                "Invalid sort '{}'. Must be: newest, oldest, most-liked, or most-viewed",
                other
            ))),
        }
    }
}

/// Filter, search, and sort selection for a post list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostQuery {
    pub filter: PostFilter,
    pub sort: SortOrder,
    /// Case-insensitive substring matched against post content
    pub search: String,
}

impl PostQuery {
    pub fn new(filter: PostFilter, sort: SortOrder, search: impl Into<String>) -> Self {
        Self {
            filter,
            sort,
            search: search.into(),
        }
    }

    /// Filter AND search predicate.
    pub fn matches(&self, post: &Post) -> bool {
        self.filter.matches(post)
            && (self.search.is_empty()
                || post
                    .content
                    .to_lowercase()
                    .contains(&self.search.to_lowercase()))
    }

    pub fn apply<'a>(&self, posts: &'a [Post]) -> Vec<&'a Post> {
        let mut visible: Vec<&Post> = posts.iter().filter(|p| self.matches(p)).collect();
        visible.sort_by(|a, b| self.sort.compare(a, b));
        visible
    }
}

/// Interaction totals across a post list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PostStats {
    pub posts: usize,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub views: u64,
}

impl PostStats {
    pub fn from_posts(posts: &[Post]) -> Self {
        posts.iter().fold(
            PostStats {
                posts: posts.len(),
                ..Default::default()
            },
            |acc, post| PostStats {
                likes: acc.likes + post.interactions.likes,
                comments: acc.comments + post.interactions.comments,
                shares: acc.shares + post.interactions.shares,
                views: acc.views + post.interactions.views,
                ..acc
            },
        )
    }
}
