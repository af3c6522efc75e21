use crate::domain::comment::CommentResponse;
use crate::domain::image::ImageRef;
use crate::domain::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle of a post. Deleted posts stay in storage but behave as missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Active,
    Deleted,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deleted => "deleted",
        }
    }
}

impl FromStr for PostStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "deleted" => Ok(Self::Deleted),
            other => Err(DomainError::DatabaseError(format!(
                "unknown post status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub image: Option<ImageRef>,
    pub views: i64,
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn is_active(&self) -> bool {
        self.status == PostStatus::Active
    }

    /// Deleted posts are reported exactly like missing ones.
    pub fn ensure_active(self) -> Result<Self, DomainError> {
        if self.is_active() {
            Ok(self)
        } else {
            Err(DomainError::PostNotFound)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostRequest {
    pub title: String,
    pub content: String,
}

impl PostRequest {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Title cannot be empty".to_string(),
            ));
        }
        if self.content.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Content cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Row to insert; the id and timestamps are assigned by the repository.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub image: Option<ImageRef>,
}

/// Full replacement of the editable fields of a post.
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub title: String,
    pub content: String,
    pub image: Option<ImageRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub views: i64,
    pub comments: Vec<CommentResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostResponse {
    pub fn from_post(post: Post, comments: Vec<CommentResponse>) -> Self {
        Self {
            id: post.id,
            author_id: post.author_id,
            title: post.title,
            content: post.content,
            image_url: post.image.map(|image| image.url),
            views: post.views,
            comments,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularPostResponse {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub image_url: Option<String>,
    pub views: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Post> for PopularPostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            author_id: post.author_id,
            title: post.title,
            image_url: post.image.map(|image| image.url),
            views: post.views,
            created_at: post.created_at,
        }
    }
}
