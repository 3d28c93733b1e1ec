//! Post persistence.
//!
//! Every backend implements [`PostStore`]; handlers only ever see an
//! `Arc<dyn PostStore>`, so swapping memory, snapshot file and SQLite storage
//! is a configuration change.
//!
//! Writers are not coordinated: two edits racing on the same id end up
//! last-write-wins.

#[cfg(test)]
mod contract;
mod file;
mod memory;
mod sqlite;

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::models::{MAX_CONTENT_CHARS, MAX_IMAGES, NewPost, Post, PostId};

pub use file::FileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),
    #[error("post {0} not found")]
    NotFound(PostId),
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// All posts, newest first.
    async fn list(&self) -> Result<Vec<Post>, StoreError>;

    async fn create(&self, post: NewPost) -> Result<Post, StoreError>;

    /// Replaces the content and refreshes the timestamp. Images are untouched.
    async fn update(&self, id: PostId, content: &str) -> Result<Post, StoreError>;

    /// Removes the post and hands back the removed record so its files can
    /// be reclaimed.
    async fn delete(&self, id: PostId) -> Result<Post, StoreError>;
}

/// Trims and checks a new post. Empty text is fine as long as an image is attached.
pub(crate) fn validate_new(post: NewPost) -> Result<NewPost, StoreError> {
    let content = post.content.trim().to_string();
    if content.is_empty() && post.images.is_empty() {
        return Err(StoreError::Validation("Content is required".into()));
    }
    check_length(&content)?;
    if post.images.len() > MAX_IMAGES {
        return Err(StoreError::Validation(format!(
            "At most {MAX_IMAGES} images per post"
        )));
    }
    Ok(NewPost {
        content,
        images: post.images,
    })
}

/// Trims edited text. Edits can never empty a post.
pub(crate) fn validate_edit(content: &str) -> Result<String, StoreError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(StoreError::Validation("Content is required".into()));
    }
    check_length(content)?;
    Ok(content.to_string())
}

fn check_length(content: &str) -> Result<(), StoreError> {
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(StoreError::Validation(format!(
            "Content must be at most {MAX_CONTENT_CHARS} characters"
        )));
    }
    Ok(())
}

/// "Now" for an edit, nudged past the previous stamp so an edit always sorts
/// as newer than what it replaced.
pub(crate) fn edited_at(previous: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(previous + Duration::microseconds(1))
}

/// Newest first; equal timestamps fall back to the later insertion.
pub(crate) fn newest_first(a: &Post, b: &Post) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}
