use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use super::{PostStore, StoreError, edited_at, newest_first, validate_edit, validate_new};
use crate::models::{NewPost, Post, PostId};

/// `DashMap` = Thread-safe HashMap
/// - Handlers read and write it concurrently without an outer lock
/// - Everything is gone when the process exits
#[derive(Debug)]
pub struct MemoryStore {
    posts: DashMap<PostId, Post>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            posts: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Post>, StoreError> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        posts.sort_by(newest_first);
        Ok(posts)
    }

    async fn create(&self, post: NewPost) -> Result<Post, StoreError> {
        let post = validate_new(post)?;
        let post = Post {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            content: post.content,
            created_at: Utc::now(),
            images: post.images,
        };

        self.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update(&self, id: PostId, content: &str) -> Result<Post, StoreError> {
        let content = validate_edit(content)?;
        let mut post = self.posts.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        post.content = content;
        post.created_at = edited_at(post.created_at);
        Ok(post.clone())
    }

    async fn delete(&self, id: PostId) -> Result<Post, StoreError> {
        self.posts
            .remove(&id)
            .map(|(_, post)| post)
            .ok_or(StoreError::NotFound(id))
    }
}
