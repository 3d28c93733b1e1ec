use std::sync::Arc;

use tracing::info;

use crate::models::{NewPost, Post, PostId};
use crate::store::{PostStore, StoreError};
use crate::uploads::UploadStorage;

/// Ties the post store to the files backing its images.
#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn PostStore>,
    uploads: Arc<UploadStorage>,
}

impl PostService {
    pub fn new(store: Arc<dyn PostStore>, uploads: Arc<UploadStorage>) -> Self {
        Self { store, uploads }
    }

    pub fn uploads(&self) -> &UploadStorage {
        &self.uploads
    }

    pub async fn list(&self) -> Result<Vec<Post>, StoreError> {
        self.store.list().await
    }

    /// Creates the post. If the store refuses it, the already-written image
    /// files are removed again.
    pub async fn create(&self, post: NewPost) -> Result<Post, StoreError> {
        let images = post.images.clone();
        match self.store.create(post).await {
            Ok(post) => {
                info!("Post created: {} with {} images", post.id, post.images.len());
                Ok(post)
            }
            Err(err) => {
                self.uploads.reclaim(&images).await;
                Err(err)
            }
        }
    }

    pub async fn update(&self, id: PostId, content: &str) -> Result<Post, StoreError> {
        let post = self.store.update(id, content).await?;
        info!("Post updated: {}", id);
        Ok(post)
    }

    /// Deletes the record, then its files. File trouble is only logged.
    pub async fn delete(&self, id: PostId) -> Result<Post, StoreError> {
        let removed = self.store.delete(id).await?;
        self.uploads.reclaim(&removed.images).await;

        info!("Post deleted: {} ({} images reclaimed)", id, removed.images.len());
        Ok(removed)
    }
}
