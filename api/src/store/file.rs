use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::{fs, sync::Mutex};
use tracing::{debug, info};

use super::{PostStore, StoreError, edited_at, newest_first, validate_edit, validate_new};
use crate::models::{NewPost, Post, PostId};

/// Posts kept as one JSON array on disk, rewritten wholesale after every
/// mutation. Ids are millisecond timestamps, bumped so they only ever grow.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    posts: Mutex<Vec<Post>>,
}

impl FileStore {
    /// Loads the snapshot at `path`. A missing file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let posts: Vec<Post> = match fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Vec::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        info!("Loaded {} posts from {}", posts.len(), path.display());

        Ok(Self {
            path,
            posts: Mutex::new(posts),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, posts: &[Post]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(posts)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await?;

        debug!("Wrote {} posts to {}", posts.len(), self.path.display());
        Ok(())
    }
}

fn next_id(posts: &[Post]) -> PostId {
    let now = Utc::now().timestamp_millis();
    let last = posts.iter().map(|p| p.id).max().unwrap_or(0);
    now.max(last + 1)
}

#[async_trait]
impl PostStore for FileStore {
    async fn list(&self) -> Result<Vec<Post>, StoreError> {
        let mut posts = self.posts.lock().await.clone();
        posts.sort_by(newest_first);
        Ok(posts)
    }

    async fn create(&self, post: NewPost) -> Result<Post, StoreError> {
        let post = validate_new(post)?;
        let mut posts = self.posts.lock().await;

        let post = Post {
            id: next_id(&posts),
            content: post.content,
            created_at: Utc::now(),
            images: post.images,
        };

        posts.push(post.clone());
        if let Err(err) = self.persist(&posts).await {
            posts.pop();
            return Err(err);
        }
        Ok(post)
    }

    async fn update(&self, id: PostId, content: &str) -> Result<Post, StoreError> {
        let content = validate_edit(content)?;
        let mut posts = self.posts.lock().await;

        let index = posts
            .iter()
            .position(|p| p.id == id)
            .ok_or(StoreError::NotFound(id))?;

        let previous = posts[index].clone();
        let post = &mut posts[index];
        post.content = content;
        post.created_at = edited_at(previous.created_at);
        let updated = post.clone();

        if let Err(err) = self.persist(&posts).await {
            posts[index] = previous;
            return Err(err);
        }
        Ok(updated)
    }

    async fn delete(&self, id: PostId) -> Result<Post, StoreError> {
        let mut posts = self.posts.lock().await;

        let index = posts
            .iter()
            .position(|p| p.id == id)
            .ok_or(StoreError::NotFound(id))?;

        let removed = posts.remove(index);
        if let Err(err) = self.persist(&posts).await {
            posts.insert(index, removed);
            return Err(err);
        }
        Ok(removed)
    }
}
