use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type PostId = i64;

/// Longest note the client and the store accept, counted in characters.
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Attachments allowed on a single post.
pub const MAX_IMAGES: usize = 9;

/// A stored attachment: where the browser fetches it and where it lives on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub content: String,
    /// Refreshed on every edit, so this is really "last modified".
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub images: Vec<Image>,
}

/// Input to `PostStore::create`. Content is trimmed by the store.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub content: String,
    pub images: Vec<Image>,
}

impl NewPost {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            images: Vec::new(),
        }
    }
}
