use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Post, PostId};

/// What the browser sees of a post: image URLs only, never disk paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: PostId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            content: post.content,
            created_at: post.created_at,
            images: post.images.into_iter().map(|image| image.url).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
