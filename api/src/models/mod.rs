mod post;

pub use post::{Image, MAX_CONTENT_CHARS, MAX_IMAGES, NewPost, Post, PostId};
