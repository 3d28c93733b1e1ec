mod health;
mod post;

pub use health::health_check;
pub use post::{create_post, delete_post, list_posts, update_post};
