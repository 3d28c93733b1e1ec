use crate::service::PostService;

// ============================================================================
// APPLICATION STATE - Shared data across all requests
// ============================================================================
/// Cloned into every handler by axum.
///
/// `PostService` holds the store and upload storage behind `Arc`s, so a
/// clone is just two reference-count bumps.
#[derive(Clone)]
pub struct AppState {
    pub posts: PostService,
}

impl AppState {
    pub fn new(posts: PostService) -> Self {
        Self { posts }
    }
}
