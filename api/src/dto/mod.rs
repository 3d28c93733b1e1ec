mod requests;
mod responses;

pub use requests::ContentRequest;
pub use responses::{DeleteResponse, PostResponse};
