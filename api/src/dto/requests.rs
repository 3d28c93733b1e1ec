use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::MAX_CONTENT_CHARS;

/// Body of `POST /api/posts` (JSON flavour) and `PUT /api/posts/{id}`.
/// Emptiness is judged by the store after trimming.
#[derive(Debug, Default, Validate, Serialize, Deserialize)]
pub struct ContentRequest {
    #[serde(default)]
    #[validate(custom(function = "trimmed_length"))]
    pub content: String,
}

/// Length is counted the way the store keeps the text: trimmed, in characters.
fn trimmed_length(content: &str) -> Result<(), ValidationError> {
    if content.trim().chars().count() > MAX_CONTENT_CHARS {
        return Err(ValidationError::new("length").with_message(Cow::Owned(format!(
            "Content must be at most {MAX_CONTENT_CHARS} characters"
        ))));
    }
    Ok(())
}
