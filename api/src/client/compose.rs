//! The "new post" editor: draft text plus the images picked for upload.

use bytes::Bytes;
use uuid::Uuid;

use super::Notice;
use crate::models::{MAX_CONTENT_CHARS, MAX_IMAGES};

/// A file picked in the browser but not sent yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImage {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
    /// Stands in for the browser's object URL used by the thumbnail preview.
    pub preview: String,
}

impl PendingImage {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
            preview: format!("blob:{}", Uuid::new_v4()),
        }
    }
}

/// What gets sent when the draft passes the checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub content: String,
    pub images: Vec<PendingImage>,
}

#[derive(Debug, Default, Clone)]
pub struct Composer {
    text: String,
    images: Vec<PendingImage>,
}

impl Composer {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn images(&self) -> &[PendingImage] {
        &self.images
    }

    /// Adds a whole file selection. A selection that would push the total
    /// past nine is refused outright rather than partly accepted.
    pub fn add_images(&mut self, selection: Vec<PendingImage>) -> Result<(), Notice> {
        if self.images.len() + selection.len() > MAX_IMAGES {
            return Err(Notice::TooManyImages);
        }
        self.images.extend(selection);
        Ok(())
    }

    pub fn remove_image(&mut self, index: usize) -> Option<PendingImage> {
        (index < self.images.len()).then(|| self.images.remove(index))
    }

    /// Checks the draft without consuming it.
    ///
    /// `Ok(None)` means there is nothing to send; publishing is a silent no-op.
    pub fn draft(&self) -> Result<Option<Draft>, Notice> {
        if self.text.trim().is_empty() && self.images.is_empty() {
            return Ok(None);
        }
        if self.text.trim().chars().count() > MAX_CONTENT_CHARS {
            return Err(Notice::TooLong);
        }
        Ok(Some(Draft {
            content: self.text.clone(),
            images: self.images.clone(),
        }))
    }

    /// After a successful publish.
    pub fn clear(&mut self) {
        self.text.clear();
        self.images.clear();
    }
}
