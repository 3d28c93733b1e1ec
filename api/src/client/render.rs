//! View state behind the post list: cards, in-place editing, the delete
//! confirmation and the enlarged image view.

use chrono::{DateTime, TimeZone, Utc};
use std::fmt::Display;

use super::{Notice, time::format_relative};
use crate::dto::PostResponse;
use crate::models::PostId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardMode {
    Display,
    Editing { draft: String, original: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostCard {
    pub id: PostId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub time_label: String,
    pub images: Vec<String>,
    pub mode: CardMode,
    /// Exit animation running; the card is about to be deleted.
    pub leaving: bool,
}

impl PostCard {
    pub fn new<Tz>(post: PostResponse, now: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        Self {
            id: post.id,
            time_label: format_relative(&post.created_at, now),
            content: post.content,
            created_at: post.created_at,
            images: post.images,
            mode: CardMode::Display,
            leaving: false,
        }
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, CardMode::Editing { .. })
    }

    /// Swaps the text for an editor seeded with the current content. Does
    /// nothing if the card is already being edited.
    pub fn start_edit(&mut self) {
        if self.is_editing() {
            return;
        }
        self.mode = CardMode::Editing {
            draft: self.content.clone(),
            original: self.content.clone(),
        };
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        if let CardMode::Editing { draft, .. } = &mut self.mode {
            *draft = text.into();
        }
    }

    /// The text to send on Save, or why it can't be sent. The draft goes out
    /// as typed; the server trims it.
    pub fn edit_to_save(&self) -> Result<String, Notice> {
        match &self.mode {
            CardMode::Editing { draft, .. } if draft.trim().is_empty() => Err(Notice::EmptyEdit),
            CardMode::Editing { draft, .. } => Ok(draft.clone()),
            CardMode::Display => Err(Notice::NotEditing),
        }
    }

    /// Save went through: show what the server stored.
    pub fn finish_edit<Tz>(&mut self, updated: PostResponse, now: &DateTime<Tz>)
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        self.content = updated.content;
        self.created_at = updated.created_at;
        self.time_label = format_relative(&updated.created_at, now);
        self.mode = CardMode::Display;
    }

    /// Cancel: back to the original text, untouched.
    pub fn cancel_edit(&mut self) {
        if let CardMode::Editing { original, .. } = &self.mode {
            self.content = original.clone();
        }
        self.mode = CardMode::Display;
    }
}

/// The rendered list, newest first.
#[derive(Debug, Default, Clone)]
pub struct Feed {
    cards: Vec<PostCard>,
}

impl Feed {
    pub fn replace_all<Tz>(&mut self, posts: Vec<PostResponse>, now: &DateTime<Tz>)
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        self.cards = posts.into_iter().map(|p| PostCard::new(p, now)).collect();
    }

    /// A freshly published post goes on top without a full refresh.
    pub fn prepend<Tz>(&mut self, post: PostResponse, now: &DateTime<Tz>)
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        self.cards.insert(0, PostCard::new(post, now));
    }

    /// Drives the "has posts" layout switch.
    pub fn has_posts(&self) -> bool {
        !self.cards.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[PostCard] {
        &self.cards
    }

    pub fn card(&self, id: PostId) -> Option<&PostCard> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn card_mut(&mut self, id: PostId) -> Option<&mut PostCard> {
        self.cards.iter_mut().find(|c| c.id == id)
    }
}

/// Confirmation modal in front of a delete.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeleteDialog {
    pending: Option<PostId>,
}

impl DeleteDialog {
    pub fn show(&mut self, id: PostId) {
        self.pending = Some(id);
    }

    pub fn is_open(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<PostId> {
        self.pending
    }

    /// Confirm button: closes the modal and hands over the id to delete.
    pub fn confirm(&mut self) -> Option<PostId> {
        self.pending.take()
    }

    /// Cancel, backdrop or Escape.
    pub fn dismiss(&mut self) {
        self.pending = None;
    }
}

/// Enlarged single-image view.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImageViewer {
    open: Option<String>,
}

impl ImageViewer {
    pub fn open(&mut self, url: impl Into<String>) {
        self.open = Some(url.into());
    }

    /// Click outside the image or Escape.
    pub fn close(&mut self) {
        self.open = None;
    }

    pub fn current(&self) -> Option<&str> {
        self.open.as_deref()
    }
}
