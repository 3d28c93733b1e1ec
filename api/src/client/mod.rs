//! Headless model of the browser client.
//!
//! Everything the page keeps between clicks lives in a [`Session`]: the PIN
//! gate, the composer, the rendered feed and the modals. Nothing here touches
//! a DOM; a UI layer reads this state and feeds user input back in.

pub mod api;
pub mod compose;
pub mod pin;
pub mod render;
pub mod session;
pub mod time;

use thiserror::Error;

pub use api::{ClientError, PostsClient};
pub use compose::{Composer, Draft, PendingImage};
pub use pin::{Decision, GuardedAction, PinGate, PinInput};
pub use render::{CardMode, DeleteDialog, Feed, ImageViewer, PostCard};
pub use session::Session;

/// Blocking message shown to the user. Failed requests keep whatever the
/// user typed or picked so they can try again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Notice {
    #[error("Couldn't load the posts, try again later")]
    LoadFailed,
    #[error("Publishing failed, your text is still in the editor")]
    PublishFailed,
    #[error("Saving failed, your changes are still in the editor")]
    SaveFailed,
    #[error("Deleting failed, try again later")]
    DeleteFailed,
    #[error("Content can't be empty")]
    EmptyEdit,
    #[error("That's over 2000 characters, try splitting it into two posts")]
    TooLong,
    #[error("At most 9 images per post")]
    TooManyImages,
    #[error("This post isn't being edited")]
    NotEditing,
    #[error("That post is no longer on the page")]
    UnknownPost,
}
