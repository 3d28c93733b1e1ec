use std::collections::HashSet;

use chrono::Local;
use tracing::{error, info};

use super::{
    Notice,
    api::PostsClient,
    compose::Composer,
    pin::{Decision, GuardedAction, PinGate, PinInput},
    render::{DeleteDialog, Feed, ImageViewer},
};
use crate::models::PostId;

/// Lowers `publishing` when dropped, so a request future dropped mid-flight
/// doesn't leave the button disabled.
struct BusyFlag<'a>(&'a mut bool);

impl<'a> BusyFlag<'a> {
    fn raise(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for BusyFlag<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

/// Same as [`BusyFlag`] for the per-card save buttons.
struct SavingMark<'a> {
    ids: &'a mut HashSet<PostId>,
    id: PostId,
}

impl<'a> SavingMark<'a> {
    fn insert(ids: &'a mut HashSet<PostId>, id: PostId) -> Self {
        ids.insert(id);
        Self { ids, id }
    }
}

impl Drop for SavingMark<'_> {
    fn drop(&mut self) {
        self.ids.remove(&self.id);
    }
}

/// Everything one page load keeps: the unlocked PIN, the composer draft and
/// what's on screen. Dropping the session locks the gate again.
///
/// Busy flags stand in for disabled buttons; each is cleared whatever the
/// request's outcome.
pub struct Session {
    client: PostsClient,
    pub pin: PinGate,
    pub composer: Composer,
    pub feed: Feed,
    pub delete_dialog: DeleteDialog,
    pub viewer: ImageViewer,
    publishing: bool,
    saving: HashSet<PostId>,
}

impl Session {
    pub fn new(client: PostsClient) -> Self {
        Self::with_gate(client, PinGate::default())
    }

    pub fn with_gate(client: PostsClient, pin: PinGate) -> Self {
        Self {
            client,
            pin,
            composer: Composer::default(),
            feed: Feed::default(),
            delete_dialog: DeleteDialog::default(),
            viewer: ImageViewer::default(),
            publishing: false,
            saving: HashSet::new(),
        }
    }

    pub fn is_publishing(&self) -> bool {
        self.publishing
    }

    pub fn is_saving(&self, id: PostId) -> bool {
        self.saving.contains(&id)
    }

    /// Reloads the whole list from the server.
    pub async fn refresh(&mut self) -> Result<(), Notice> {
        match self.client.list().await {
            Ok(posts) => {
                self.feed.replace_all(posts, &Local::now());
                Ok(())
            }
            Err(err) => {
                error!("refresh failed: {}", err);
                Err(Notice::LoadFailed)
            }
        }
    }

    /// A click on publish, edit or delete. Returns the action when it may run
    /// right away; otherwise the PIN overlay is now open.
    pub fn request(&mut self, action: GuardedAction) -> Option<GuardedAction> {
        match self.pin.request(action) {
            Decision::Proceed(action) => Some(action),
            Decision::Prompt => None,
        }
    }

    /// Typing in the PIN overlay. On the right code the queued action is run.
    pub async fn enter_pin(&mut self, raw: &str) -> Result<PinInput, Notice> {
        let outcome = self.pin.input(raw);
        if let PinInput::Unlocked(action) = &outcome {
            self.run(action.clone()).await?;
        }
        Ok(outcome)
    }

    /// Closes the PIN overlay without running anything.
    pub fn cancel_pin(&mut self) {
        if let Some(dropped) = self.pin.cancel() {
            info!("discarded {:?}", dropped);
        }
    }

    /// Carries out an action that got past the gate.
    pub async fn run(&mut self, action: GuardedAction) -> Result<(), Notice> {
        match action {
            GuardedAction::Publish { .. } => self.publish().await.map(|_| ()),
            GuardedAction::Edit { post_id } => {
                let card = self.feed.card_mut(post_id).ok_or(Notice::UnknownPost)?;
                card.start_edit();
                Ok(())
            }
            GuardedAction::Delete { post_id } => {
                if self.feed.card(post_id).is_none() {
                    return Err(Notice::UnknownPost);
                }
                self.delete_dialog.show(post_id);
                Ok(())
            }
        }
    }

    /// Sends the composer draft. `Ok(None)` when there was nothing to send
    /// or a publish is already in flight.
    pub async fn publish(&mut self) -> Result<Option<PostId>, Notice> {
        if self.publishing {
            return Ok(None);
        }
        let Some(draft) = self.composer.draft()? else {
            return Ok(None);
        };

        let result = {
            let _busy = BusyFlag::raise(&mut self.publishing);
            self.client.create_draft(&draft).await
        };

        match result {
            Ok(post) => {
                let id = post.id;
                self.composer.clear();
                self.feed.prepend(post, &Local::now());
                Ok(Some(id))
            }
            Err(err) => {
                error!("publish failed: {}", err);
                Err(Notice::PublishFailed)
            }
        }
    }

    /// Save button of an in-place edit.
    pub async fn save_edit(&mut self, id: PostId) -> Result<(), Notice> {
        if self.saving.contains(&id) {
            return Ok(());
        }
        let content = self
            .feed
            .card(id)
            .ok_or(Notice::UnknownPost)?
            .edit_to_save()?;

        let result = {
            let _busy = SavingMark::insert(&mut self.saving, id);
            self.client.update(id, &content).await
        };

        match result {
            Ok(updated) => {
                if let Some(card) = self.feed.card_mut(id) {
                    card.finish_edit(updated, &Local::now());
                }
                Ok(())
            }
            Err(err) => {
                error!("save failed for post {}: {}", id, err);
                Err(Notice::SaveFailed)
            }
        }
    }

    /// Confirm button of the delete modal: play the exit, delete, reload.
    pub async fn confirm_delete(&mut self) -> Result<(), Notice> {
        let Some(id) = self.delete_dialog.confirm() else {
            return Ok(());
        };

        if let Some(card) = self.feed.card_mut(id) {
            card.leaving = true;
        }

        if let Err(err) = self.client.delete(id).await {
            error!("delete failed for post {}: {}", id, err);
            if let Some(card) = self.feed.card_mut(id) {
                card.leaving = false;
            }
            return Err(Notice::DeleteFailed);
        }

        self.refresh().await
    }
}
