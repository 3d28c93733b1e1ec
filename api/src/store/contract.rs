//! Behaviour every backend has to share. Each backend's tests call [`run_all`]
//! on a fresh, empty store.

use super::{PostStore, StoreError};
use crate::models::{Image, NewPost};

pub(crate) async fn run_all(store: &dyn PostStore) {
    create_then_list(store).await;
    empty_edit_is_rejected(store).await;
    unknown_ids(store).await;
    images_survive_edit(store).await;
    delete_removes(store).await;
}

fn images(n: usize) -> Vec<Image> {
    (0..n)
        .map(|i| Image {
            url: format!("/uploads/img-{i}.jpg"),
            path: format!("img-{i}.jpg"),
        })
        .collect()
}

async fn create_then_list(store: &dyn PostStore) {
    let older = store.create(NewPost::text("first")).await.unwrap();
    let created = store
        .create(NewPost {
            content: "  second  ".into(),
            images: images(3),
        })
        .await
        .unwrap();

    assert_eq!(created.content, "second");
    assert_ne!(created.id, older.id);

    let listed = store.list().await.unwrap();
    assert_eq!(listed[0], created);
    assert_eq!(listed[1], older);
    assert_eq!(listed[0].images, images(3));
}

async fn empty_edit_is_rejected(store: &dyn PostStore) {
    let before = store.list().await.unwrap();
    let target = before[0].id;

    let err = store.update(target, "   ").await.unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert_eq!(store.list().await.unwrap(), before);
}

async fn unknown_ids(store: &dyn PostStore) {
    let before = store.list().await.unwrap().len();

    assert!(matches!(
        store.update(9_999_999_999_999, "x").await,
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        store.delete(9_999_999_999_999).await,
        Err(StoreError::NotFound(_))
    ));
    assert_eq!(store.list().await.unwrap().len(), before);
}

async fn images_survive_edit(store: &dyn PostStore) {
    let listed = store.list().await.unwrap();
    let oldest = listed.last().unwrap().clone();
    let with_images = listed.iter().find(|p| !p.images.is_empty()).unwrap().clone();

    let edited = store.update(with_images.id, " edited ").await.unwrap();
    assert_eq!(edited.content, "edited");
    assert_eq!(edited.images, with_images.images);
    assert!(edited.created_at > with_images.created_at);

    let bumped = store.update(oldest.id, "bumped").await.unwrap();
    assert!(bumped.created_at > oldest.created_at);
    assert_eq!(store.list().await.unwrap()[0].id, oldest.id);
}

async fn delete_removes(store: &dyn PostStore) {
    let listed = store.list().await.unwrap();
    let victim = listed[0].clone();

    let removed = store.delete(victim.id).await.unwrap();
    assert_eq!(removed.id, victim.id);

    let after = store.list().await.unwrap();
    assert_eq!(after.len(), listed.len() - 1);
    assert!(after.iter().all(|p| p.id != victim.id));

    let image_only = store
        .create(NewPost {
            content: String::new(),
            images: images(1),
        })
        .await
        .unwrap();
    assert_eq!(image_only.content, "");
    store.delete(image_only.id).await.unwrap();
}
