//! Image attachment storage.
//!
//! Files land flat in the upload directory under a generated name and are
//! served back at `/uploads/<name>`.

use std::error::Error as StdError;
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt, pin_mut, stream};
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::Image;

pub const PUBLIC_PREFIX: &str = "/uploads";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("uploaded file stream failed")]
    PayloadStream {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("uploaded file is empty")]
    EmptyPayload,
}

impl UploadError {
    pub fn stream(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        UploadError::PayloadStream {
            source: source.into(),
        }
    }
}

/// Filesystem-backed attachment storage.
#[derive(Debug)]
pub struct UploadStorage {
    root: PathBuf,
}

impl UploadStorage {
    /// Storage rooted at `root`, creating the directory if necessary.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, std::io::Error> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Streams one attachment to disk under a fresh name.
    ///
    /// A failed or empty stream leaves nothing behind.
    pub async fn store_stream<S, E>(&self, original_name: &str, stream: S) -> Result<Image, UploadError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        let name = stored_name(original_name);
        let absolute = self.root.join(&name);

        let mut file = fs::File::create(&absolute).await?;
        let mut written: u64 = 0;

        pin_mut!(stream);
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    drop(file);
                    let _ = fs::remove_file(&absolute).await;
                    return Err(UploadError::stream(err));
                }
            };
            if let Err(err) = file.write_all(&chunk).await {
                drop(file);
                let _ = fs::remove_file(&absolute).await;
                return Err(err.into());
            }
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        if written == 0 {
            let _ = fs::remove_file(&absolute).await;
            return Err(UploadError::EmptyPayload);
        }

        debug!("Stored upload {} ({} bytes)", name, written);

        Ok(Image {
            url: format!("{PUBLIC_PREFIX}/{name}"),
            path: name,
        })
    }

    /// Buffered variant of [`store_stream`](Self::store_stream).
    pub async fn store(&self, original_name: &str, data: Bytes) -> Result<Image, UploadError> {
        let stream = stream::once(async move { Ok::<_, std::io::Error>(data) });
        self.store_stream(original_name, stream).await
    }

    /// Best-effort removal. Never fails: problems are logged and dropped so a
    /// post delete can't be held up by its files.
    pub async fn remove(&self, stored_path: &str) {
        let absolute = match self.resolve(stored_path) {
            Ok(path) => path,
            Err(err) => {
                warn!("Refusing to remove upload {:?}: {}", stored_path, err);
                return;
            }
        };

        match fs::remove_file(&absolute).await {
            Ok(()) => debug!("Removed upload {}", stored_path),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!("Upload {} was already gone", stored_path)
            }
            Err(err) => warn!("Failed to remove upload {}: {}", stored_path, err),
        }
    }

    /// Removes every file backing `images`.
    pub async fn reclaim(&self, images: &[Image]) {
        for image in images {
            self.remove(&image.path).await;
        }
    }

    /// Absolute location of a stored file.
    pub fn absolute_path(&self, stored_path: &str) -> Result<PathBuf, UploadError> {
        self.resolve(stored_path)
    }

    fn resolve(&self, stored_path: &str) -> Result<PathBuf, UploadError> {
        let relative = Path::new(stored_path);
        if stored_path.is_empty()
            || relative.is_absolute()
            || relative
                .components()
                .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(UploadError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

/// `<unix millis>-<random hex>[.<ext>]`, keeping only the original extension.
fn stored_name(original_name: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let random = Uuid::new_v4().simple().to_string();
    let suffix = &random[..12];

    match extension(original_name) {
        Some(ext) => format!("{millis}-{suffix}.{ext}"),
        None => format!("{millis}-{suffix}"),
    }
}

fn extension(original_name: &str) -> Option<String> {
    Path::new(original_name)
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .filter(|value| !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric()))
}
