//! Thin wrapper over the four post endpoints.

use reqwest::{
    Response, StatusCode,
    multipart::{Form, Part},
};
use serde::Deserialize;
use thiserror::Error;

use super::compose::Draft;
use crate::dto::{ContentRequest, DeleteResponse, PostResponse};
use crate::models::PostId;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("server answered {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("server refused the delete")]
    DeleteRefused,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PostsClient {
    http: reqwest::Client,
    base: String,
}

impl PostsClient {
    /// `base` is the server origin, e.g. `http://localhost:3000`.
    pub fn new(base: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    pub fn with_client(http: reqwest::Client, base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self { http, base }
    }

    fn posts_url(&self) -> String {
        format!("{}/api/posts", self.base)
    }

    fn post_url(&self, id: PostId) -> String {
        format!("{}/api/posts/{}", self.base, id)
    }

    pub async fn list(&self) -> Result<Vec<PostResponse>, ClientError> {
        let res = self.http.get(self.posts_url()).send().await?;
        Ok(check(res).await?.json().await?)
    }

    /// Text-only post as JSON.
    pub async fn create(&self, content: &str) -> Result<PostResponse, ClientError> {
        let res = self
            .http
            .post(self.posts_url())
            .json(&ContentRequest {
                content: content.to_string(),
            })
            .send()
            .await?;
        Ok(check(res).await?.json().await?)
    }

    /// Sends the draft, switching to multipart when it carries images.
    pub async fn create_draft(&self, draft: &Draft) -> Result<PostResponse, ClientError> {
        if draft.images.is_empty() {
            return self.create(&draft.content).await;
        }

        let mut form = Form::new().text("content", draft.content.clone());
        for image in &draft.images {
            let part = Part::bytes(image.data.to_vec())
                .file_name(image.file_name.clone())
                .mime_str(&image.content_type)?;
            form = form.part("images", part);
        }

        let res = self.http.post(self.posts_url()).multipart(form).send().await?;
        Ok(check(res).await?.json().await?)
    }

    pub async fn update(&self, id: PostId, content: &str) -> Result<PostResponse, ClientError> {
        let res = self
            .http
            .put(self.post_url(id))
            .json(&ContentRequest {
                content: content.to_string(),
            })
            .send()
            .await?;
        Ok(check(res).await?.json().await?)
    }

    /// `Ok(())` only when the server reports `success: true`.
    pub async fn delete(&self, id: PostId) -> Result<(), ClientError> {
        let res = self.http.delete(self.post_url(id)).send().await?;
        let body: DeleteResponse = check(res).await?.json().await?;
        if body.success {
            Ok(())
        } else {
            Err(ClientError::DeleteRefused)
        }
    }
}

/// Non-2xx becomes an error carrying the server's `error` message.
async fn check(res: Response) -> Result<Response, ClientError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let text = res.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|body| body.error)
        .unwrap_or(text);
    Err(ClientError::Status { status, message })
}
