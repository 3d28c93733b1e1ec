use axum::{
    Json,
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{info, warn};
use validator::Validate;

use crate::{
    AppState,
    dto::{ContentRequest, DeleteResponse, PostResponse},
    errors::ApiError,
    models::{Image, MAX_IMAGES, NewPost, PostId},
    store::StoreError,
    uploads::{UploadError, UploadStorage},
};

/// Body of `POST /api/posts`: plain JSON, or multipart when images ride along.
pub enum CreatePostPayload {
    Json(ContentRequest),
    Multipart(Multipart),
}

impl<S> FromRequest<S> for CreatePostPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::ValidationError(e.body_text()))?;
            Ok(Self::Multipart(multipart))
        } else {
            let Json(payload) = Json::<ContentRequest>::from_request(req, state)
                .await
                .map_err(|e| ApiError::ValidationError(e.body_text()))?;
            Ok(Self::Json(payload))
        }
    }
}

/// Unknown and malformed ids are the same thing to the client: not found.
fn parse_id(raw: &str) -> Result<PostId, ApiError> {
    raw.parse().map_err(|_| ApiError::NotFound)
}

fn is_image(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.to_ascii_lowercase().starts_with("image/"))
}

/// Reads the `content` field and every `images` part, streaming each file to
/// disk as it arrives. On any error the files stored so far are removed.
async fn read_multipart(
    uploads: &UploadStorage,
    mut multipart: Multipart,
) -> Result<NewPost, ApiError> {
    let mut content = String::new();
    let mut images: Vec<Image> = Vec::new();

    let result: Result<(), ApiError> = async {
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "content" => {
                    content = field.text().await.map_err(multipart_error)?;
                }
                "images" | "images[]" | "image" => {
                    let file_name = field.file_name().unwrap_or_default().trim().to_string();
                    if !is_image(field.content_type()) {
                        // browsers send one empty, untyped part when nothing was picked
                        if file_name.is_empty() {
                            let data = field.bytes().await.map_err(multipart_error)?;
                            if data.is_empty() {
                                continue;
                            }
                            return Err(ApiError::ValidationError(
                                "Attachment is not an image".into(),
                            ));
                        }
                        return Err(ApiError::ValidationError(format!(
                            "{file_name} is not an image"
                        )));
                    }
                    if images.len() == MAX_IMAGES {
                        return Err(ApiError::ValidationError(format!(
                            "At most {MAX_IMAGES} images per post"
                        )));
                    }

                    match uploads.store_stream(&file_name, field).await {
                        Ok(image) => images.push(image),
                        Err(UploadError::EmptyPayload) => {
                            warn!("Skipping empty upload {}", file_name);
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                other => warn!("Ignoring unexpected multipart field {:?}", other),
            }
        }
        Ok(())
    }
    .await;

    if let Err(err) = result {
        uploads.reclaim(&images).await;
        return Err(err);
    }

    let request = ContentRequest { content };
    if let Err(e) = request.validate() {
        uploads.reclaim(&images).await;
        return Err(ApiError::ValidationError(e.to_string()));
    }

    Ok(NewPost {
        content: request.content,
        images,
    })
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::ValidationError(err.body_text())
    }
}

/// GET /api/posts
/// Response: every post, newest first
pub async fn list_posts(
    State(state): State<AppState>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let posts = state.posts.list().await?;
    Ok(Json(posts.into_iter().map(PostResponse::from).collect()))
}

/// POST /api/posts
/// Body: { "content": "..." } or multipart `content` + up to 9 `images`
pub async fn create_post(
    State(state): State<AppState>,
    payload: CreatePostPayload,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    let new_post = match payload {
        CreatePostPayload::Json(payload) => {
            payload
                .validate()
                .map_err(|e| ApiError::ValidationError(e.to_string()))?;
            NewPost::text(payload.content)
        }
        CreatePostPayload::Multipart(multipart) => {
            read_multipart(state.posts.uploads(), multipart).await?
        }
    };

    let post = state.posts.create(new_post).await?;
    Ok((StatusCode::CREATED, Json(post.into())))
}

/// PUT /api/posts/{id}
/// Body: { "content": "..." }
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ContentRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::ValidationError(e.to_string()))?;

    // an empty edit is a validation error even for unknown ids
    let Ok(id) = parse_id(&id) else {
        if payload.content.trim().is_empty() {
            return Err(ApiError::ValidationError("Content is required".into()));
        }
        return Err(ApiError::NotFound);
    };

    let post = state.posts.update(id, &payload.content).await?;
    Ok(Json(post.into()))
}

/// DELETE /api/posts/{id}
/// Response: { "success": true } or 404 { "success": false }
pub async fn delete_post(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let not_found = || {
        (
            StatusCode::NOT_FOUND,
            Json(DeleteResponse {
                success: false,
                error: Some("Post not found".into()),
            }),
        )
            .into_response()
    };

    let Ok(id) = parse_id(&id) else {
        return not_found();
    };

    match state.posts.delete(id).await {
        Ok(_) => Json(DeleteResponse {
            success: true,
            error: None,
        })
        .into_response(),
        Err(StoreError::NotFound(_)) => {
            info!("Delete of unknown post {}", id);
            not_found()
        }
        Err(err) => ApiError::from(err).into_response(),
    }
}
