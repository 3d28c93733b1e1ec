use std::{collections::HashMap, str::FromStr};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{
    Row,
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow},
};
use tracing::info;

use super::{PostStore, StoreError, edited_at, newest_first, validate_edit, validate_new};
use crate::models::{Image, NewPost, Post, PostId};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        content TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS post_images (
        post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        url TEXT NOT NULL,
        path TEXT NOT NULL,
        PRIMARY KEY (post_id, position)
    );
";

/// Posts in a relational table, images in a child table keyed by position.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `url` and makes sure the
    /// tables exist.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // every connection to `sqlite::memory:` is its own database, so keep
        // exactly one alive for the life of the pool
        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        info!("Connected to {}", url);

        Ok(Self { pool })
    }

    async fn images_of(&self, id: PostId) -> Result<Vec<Image>, StoreError> {
        let rows = sqlx::query(
            "SELECT url, path FROM post_images WHERE post_id = ? ORDER BY position",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(image_from_row).collect()
    }

    async fn find(&self, id: PostId) -> Result<Post, StoreError> {
        let row = sqlx::query("SELECT id, content, created_at FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        let mut post = post_from_row(&row)?;
        post.images = self.images_of(id).await?;
        Ok(post)
    }
}

fn encode_time(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_time(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Storage(format!("bad timestamp {raw:?}: {e}")))
}

fn post_from_row(row: &SqliteRow) -> Result<Post, StoreError> {
    let created_at: String = row.try_get("created_at")?;
    Ok(Post {
        id: row.try_get("id")?,
        content: row.try_get("content")?,
        created_at: decode_time(&created_at)?,
        images: Vec::new(),
    })
}

fn image_from_row(row: &SqliteRow) -> Result<Image, StoreError> {
    Ok(Image {
        url: row.try_get("url")?,
        path: row.try_get("path")?,
    })
}

#[async_trait]
impl PostStore for SqliteStore {
    async fn list(&self) -> Result<Vec<Post>, StoreError> {
        let rows = sqlx::query("SELECT id, content, created_at FROM posts")
            .fetch_all(&self.pool)
            .await?;
        let image_rows =
            sqlx::query("SELECT post_id, url, path FROM post_images ORDER BY post_id, position")
                .fetch_all(&self.pool)
                .await?;

        let mut images: HashMap<PostId, Vec<Image>> = HashMap::new();
        for row in &image_rows {
            let post_id: PostId = row.try_get("post_id")?;
            images.entry(post_id).or_default().push(image_from_row(row)?);
        }

        let mut posts = rows
            .iter()
            .map(|row| {
                let mut post = post_from_row(row)?;
                post.images = images.remove(&post.id).unwrap_or_default();
                Ok(post)
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        posts.sort_by(newest_first);
        Ok(posts)
    }

    async fn create(&self, post: NewPost) -> Result<Post, StoreError> {
        let post = validate_new(post)?;
        let created_at = Utc::now();

        let mut tx = self.pool.begin().await?;
        let id = sqlx::query("INSERT INTO posts (content, created_at) VALUES (?, ?)")
            .bind(post.content.as_str())
            .bind(encode_time(&created_at))
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        for (position, image) in post.images.iter().enumerate() {
            sqlx::query(
                "INSERT INTO post_images (post_id, position, url, path) VALUES (?, ?, ?, ?)",
            )
            .bind(id)
            .bind(position as i64)
            .bind(image.url.as_str())
            .bind(image.path.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(Post {
            id,
            content: post.content,
            created_at,
            images: post.images,
        })
    }

    async fn update(&self, id: PostId, content: &str) -> Result<Post, StoreError> {
        let content = validate_edit(content)?;
        let current = self.find(id).await?;
        let created_at = edited_at(current.created_at);

        let changed = sqlx::query("UPDATE posts SET content = ?, created_at = ? WHERE id = ?")
            .bind(content.as_str())
            .bind(encode_time(&created_at))
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }

        Ok(Post {
            content,
            created_at,
            ..current
        })
    }

    async fn delete(&self, id: PostId) -> Result<Post, StoreError> {
        let removed = self.find(id).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM post_images WHERE post_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let changed = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(removed)
    }
}
