use crate::domain::image::ImageRef;
use crate::domain::page::PageRequest;
use crate::domain::post::{NewPost, PostChanges, PostStatus};
use crate::domain::{DomainError, Post};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, new_post: NewPost) -> Result<Post, DomainError>;
    /// Returns the row whatever its status; callers decide what deleted means.
    async fn find_by_id(&self, id: i64) -> Result<Post, DomainError>;
    async fn update(&self, id: i64, changes: PostChanges) -> Result<Post, DomainError>;
    /// Adds one view to an active post and returns the new count,
    /// or `None` when no active post has this id.
    async fn increment_views(&self, id: i64) -> Result<Option<i64>, DomainError>;
    async fn soft_delete(&self, id: i64) -> Result<(), DomainError>;
    async fn find_top_by_views(&self, limit: i64) -> Result<Vec<Post>, DomainError>;
    async fn find_active_page(&self, page: PageRequest) -> Result<(Vec<Post>, i64), DomainError>;
}

pub struct PostgresPostRepository {
    pool: PgPool,
}

impl PostgresPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const POST_COLUMNS: &str =
    "id, author_id, title, content, image_url, image_key, views, status, created_at, updated_at";

fn map_post(row: &PgRow) -> Result<Post, DomainError> {
    let image_url: Option<String> = row.try_get("image_url")?;
    let image_key: Option<String> = row.try_get("image_key")?;
    let status: String = row.try_get("status")?;

    Ok(Post {
        id: row.try_get("id")?,
        author_id: row.try_get("author_id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        image: image_url.map(|url| match image_key {
            Some(key) => ImageRef::new(url, key),
            None => ImageRef::legacy(url),
        }),
        views: row.try_get("views")?,
        status: status.parse()?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn create(&self, new_post: NewPost) -> Result<Post, DomainError> {
        let (image_url, image_key) = match new_post.image {
            Some(image) => (Some(image.url), image.key),
            None => (None, None),
        };

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO posts (author_id, title, content, image_url, image_key, views, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 0, $6, NOW(), NOW())
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .bind(new_post.author_id)
        .bind(&new_post.title)
        .bind(&new_post.content)
        .bind(image_url)
        .bind(image_key)
        .bind(PostStatus::Active.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create post: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        map_post(&row)
    }

    async fn find_by_id(&self, id: i64) -> Result<Post, DomainError> {
        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = $1", POST_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => map_post(&row),
            None => Err(DomainError::PostNotFound),
        }
    }

    async fn update(&self, id: i64, changes: PostChanges) -> Result<Post, DomainError> {
        let (image_url, image_key) = match changes.image {
            Some(image) => (Some(image.url), image.key),
            None => (None, None),
        };

        let row = sqlx::query(&format!(
            r#"
            UPDATE posts
            SET
                title = $1,
                content = $2,
                image_url = $3,
                image_key = $4,
                updated_at = NOW()
            WHERE id = $5 AND status = $6
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .bind(&changes.title)
        .bind(&changes.content)
        .bind(image_url)
        .bind(image_key)
        .bind(id)
        .bind(PostStatus::Active.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => map_post(&row),
            None => Err(DomainError::PostNotFound),
        }
    }

    async fn increment_views(&self, id: i64) -> Result<Option<i64>, DomainError> {
        let row = sqlx::query(
            r#"
            UPDATE posts
            SET views = views + 1
            WHERE id = $1 AND status = $2
            RETURNING views
            "#,
        )
        .bind(id)
        .bind(PostStatus::Active.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("views")?)),
            None => Ok(None),
        }
    }

    async fn soft_delete(&self, id: i64) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status = $3
            "#,
        )
        .bind(PostStatus::Deleted.as_str())
        .bind(id)
        .bind(PostStatus::Active.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            Err(DomainError::PostNotFound)
        } else {
            Ok(())
        }
    }

    async fn find_top_by_views(&self, limit: i64) -> Result<Vec<Post>, DomainError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM posts
            WHERE status = $1
            ORDER BY views DESC, id DESC
            LIMIT $2
            "#,
            POST_COLUMNS
        ))
        .bind(PostStatus::Active.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_post).collect()
    }

    async fn find_active_page(&self, page: PageRequest) -> Result<(Vec<Post>, i64), DomainError> {
        let count_row = sqlx::query("SELECT COUNT(*) as count FROM posts WHERE status = $1")
            .bind(PostStatus::Active.as_str())
            .fetch_one(&self.pool)
            .await?;

        let total: i64 = count_row.try_get("count")?;

        // Column and direction come from closed enums, never from raw input.
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM posts
            WHERE status = $1
            ORDER BY {} {}, id {}
            LIMIT $2 OFFSET $3
            "#,
            POST_COLUMNS,
            page.sort.column(),
            page.direction.as_sql(),
            page.direction.as_sql()
        ))
        .bind(PostStatus::Active.as_str())
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let posts = rows.iter().map(map_post).collect::<Result<Vec<Post>, DomainError>>()?;

        Ok((posts, total))
    }
}
