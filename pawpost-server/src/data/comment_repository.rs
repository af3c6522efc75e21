use crate::domain::{Comment, DomainError};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, post_id: i64, author_id: i64, content: String) -> Result<Comment, DomainError>;
    async fn find_by_id(&self, id: i64) -> Result<Comment, DomainError>;
    async fn delete(&self, id: i64) -> Result<(), DomainError>;
    async fn find_by_post(&self, post_id: i64) -> Result<Vec<Comment>, DomainError>;
}

pub struct PostgresCommentRepository {
    pool: PgPool,
}

impl PostgresCommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_comment(row: &PgRow) -> Result<Comment, DomainError> {
    Ok(Comment {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        author_id: row.try_get("author_id")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn create(&self, post_id: i64, author_id: i64, content: String) -> Result<Comment, DomainError> {
        let row = sqlx::query(
            r#"
            INSERT INTO comments (post_id, author_id, content, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING id, post_id, author_id, content, created_at
            "#,
        )
        .bind(post_id)
        .bind(author_id)
        .bind(&content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create comment: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        map_comment(&row)
    }

    async fn find_by_id(&self, id: i64) -> Result<Comment, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, post_id, author_id, content, created_at
            FROM comments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => map_comment(&row),
            None => Err(DomainError::CommentNotFound),
        }
    }

    async fn delete(&self, id: i64) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            Err(DomainError::CommentNotFound)
        } else {
            Ok(())
        }
    }

    async fn find_by_post(&self, post_id: i64) -> Result<Vec<Comment>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, post_id, author_id, content, created_at
            FROM comments
            WHERE post_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_comment).collect()
    }
}
