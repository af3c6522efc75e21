use crate::domain::DomainError;
use async_trait::async_trait;
use sqlx::{PgPool, Row};

#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// Returns `false` when the user already liked the post.
    async fn insert(&self, post_id: i64, user_id: i64) -> Result<bool, DomainError>;
    /// Returns `false` when there was no like to remove.
    async fn remove(&self, post_id: i64, user_id: i64) -> Result<bool, DomainError>;
    async fn remove_all_for_post(&self, post_id: i64) -> Result<u64, DomainError>;
    async fn count_for_post(&self, post_id: i64) -> Result<i64, DomainError>;
}

pub struct PostgresLikeRepository {
    pool: PgPool,
}

impl PostgresLikeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LikeRepository for PostgresLikeRepository {
    async fn insert(&self, post_id: i64, user_id: i64) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO likes (post_id, user_id, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (post_id, user_id) DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, post_id: i64, user_id: i64) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_all_for_post(&self, post_id: i64) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM likes WHERE post_id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn count_for_post(&self, post_id: i64) -> Result<i64, DomainError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("count")?)
    }
}
