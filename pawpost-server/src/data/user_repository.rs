use crate::domain::user::SignUpRequest;
use crate::domain::{DomainError, User};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, req: SignUpRequest, password_hash: String) -> Result<User, DomainError>;
    async fn find_by_username(&self, username: &str) -> Result<User, DomainError>;
    async fn find_by_email(&self, email: &str) -> Result<User, DomainError>;
    async fn find_by_id(&self, id: i64) -> Result<User, DomainError>;
    async fn update_profile(
        &self,
        id: i64,
        nickname: Option<String>,
        password_hash: Option<String>,
    ) -> Result<User, DomainError>;
}

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_user(row: &PgRow) -> Result<User, DomainError> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        nickname: row.try_get("nickname")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, req: SignUpRequest, password_hash: String) -> Result<User, DomainError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (username, email, nickname, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING id, username, email, nickname, password_hash, created_at, updated_at
            "#,
        )
        .bind(&req.username)
        .bind(&req.email)
        .bind(&req.nickname)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create user: {}", e);
            if e.to_string().contains("duplicate key") {
                DomainError::UserAlreadyExists
            } else {
                DomainError::DatabaseError(e.to_string())
            }
        })?;

        map_user(&row)
    }

    async fn find_by_username(&self, username: &str) -> Result<User, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, username, email, nickname, password_hash, created_at, updated_at
            FROM users
            WHERE username = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => map_user(&row),
            None => Err(DomainError::UserNotFound),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<User, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, username, email, nickname, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => map_user(&row),
            None => Err(DomainError::UserNotFound),
        }
    }

    async fn find_by_id(&self, id: i64) -> Result<User, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, username, email, nickname, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => map_user(&row),
            None => Err(DomainError::UserNotFound),
        }
    }

    async fn update_profile(
        &self,
        id: i64,
        nickname: Option<String>,
        password_hash: Option<String>,
    ) -> Result<User, DomainError> {
        let row = sqlx::query(
            r#"
            UPDATE users
            SET
                nickname = COALESCE($1, nickname),
                password_hash = COALESCE($2, password_hash),
                updated_at = NOW()
            WHERE id = $3 AND deleted_at IS NULL
            RETURNING id, username, email, nickname, password_hash, created_at, updated_at
            "#,
        )
        .bind(nickname)
        .bind(password_hash)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => map_user(&row),
            None => Err(DomainError::UserNotFound),
        }
    }
}
