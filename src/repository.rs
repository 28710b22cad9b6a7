use crate::models::{NewUser, User};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A unique constraint rejected the write (e.g. duplicate email).
    #[error("record already exists")]
    Conflict,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// UserRepository
///
/// Persistence contract for accounts. Handlers only depend on this trait so tests
/// can swap in an in-memory stub.
///
/// **Send + Sync + async_trait** make `Arc<dyn UserRepository>` shareable across
/// Axum's request tasks.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    /// Inserts a new account. Returns `RepositoryError::Conflict` when the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;
}

/// RepositoryState
///
/// The shared handle to the persistence layer held in the application state.
pub type RepositoryState = Arc<dyn UserRepository>;

/// PostgresRepository
///
/// `UserRepository` backed by the `users` table.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password, role, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// create_user
    ///
    /// A duplicate email surfaces as a unique violation (SQLSTATE 23505), which is
    /// mapped to `Conflict` so the handler can answer 409.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password, role, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id, email, password, role, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.role)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(created) => Ok(created),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(RepositoryError::Conflict)
            }
            Err(e) => Err(e.into()),
        }
    }
}
