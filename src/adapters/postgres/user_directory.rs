//! PostgreSQL implementation of UserDirectory.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::messaging::User;
use crate::ports::UserDirectory;

pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a user, or returns the existing row for that email.
    pub async fn upsert(&self, email: &str) -> Result<User, DomainError> {
        let candidate = User::new(UserId::new(), email)?;
        let (id, email): (Uuid, String) = sqlx::query_as(
            r#"
            INSERT INTO users (id, email)
            VALUES ($1, $2)
            ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
            RETURNING id, email
            "#,
        )
        .bind(candidate.id.as_uuid())
        .bind(&candidate.email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to upsert user", e))?;

        Ok(User {
            id: UserId::from_uuid(id),
            email,
        })
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError> {
        let row: Option<(Uuid, String)> =
            sqlx::query_as("SELECT id, email FROM users WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database("Failed to fetch user", e))?;

        Ok(row.map(|(id, email)| User {
            id: UserId::from_uuid(id),
            email,
        }))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let row: Option<(Uuid, String)> =
            sqlx::query_as("SELECT id, email FROM users WHERE email = $1")
                .bind(email.trim().to_lowercase())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database("Failed to fetch user", e))?;

        Ok(row.map(|(id, email)| User {
            id: UserId::from_uuid(id),
            email,
        }))
    }
}
