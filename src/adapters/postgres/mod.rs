//! PostgreSQL adapters.
//!
//! - `PostgresMessageStore` - message rows, cursor pages and conversation summaries
//! - `PostgresUserDirectory` - user lookup by id or email

mod message_store;
mod user_directory;

pub use message_store::PostgresMessageStore;
pub use user_directory::PostgresUserDirectory;

use sqlx::PgPool;

use crate::domain::foundation::DomainError;

/// Applies the bundled SQL migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DomainError::database("Failed to run migrations", e))
}
