use sqlx::FromRow;
use thiserror::Error;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,                    // assigned by the store
    pub full_name: String,          // trimmed, non-empty
    pub email: String,              // lowercased, unique
    pub password_hash: String,      // Argon2 PHC string
    pub created_at: OffsetDateTime, // assigned by the store
}

/// Fields the caller supplies when creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a user with this email already exists")]
    Duplicate,
    #[error("user store failure: {0}")]
    Backend(#[from] anyhow::Error),
}
