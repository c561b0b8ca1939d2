use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::auth::repo_types::{NewUser, StoreError, User};

/// Persistence port for user records.
///
/// Implementations must be safe to share between concurrent requests and must
/// enforce email uniqueness themselves; callers only pre-check it.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Find a user by normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Find a user by id.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;

    /// Insert a user, returning the stored record with its assigned id.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;
}

pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, full_name, email, password_hash, created_at
            FROM users
            WHERE email = $1
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("select user by email")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, full_name, email, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("select user by id")?;
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (full_name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, full_name, email, password_hash, created_at
            "#,
        )
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            let unique = e
                .as_database_error()
                .is_some_and(|db_err| db_err.is_unique_violation());
            if unique {
                StoreError::Duplicate
            } else {
                StoreError::Backend(anyhow::Error::new(e).context("insert user"))
            }
        })
    }
}

#[derive(Default)]
struct MemoryInner {
    next_id: i64,
    users: HashMap<i64, User>,
}

/// Process-local store used when no database is configured.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate);
        }
        inner.next_id += 1;
        let stored = User {
            id: inner.next_id,
            full_name: user.full_name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.users.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            full_name: "Ada Lovelace".into(),
            email: email.into(),
            password_hash: "$argon2id$fake".into(),
        }
    }

    #[tokio::test]
    async fn memory_store_assigns_sequential_ids() {
        let store = MemoryUserStore::new();
        let a = store.create(new_user("a@x.com")).await.unwrap();
        let b = store.create(new_user("b@x.com")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(store.find_by_id(2).await.unwrap().unwrap().email, "b@x.com");
        assert_eq!(store.find_by_email("a@x.com").await.unwrap().unwrap().id, 1);
        assert!(store.find_by_email("zzz@x.com").await.unwrap().is_none());
        assert!(store.find_by_id(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn memory_store_rejects_duplicate_email() {
        let store = MemoryUserStore::new();
        store.create(new_user("a@x.com")).await.unwrap();
        let err = store.create(new_user("a@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
    }

    #[tokio::test]
    async fn memory_store_concurrent_creates_keep_one_winner() {
        let store = Arc::new(MemoryUserStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.create(new_user("race@x.com")).await }));
        }
        let mut created = 0;
        for h in handles {
            if h.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }
}
