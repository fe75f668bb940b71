//! Credential store for the server.
//!
//! `UserStore` is the seam the auth layer talks to; `DbOperations` backs it
//! with Postgres and `MemoryUserStore` keeps records in-process.

pub mod memory;
pub mod models;
pub mod operations;

pub use memory::MemoryUserStore;
pub use models::{NewUser, User, UserRow, UserType};
pub use operations::DbOperations;

use crate::error::{AppError, DatabaseError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;

/// Tokens written back to a user record after they are minted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenUpdate {
    pub token: String,
    pub refresh_token: String,
    pub updated_at: DateTime<Utc>,
}

/// Persistence for user records. Implementations enforce uniqueness of
/// `email`, of `phone` when present and of `user_id`, reporting a violation
/// as `DatabaseError::Duplicate`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn count_by_email(&self, email: &str) -> Result<i64, DatabaseError>;

    async fn count_by_phone(&self, phone: &str) -> Result<i64, DatabaseError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<User>, DatabaseError>;

    async fn insert(&self, user: &User) -> Result<(), DatabaseError>;

    /// Fails with `DatabaseError::NotFound` when no record has `user_id`.
    async fn update_tokens(&self, user_id: &str, update: TokenUpdate) -> Result<(), DatabaseError>;

    /// Like `update_tokens`, but only while the stored refresh token still
    /// equals `current_refresh_token`. Returns false when nothing matched.
    async fn rotate_tokens(
        &self,
        user_id: &str,
        current_refresh_token: &str,
        update: TokenUpdate,
    ) -> Result<bool, DatabaseError>;

    /// A window of records in store-native (insertion) order.
    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<User>, DatabaseError>;

    async fn count(&self) -> Result<i64, DatabaseError>;
}

/// Runs a store call under `limit`, surfacing an elapsed bound as
/// `DatabaseError::Timeout`. The in-flight call is dropped on timeout.
pub async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, DatabaseError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(AppError::from),
        Err(_) => Err(AppError::DatabaseError(DatabaseError::Timeout(limit))),
    }
}
