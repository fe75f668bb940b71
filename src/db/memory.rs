use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::db::models::User;
use crate::db::{TokenUpdate, UserStore};
use crate::error::DatabaseError;

/// In-process `UserStore` keeping records in insertion order.
///
/// Uniqueness is checked and the record appended under one write lock, so
/// concurrent signups with the same email or phone cannot both land.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn count_by_email(&self, email: &str) -> Result<i64, DatabaseError> {
        let users = self.users.read().await;
        Ok(users.iter().filter(|u| u.email == email).count() as i64)
    }

    async fn count_by_phone(&self, phone: &str) -> Result<i64, DatabaseError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .filter(|u| u.phone.as_deref() == Some(phone))
            .count() as i64)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<User>, DatabaseError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.user_id == user_id).cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), DatabaseError> {
        let mut users = self.users.write().await;

        for existing in users.iter() {
            if existing.user_id == user.user_id {
                return Err(DatabaseError::Duplicate("users_user_id_key".into()));
            }
            if existing.email == user.email {
                return Err(DatabaseError::Duplicate("users_email_key".into()));
            }
            if user.phone.is_some() && existing.phone == user.phone {
                return Err(DatabaseError::Duplicate("users_phone_key".into()));
            }
        }

        users.push(user.clone());
        Ok(())
    }

    async fn update_tokens(&self, user_id: &str, update: TokenUpdate) -> Result<(), DatabaseError> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.user_id == user_id)
            .ok_or(DatabaseError::NotFound)?;

        user.token = Some(update.token);
        user.refresh_token = Some(update.refresh_token);
        user.updated_at = update.updated_at;
        Ok(())
    }

    async fn rotate_tokens(
        &self,
        user_id: &str,
        current_refresh_token: &str,
        update: TokenUpdate,
    ) -> Result<bool, DatabaseError> {
        let mut users = self.users.write().await;
        let user = match users.iter_mut().find(|u| {
            u.user_id == user_id && u.refresh_token.as_deref() == Some(current_refresh_token)
        }) {
            Some(user) => user,
            None => return Ok(false),
        };

        user.token = Some(update.token);
        user.refresh_token = Some(update.refresh_token);
        user.updated_at = update.updated_at;
        Ok(true)
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<User>, DatabaseError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<i64, DatabaseError> {
        Ok(self.users.read().await.len() as i64)
    }
}
