use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::auth::guard::{check_owner_or_admin, check_user_type, AuthContext};
use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::token::{TokenEngine, TokenIdentity, TokenPair};
use crate::auth::validation::{validate_signup, SignupRequest};
use crate::config::TokenPersistence;
use crate::db::{bounded, User, UserStore, UserType};
use crate::error::{AppError, AuthError, DatabaseError, TokenError};

/// One page of users plus the total record count.
///
/// `total_count` comes from a separate read, so under concurrent signups it
/// may not agree with the window.
#[derive(Debug, Serialize)]
pub struct UserPage {
    pub users: Vec<User>,
    pub page: i64,
    pub limit: i64,
    #[serde(rename = "totalCount")]
    pub total_count: i64,
}

pub struct AccountService {
    store: Arc<dyn UserStore>,
    tokens: Arc<TokenEngine>,
    op_timeout: Duration,
    token_persistence: TokenPersistence,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn UserStore>,
        tokens: Arc<TokenEngine>,
        op_timeout: Duration,
        token_persistence: TokenPersistence,
    ) -> Self {
        Self {
            store,
            tokens,
            op_timeout,
            token_persistence,
        }
    }

    pub async fn signup(&self, req: &SignupRequest) -> Result<User, AppError> {
        let valid = validate_signup(req).map_err(AppError::ValidationError)?;

        if bounded(self.op_timeout, self.store.count_by_email(&valid.user.email)).await? > 0 {
            return Err(AppError::ConflictError("Email already exists".into()));
        }
        if let Some(phone) = valid.user.phone.as_deref() {
            if bounded(self.op_timeout, self.store.count_by_phone(phone)).await? > 0 {
                return Err(AppError::ConflictError("Phone number already exists".into()));
            }
        }

        let password_hash = hash_password_blocking(valid.password).await?;
        let mut user = User::new(valid.user, password_hash);

        let pair = self.tokens.mint(&identity_of(&user))?;
        user.token = Some(pair.token);
        user.refresh_token = Some(pair.refresh_token);

        // The store's unique constraints decide races the counts above miss.
        bounded(self.op_timeout, self.store.insert(&user))
            .await
            .map_err(conflict_from_duplicate)?;

        info!("Created user {} ({})", user.user_id, user.user_type);
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, AppError> {
        let found = bounded(self.op_timeout, self.store.find_by_email(email))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password_blocking(password.to_string(), found.password.clone()).await? {
            return Err(AuthError::InvalidCredentials.into());
        }

        let pair = self.tokens.mint(&identity_of(&found))?;
        self.store_tokens(&pair, &found.user_id).await?;

        let user = bounded(self.op_timeout, self.store.find_by_user_id(&found.user_id))
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        info!("User {} logged in", user.user_id);
        Ok(user)
    }

    /// Exchanges the latest refresh token of a user for a new pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let claims = self.tokens.validate_refresh(refresh_token)?;

        let user = bounded(self.op_timeout, self.store.find_by_user_id(&claims.uid))
            .await?
            .ok_or(TokenError::Malformed)?;

        if user.refresh_token.as_deref() != Some(refresh_token) {
            return Err(TokenError::Superseded.into());
        }

        // A concurrent refresh may win between the check above and here.
        let pair = self.tokens.mint(&identity_of(&user))?;
        self.tokens.rotate(&pair, &user.user_id, refresh_token).await?;

        info!("Refreshed tokens for user {}", user.user_id);
        Ok(pair)
    }

    pub async fn list_users(&self, ctx: &AuthContext, page: i64, limit: i64) -> Result<UserPage, AppError> {
        check_user_type(ctx, UserType::Admin)?;

        if page < 1 {
            return Err(AppError::validation("Invalid page parameter"));
        }
        if limit < 1 {
            return Err(AppError::validation("Invalid limit parameter"));
        }
        let skip = (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| AppError::validation("Invalid page parameter"))?;

        let users = bounded(self.op_timeout, self.store.list(skip, limit)).await?;
        let total_count = bounded(self.op_timeout, self.store.count()).await?;

        Ok(UserPage {
            users,
            page,
            limit,
            total_count,
        })
    }

    pub async fn get_user(&self, ctx: &AuthContext, user_id: &str) -> Result<User, AppError> {
        check_owner_or_admin(ctx, user_id)?;

        bounded(self.op_timeout, self.store.find_by_user_id(user_id))
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    async fn store_tokens(&self, pair: &TokenPair, user_id: &str) -> Result<(), AppError> {
        match self.tokens.persist(pair, user_id).await {
            Ok(()) => Ok(()),
            Err(e) if self.token_persistence == TokenPersistence::BestEffort => {
                warn!("Failed to store tokens for user {}: {}", user_id, e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

fn identity_of(user: &User) -> TokenIdentity {
    TokenIdentity {
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        user_type: user.user_type,
        user_id: user.user_id.clone(),
    }
}

fn conflict_from_duplicate(err: AppError) -> AppError {
    match err {
        AppError::DatabaseError(DatabaseError::Duplicate(constraint)) => {
            if constraint.contains("phone") {
                AppError::ConflictError("Phone number already exists".into())
            } else if constraint.contains("email") {
                AppError::ConflictError("Email already exists".into())
            } else {
                AppError::DatabaseError(DatabaseError::Duplicate(constraint))
            }
        }
        other => other,
    }
}
