use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;

use crate::config::AuthConfig;
use crate::db::{bounded, TokenUpdate, UserStore, UserType};
use crate::error::{AppError, TokenError};

/// Identity a token pair is minted for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIdentity {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: UserType,
    pub user_id: String,
}

/// Which half of a pair a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Payload of an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub uid: String,
    pub user_type: UserType,
    pub kind: TokenKind,
    pub exp: i64,     // Expiration time
    pub iat: i64,     // Issued at
}

impl Claims {
    pub fn identity(&self) -> TokenIdentity {
        TokenIdentity {
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            user_type: self.user_type,
            user_id: self.uid.clone(),
        }
    }
}

/// Payload of a refresh token: only enough to find the user again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub uid: String,
    pub kind: TokenKind,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Copy)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: Duration::hours(24),
            refresh: Duration::hours(168),
        }
    }
}

/// Mints and verifies HS256 session tokens and writes the latest pair back
/// to the user record.
pub struct TokenEngine {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetimes: TokenLifetimes,
    store: Arc<dyn UserStore>,
    op_timeout: std::time::Duration,
}

impl TokenEngine {
    pub fn new(
        secret: Option<&str>,
        lifetimes: TokenLifetimes,
        store: Arc<dyn UserStore>,
        op_timeout: std::time::Duration,
    ) -> Result<Self, AppError> {
        let secret = secret
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::ConfigError("auth.jwt_secret is not set".into()))?;

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked in `check_expiry` so that exp == now is already expired.
        validation.validate_exp = false;
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lifetimes,
            store,
            op_timeout,
        })
    }

    pub fn from_config(
        config: &AuthConfig,
        store: Arc<dyn UserStore>,
        op_timeout: std::time::Duration,
    ) -> Result<Self, AppError> {
        let lifetimes = TokenLifetimes {
            access: lifetime("auth.access_token_ttl_hours", config.access_token_ttl_hours)?,
            refresh: lifetime("auth.refresh_token_ttl_hours", config.refresh_token_ttl_hours)?,
        };
        Self::new(config.jwt_secret.as_deref(), lifetimes, store, op_timeout)
    }

    /// Builds an access/refresh pair for `identity`, both issued now.
    pub fn mint(&self, identity: &TokenIdentity) -> Result<TokenPair, AppError> {
        let now = Utc::now();

        let claims = Claims {
            email: identity.email.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            uid: identity.user_id.clone(),
            user_type: identity.user_type,
            kind: TokenKind::Access,
            exp: expiry(now, self.lifetimes.access)?,
            iat: now.timestamp(),
        };
        let refresh_claims = RefreshClaims {
            uid: identity.user_id.clone(),
            kind: TokenKind::Refresh,
            exp: expiry(now, self.lifetimes.refresh)?,
            iat: now.timestamp(),
        };

        Ok(TokenPair {
            token: self.sign(&claims)?,
            refresh_token: self.sign(&refresh_claims)?,
        })
    }

    /// Verifies an access token and returns its claims.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let claims: Claims = self.verify(token)?;
        if claims.kind != TokenKind::Access {
            return Err(TokenError::Malformed);
        }
        check_expiry(claims.exp)?;
        Ok(claims)
    }

    /// Verifies a refresh token and returns its claims.
    pub fn validate_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let claims: RefreshClaims = self.verify(token)?;
        if claims.kind != TokenKind::Refresh {
            return Err(TokenError::Malformed);
        }
        check_expiry(claims.exp)?;
        Ok(claims)
    }

    /// Stores `pair` on the record with external id `user_id` and bumps
    /// its `updated_at`.
    pub async fn persist(&self, pair: &TokenPair, user_id: &str) -> Result<(), AppError> {
        let update = TokenUpdate {
            token: pair.token.clone(),
            refresh_token: pair.refresh_token.clone(),
            updated_at: Utc::now(),
        };
        bounded(self.op_timeout, self.store.update_tokens(user_id, update)).await
    }

    /// Replaces the stored pair of `user_id` with `pair`, but only while its
    /// refresh token is still `current_refresh_token`.
    pub async fn rotate(
        &self,
        pair: &TokenPair,
        user_id: &str,
        current_refresh_token: &str,
    ) -> Result<(), AppError> {
        let update = TokenUpdate {
            token: pair.token.clone(),
            refresh_token: pair.refresh_token.clone(),
            updated_at: Utc::now(),
        };
        let rotated = bounded(
            self.op_timeout,
            self.store.rotate_tokens(user_id, current_refresh_token, update),
        )
        .await?;

        if !rotated {
            return Err(TokenError::Superseded.into());
        }
        Ok(())
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(format!("Failed to sign token: {}", e)))
    }

    fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T, TokenError> {
        let data = decode::<T>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

/// A configured lifetime in hours. It must be positive and representable
/// as an expiry from now.
fn lifetime(key: &str, hours: i64) -> Result<Duration, AppError> {
    let invalid = || AppError::ConfigError(format!("{} must be a positive number of hours, got {}", key, hours));
    if hours <= 0 {
        return Err(invalid());
    }
    let duration = Duration::try_hours(hours).ok_or_else(invalid)?;
    Utc::now().checked_add_signed(duration).ok_or_else(invalid)?;
    Ok(duration)
}

fn expiry(now: DateTime<Utc>, lifetime: Duration) -> Result<i64, AppError> {
    now.checked_add_signed(lifetime)
        .map(|exp| exp.timestamp())
        .ok_or_else(|| AppError::ConfigError("token lifetime is out of range".into()))
}

fn check_expiry(exp: i64) -> Result<(), TokenError> {
    if exp <= Utc::now().timestamp() {
        return Err(TokenError::Expired);
    }
    Ok(())
}
