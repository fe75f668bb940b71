//! Request gate for protected routes.
//!
//! `authenticate` reads the session token from the configured header,
//! validates it and stores an [`AuthContext`] in the request extensions.
//! Handlers pull the context out with `web::ReqData<AuthContext>` and run
//! the role checks below.

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::{web, Error, HttpMessage, ResponseError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::token::Claims;
use crate::db::UserType;
use crate::error::{AppError, AuthError, TokenError};
use crate::AppState;

/// Identity resolved from a valid session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub uid: String,
    pub user_type: UserType,
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            email: claims.email,
            first_name: claims.first_name,
            last_name: claims.last_name,
            uid: claims.uid,
            user_type: claims.user_type,
        }
    }
}

pub async fn authenticate<B: MessageBody>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    match resolve(&req) {
        Ok(ctx) => {
            debug!("Authenticated {} as {}", ctx.uid, ctx.user_type);
            req.extensions_mut().insert(ctx);
            next.call(req).await.map(ServiceResponse::map_into_left_body)
        }
        Err(e) => {
            warn!("Rejected request to {}: {}", req.path(), e);
            let response = e.error_response();
            Ok(req.into_response(response).map_into_right_body())
        }
    }
}

fn resolve(req: &ServiceRequest) -> Result<AuthContext, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::InternalError("application state is not registered".into()))?;

    let header = req
        .headers()
        .get(state.config.auth.token_header.as_str())
        .ok_or(AuthError::MissingToken)?;
    let token = header.to_str().map_err(|_| TokenError::Malformed)?;
    if token.is_empty() {
        return Err(AuthError::MissingToken.into());
    }

    let claims = state.tokens.validate(token)?;
    Ok(claims.into())
}

/// Passes only when the caller holds exactly `required`.
pub fn check_user_type(ctx: &AuthContext, required: UserType) -> Result<(), AuthError> {
    if ctx.user_type != required {
        return Err(AuthError::Unauthorized);
    }
    Ok(())
}

/// Admins may read any account; everyone else only their own.
pub fn check_owner_or_admin(ctx: &AuthContext, target_user_id: &str) -> Result<(), AuthError> {
    match ctx.user_type {
        UserType::Admin => Ok(()),
        UserType::User if ctx.uid == target_user_id => Ok(()),
        UserType::User => Err(AuthError::Unauthorized),
    }
}
