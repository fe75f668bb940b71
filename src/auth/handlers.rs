use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{error, info};

use crate::auth::guard::AuthContext;
use crate::auth::validation::SignupRequest;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

pub async fn signup(
    req: web::Json<SignupRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received signup request for email: {}", req.email.as_deref().unwrap_or(""));
    match state.accounts.signup(&req).await {
        Ok(user) => {
            info!("Signup successful for user: {}", user.user_id);
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "message": "User created successfully"
            })))
        }
        Err(e) => {
            error!("Signup failed: {}", e);
            Err(e)
        }
    }
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received login request for email: {}", req.email);
    match state.accounts.login(&req.email, &req.password).await {
        Ok(user) => Ok(HttpResponse::Ok().json(user)),
        Err(e) => {
            error!("Login failed for email: {}: {}", req.email, e);
            Err(e)
        }
    }
}

pub async fn refresh(
    req: web::Json<RefreshRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let pair = state.accounts.refresh(&req.refresh_token).await?;
    Ok(HttpResponse::Ok().json(pair))
}

pub async fn list_users(
    ctx: web::ReqData<AuthContext>,
    query: web::Query<PageQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let page = parse_positive(query.page.as_deref(), 1, "Invalid page parameter")?;
    let limit = parse_positive(query.limit.as_deref(), 10, "Invalid limit parameter")?;

    let users = state.accounts.list_users(&ctx, page, limit).await?;
    Ok(HttpResponse::Ok().json(users))
}

pub async fn get_user(
    ctx: web::ReqData<AuthContext>,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = state.accounts.get_user(&ctx, &path).await?;
    Ok(HttpResponse::Ok().json(user))
}

fn parse_positive(raw: Option<&str>, default: i64, message: &str) -> Result<i64, AppError> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .parse::<i64>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| AppError::validation(message)),
    }
}
