pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;

use std::sync::Arc;
use actix_web::HttpResponse;
use tracing::info;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use auth::{AccountService, AuthContext, TokenEngine};
pub use db::{DbOperations, MemoryUserStore, User, UserStore, UserType};

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Application state shared across all workers. Built once at startup and
/// never mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub store: Arc<dyn UserStore>,
    pub tokens: Arc<TokenEngine>,
    pub accounts: Arc<AccountService>,
}

impl AppState {
    /// Connects the store named by `database.url` and wires the services.
    pub async fn new(config: Settings) -> Result<Self> {
        let store: Arc<dyn UserStore> = if config.database.url.starts_with("memory://") {
            info!("Using in-memory user store");
            Arc::new(MemoryUserStore::new())
        } else {
            Arc::new(
                DbOperations::new_with_options(
                    &config.database.url,
                    config.database.max_connections,
                    config.database.connect_timeout(),
                )
                .await?,
            )
        };

        Self::with_store(config, store)
    }

    pub fn with_store(config: Settings, store: Arc<dyn UserStore>) -> Result<Self> {
        let op_timeout = config.database.operation_timeout();
        let tokens = Arc::new(TokenEngine::from_config(&config.auth, store.clone(), op_timeout)?);
        let accounts = Arc::new(AccountService::new(
            store.clone(),
            tokens.clone(),
            op_timeout,
            config.auth.token_persistence,
        ));

        Ok(Self {
            config: Arc::new(config),
            store,
            tokens,
            accounts,
        })
    }
}
