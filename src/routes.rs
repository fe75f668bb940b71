use actix_web::middleware::from_fn;
use actix_web::{error, web};

use crate::auth::authenticate;
use crate::auth::handlers::{get_user, list_users, login, refresh, signup};
use crate::error::AppError;
use crate::health_check;

/// Registers the HTTP surface. `/users` and `/users/{user_id}` sit behind
/// the token guard; signup, login and refresh are open.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        let message = match &err {
            error::JsonPayloadError::Deserialize(e) => e.to_string(),
            other => other.to_string(),
        };
        AppError::validation(message).into()
    }))
    .route("/health", web::get().to(health_check))
    .service(
        web::scope("/users")
            .route("/signup", web::post().to(signup))
            .route("/login", web::post().to(login))
            .route("/refresh", web::post().to(refresh))
            .service(
                web::resource("")
                    .wrap(from_fn(authenticate))
                    .route(web::get().to(list_users)),
            )
            .service(
                web::resource("/{user_id}")
                    .wrap(from_fn(authenticate))
                    .route(web::get().to(get_user)),
            ),
    );
}
