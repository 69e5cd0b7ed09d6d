pub mod admin;
pub mod auth;
pub mod health;
pub mod memofiches;
pub mod orders;
pub mod webinars;

use actix_web::web;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::models::users;
use crate::store::Store;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // Les erreurs de désérialisation suivent le même format { error, code }
    cfg.app_data(
        web::JsonConfig::default().error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default().error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .service(
        web::scope("/api")
            .service(health::health_check)
            .configure(auth::auth_routes)
            .configure(memofiches::memofiches_routes)
            .configure(webinars::webinars_routes)
            .configure(orders::orders_routes)
            .configure(admin::admin_routes),
    );
}

/// Recharge le compte du porteur du token (abonnement, liens, crédits à jour)
pub(crate) async fn current_user(store: &dyn Store, auth_user: &AuthUser) -> ApiResult<users::Model> {
    store
        .find_user(auth_user.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))
}
