use actix_web::{get, web, HttpResponse};
use chrono::Utc;

use crate::config::StoreBackend;
use crate::models::health::HealthResponse;
use crate::state::AppState;

#[get("/health")]
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let store = match state.config.store_backend {
        StoreBackend::Postgres => "postgres",
        StoreBackend::Memory => "memory",
    };

    HttpResponse::Ok().json(HealthResponse::up(store, Utc::now()))
}

#[cfg(test)]
mod tests {
    use crate::routes::{configure_routes, test_support};
    use actix_web::{http::StatusCode, test, App};
    use serde_json::Value;

    #[actix_web::test]
    async fn test_health_reports_store_backend() {
        let (state, _store) = test_support::state();
        let app = test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["store"], "memory");
    }
}
