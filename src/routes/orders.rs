use actix_web::{get, post, web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

use crate::error::{parse_id, ApiResult};
use crate::middleware::AuthUser;
use crate::models::dto::PackCatalogView;
use crate::models::orders::ItemRef;
use crate::services::order_service::OrderService;
use crate::state::AppState;

#[derive(Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "Cart is empty"))]
    pub items: Vec<ItemRef>,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPaymentRequest {
    #[validate(length(min = 1, max = 2048))]
    pub proof_url: String,
}

/// GET /orders/packs - Catalogue des packs de crédits (PUBLIC)
#[get("/packs")]
pub async fn list_packs() -> HttpResponse {
    HttpResponse::Ok().json(PackCatalogView::current())
}

/// POST /orders/checkout - Créer une commande à partir du panier
#[post("/checkout")]
pub async fn checkout(
    auth_user: AuthUser,
    body: web::Json<CheckoutRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    body.validate()?;

    let order = OrderService::checkout(state.store(), &auth_user.actor(), body.into_inner().items, Utc::now()).await?;

    Ok(HttpResponse::Created().json(order))
}

/// GET /orders/my-orders - Commandes de l'utilisateur connecté
#[get("/my-orders")]
pub async fn my_orders(auth_user: AuthUser, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let orders = OrderService::list_for_user(state.store(), &auth_user.actor()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

/// GET /orders - Toutes les commandes (Admin / AdminWebinar)
#[get("")]
pub async fn list_orders(auth_user: AuthUser, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let orders = OrderService::list_all(state.store(), &auth_user.actor()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

#[get("/{id}")]
pub async fn get_order(
    auth_user: AuthUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    let order = OrderService::get(state.store(), &auth_user.actor(), id).await?;
    Ok(HttpResponse::Ok().json(order))
}

/// POST /orders/{id}/submit-payment - Déposer le justificatif de paiement
#[post("/{id}/submit-payment")]
pub async fn submit_payment(
    auth_user: AuthUser,
    path: web::Path<String>,
    body: web::Json<SubmitPaymentRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    body.validate()?;

    let order = OrderService::submit_payment(
        state.store(),
        &auth_user.actor(),
        id,
        body.into_inner().proof_url,
        Utc::now(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(order))
}

/// POST /orders/{id}/confirm - Valider le paiement (Admin / AdminWebinar)
#[post("/{id}/confirm")]
pub async fn confirm_order(
    auth_user: AuthUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    let order = OrderService::confirm_order(state.store(), &auth_user.actor(), id, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(order))
}

/// POST /orders/{id}/reconcile - Rejouer les inscriptions d'une commande
#[post("/{id}/reconcile")]
pub async fn reconcile_order(
    auth_user: AuthUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    let report = OrderService::reconcile_order(state.store(), &auth_user.actor(), id, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(report))
}

pub fn orders_routes(cfg: &mut web::ServiceConfig) {
    // Les chemins fixes avant /{id}
    cfg.service(
        web::scope("/orders")
            .service(list_packs)
            .service(checkout)
            .service(my_orders)
            .service(list_orders)
            .service(get_order)
            .service(submit_payment)
            .service(confirm_order)
            .service(reconcile_order)
    );
}
