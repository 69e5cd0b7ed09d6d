use actix_web::{get, post, web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::models::dto::{AuthResponse, UserProfile};
use crate::models::enums::Role;
use crate::models::users;
use crate::routes::current_user;
use crate::services::user_service::{Registration, UserService};
use crate::state::AppState;
use crate::utils::jwt;

// DTO pour l'inscription
#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    pub role: Role,
    pub pharmacist_id: Option<i32>,
}

// DTO pour la connexion
#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

fn issue_token(state: &AppState, user: &users::Model) -> ApiResult<String> {
    jwt::generate_token(
        &state.config.jwt_secret,
        state.config.jwt_ttl_hours,
        user.id,
        &user.email,
        user.role,
    )
    .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))
}

/// POST /auth/register - Créer un compte (PUBLIC)
#[post("/register")]
pub async fn register(
    body: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    body.validate()?;
    let body = body.into_inner();

    let user = UserService::register(
        state.store(),
        Registration {
            email: body.email,
            password: body.password,
            first_name: body.first_name,
            last_name: body.last_name,
            role: body.role,
            pharmacist_id: body.pharmacist_id,
        },
        Utc::now(),
    )
    .await?;

    let token = issue_token(&state, &user)?;

    Ok(HttpResponse::Created().json(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// POST /auth/login - Se connecter (PUBLIC)
#[post("/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    body.validate()?;

    let user = UserService::authenticate(state.store(), &body.email, &body.password, Utc::now()).await?;
    let token = issue_token(&state, &user)?;

    tracing::info!(user_id = user.id, "user logged in");

    Ok(HttpResponse::Ok().json(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// GET /auth/me - Profil, abonnement et crédits (PROTÉGÉE)
#[get("/me")]
pub async fn me(auth_user: AuthUser, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let user = current_user(state.store(), &auth_user).await?;
    let user = UserService::heal_subscription(state.store(), user, Utc::now()).await?;

    Ok(HttpResponse::Ok().json(UserProfile::from(user)))
}

pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(register)
            .service(login)
            .service(me)
    );
}
