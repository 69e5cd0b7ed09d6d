use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use serde::Serialize;

use crate::error::ApiError;
use crate::models::enums::Role;
use crate::services::Actor;
use crate::state::AppState;
use crate::utils::jwt;

/// Infos de l'utilisateur authentifié, extraites du token JWT.
/// Utilisée comme extracteur dans les routes protégées.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id,
            role: self.role,
        }
    }
}

/// Authentification facultative : pas de header = visiteur anonyme,
/// header présent mais token invalide = 401
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(match bearer_token(req) {
            Some(token) => token.and_then(|token| decode(req, token)),
            None => Err(ApiError::Unauthorized("Missing Authorization header".to_string())),
        })
    }
}

impl FromRequest for MaybeAuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(match bearer_token(req) {
            Some(token) => token.and_then(|token| decode(req, token)).map(|user| MaybeAuthUser(Some(user))),
            None => Ok(MaybeAuthUser(None)),
        })
    }
}

/// Extrait le token du header "Authorization: Bearer <token>".
/// `None` si le header est absent.
fn bearer_token(req: &HttpRequest) -> Option<Result<&str, ApiError>> {
    let header = req.headers().get("Authorization")?;

    let token = header
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid Authorization header".to_string()))
        .and_then(|value| {
            value.strip_prefix("Bearer ").ok_or_else(|| {
                ApiError::Unauthorized("Invalid Authorization format (expected: Bearer <token>)".to_string())
            })
        });

    Some(token)
}

fn decode(req: &HttpRequest, token: &str) -> Result<AuthUser, ApiError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| ApiError::Internal("AppState is not registered".to_string()))?;

    let claims = jwt::verify_token(&state.config.jwt_secret, token.trim()).map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        ApiError::Unauthorized("Invalid or expired token".to_string())
    })?;

    Ok(AuthUser {
        user_id: claims.sub,
        email: claims.email,
        role: claims.role,
    })
}
