use actix_web::{get, post, web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

use crate::error::{parse_id, ApiError, ApiResult};
use crate::middleware::{AuthUser, MaybeAuthUser};
use crate::models::dto::{MemoFicheDetail, MemoFicheSummary, Page};
use crate::models::enums::FicheStatus;
use crate::models::memofiches::KeyPoints;
use crate::routes::current_user;
use crate::services::entitlement_service::{load_context, resolve_access};
use crate::state::AppState;
use crate::store::{FicheQuery, NewMemoFiche};

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;
/// Borne le décalage (page - 1) * limit calculé par le stockage
const MAX_PAGE: u64 = 10_000;

#[derive(Deserialize)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub theme: Option<String>,
    pub system: Option<String>,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemoFicheRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub short_description: String,
    #[validate(length(min = 1))]
    pub theme: String,
    #[validate(length(min = 1))]
    pub system: String,
    pub status: Option<FicheStatus>,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub key_points: Vec<String>,
    pub sections: Option<serde_json::Value>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// GET /memofiches - Liste paginée avec isLocked (auth facultative)
#[get("")]
pub async fn list_memofiches(
    auth_user: MaybeAuthUser,
    query: web::Query<ListQuery>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let store = state.store();

    let user = match &auth_user.0 {
        Some(auth_user) => Some(current_user(store, auth_user).await?),
        None => None,
    };

    // Contexte chargé une fois pour toute la page
    let context = load_context(store, user.as_ref()).await?;

    let query = query.into_inner();
    let page = query.page.unwrap_or(1).max(1);
    if page > MAX_PAGE {
        return Err(ApiError::BadRequest(format!("page must be at most {}", MAX_PAGE)));
    }
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    let (fiches, total) = store
        .list_memofiches(&FicheQuery {
            include_unpublished: user.as_ref().is_some_and(|u| u.role.is_back_office()),
            search: non_empty(query.search),
            theme: non_empty(query.theme),
            system: non_empty(query.system),
            page,
            limit,
        })
        .await?;

    let now = Utc::now();
    let items = fiches
        .into_iter()
        .map(|fiche| {
            let access = resolve_access(user.as_ref(), &fiche, &context, now);
            MemoFicheSummary::new(fiche, access.locked)
        })
        .collect();

    Ok(HttpResponse::Ok().json(Page::new(items, total, page, limit)))
}

/// GET /memofiches/{id} - Fiche complète, 403 si verrouillée (PROTÉGÉE)
#[get("/{id}")]
pub async fn get_memofiche(
    auth_user: AuthUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    let store = state.store();

    let user = current_user(store, &auth_user).await?;
    let not_found = || ApiError::NotFound("Memofiche not found".to_string());

    let fiche = store.find_memofiche(id).await?.ok_or_else(not_found)?;

    let context = load_context(store, Some(&user)).await?;
    let access = resolve_access(Some(&user), &fiche, &context, Utc::now());

    if !access.visible {
        return Err(not_found());
    }
    if access.locked {
        tracing::debug!(user_id = user.id, fiche_id = id, "locked memofiche requested");
        return Err(ApiError::Forbidden(
            "An active subscription is required to read this memofiche".to_string(),
        ));
    }

    Ok(HttpResponse::Ok().json(MemoFicheDetail::from(fiche)))
}

/// POST /memofiches - Créer une fiche (Admin / Formateur)
#[post("")]
pub async fn create_memofiche(
    auth_user: AuthUser,
    body: web::Json<CreateMemoFicheRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    if !auth_user.role.is_back_office() {
        return Err(ApiError::Forbidden("Admin or trainer role required".to_string()));
    }
    body.validate()?;
    let body = body.into_inner();

    let sections = body.sections.unwrap_or_else(|| serde_json::json!([]));
    if !sections.is_array() {
        return Err(ApiError::BadRequest("sections must be an array".to_string()));
    }

    let fiche = state
        .store()
        .insert_memofiche(NewMemoFiche {
            title: body.title,
            short_description: body.short_description,
            theme: body.theme,
            system: body.system,
            status: body.status.unwrap_or(FicheStatus::Draft),
            is_free: body.is_free,
            key_points: KeyPoints(body.key_points),
            sections,
            created_at: Utc::now(),
        })
        .await?;

    tracing::info!(fiche_id = fiche.id, author_id = auth_user.user_id, "memofiche created");

    Ok(HttpResponse::Created().json(MemoFicheDetail::from(fiche)))
}

pub fn memofiches_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/memofiches")
            .service(list_memofiches)
            .service(create_memofiche)
            .service(get_memofiche)
    );
}
