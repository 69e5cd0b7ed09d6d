use actix_web::{get, post, web, HttpResponse};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use crate::error::{parse_id, ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::models::dto::{AttendeeView, WebinarView};
use crate::models::enums::WebinarGroup;
use crate::state::AppState;
use crate::store::{NewWebinar, WebinarQuery};

#[derive(Deserialize)]
pub struct ListQuery {
    pub group: Option<WebinarGroup>,
    pub theme: Option<String>,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateWebinarRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub group: WebinarGroup,
    pub master_class_theme: Option<String>,
    pub date: DateTime<Utc>,
    pub price: Option<Decimal>,
}

/// GET /webinars - Liste (filtres group / theme), inscriptions omises
#[get("")]
pub async fn list_webinars(
    query: web::Query<ListQuery>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let query = query.into_inner();
    let webinars = state
        .store()
        .list_webinars(&WebinarQuery {
            group: query.group,
            theme: query.theme.filter(|t| !t.trim().is_empty()),
        })
        .await?;

    let views: Vec<WebinarView> = webinars.into_iter().map(WebinarView::from).collect();
    Ok(HttpResponse::Ok().json(views))
}

#[get("/{id}")]
pub async fn get_webinar(path: web::Path<String>, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;

    let webinar = state
        .store()
        .find_webinar(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Webinar not found".to_string()))?;

    Ok(HttpResponse::Ok().json(WebinarView::from(webinar)))
}

/// GET /webinars/{id}/attendees - Inscriptions d'une séance (Admin / AdminWebinar)
#[get("/{id}/attendees")]
pub async fn list_attendees(
    auth_user: AuthUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    if !auth_user.role.can_manage_orders() {
        return Err(ApiError::Forbidden("Admin role required".to_string()));
    }
    let id = parse_id(&path)?;
    let store = state.store();

    if store.find_webinar(id).await?.is_none() {
        return Err(ApiError::NotFound("Webinar not found".to_string()));
    }

    let attendees: Vec<AttendeeView> = store
        .list_attendees(id)
        .await?
        .into_iter()
        .map(AttendeeView::from)
        .collect();

    Ok(HttpResponse::Ok().json(attendees))
}

/// POST /webinars - Créer une séance (Admin / AdminWebinar)
#[post("")]
pub async fn create_webinar(
    auth_user: AuthUser,
    body: web::Json<CreateWebinarRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    if !auth_user.role.can_manage_orders() {
        return Err(ApiError::Forbidden("Admin role required".to_string()));
    }
    body.validate()?;
    let body = body.into_inner();

    if body.price.is_some_and(|price| price.is_sign_negative()) {
        return Err(ApiError::BadRequest("price cannot be negative".to_string()));
    }

    let webinar = state
        .store()
        .insert_webinar(NewWebinar {
            title: body.title,
            description: body.description,
            group: body.group,
            master_class_theme: body
                .master_class_theme
                .map(|theme| theme.trim().to_string())
                .filter(|theme| !theme.is_empty()),
            date: body.date,
            price: body.price.map(|price| price.round_dp(3)),
            created_at: Utc::now(),
        })
        .await?;

    tracing::info!(webinar_id = webinar.id, group = ?webinar.group, "webinar created");

    Ok(HttpResponse::Created().json(WebinarView::from(webinar)))
}

pub fn webinars_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/webinars")
            .service(list_webinars)
            .service(create_webinar)
            .service(list_attendees)
            .service(get_webinar)
    );
}
