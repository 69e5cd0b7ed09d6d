use actix_web::{get, patch, post, put, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use validator::Validate;

use crate::error::{parse_id, ApiResult};
use crate::middleware::AuthUser;
use crate::models::dto::UserProfile;
use crate::models::enums::Role;
use crate::services::group_service::GroupService;
use crate::services::user_service::{AdminUserUpdate, UserService};
use crate::state::AppState;

/// Distingue un champ absent (None) d'un champ à null (Some(None))
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[serde(default)]
    pub pharmacist_ids: Vec<i32>,
    #[serde(default)]
    pub preparator_ids: Vec<i32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMembersRequest {
    pub pharmacist_ids: Vec<i32>,
    pub preparator_ids: Vec<i32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedFichesRequest {
    pub fiche_ids: Vec<i32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub role: Option<Role>,
    #[serde(default, deserialize_with = "double_option")]
    pub subscription_end_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub trial_expires_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub pharmacist_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub group_id: Option<Option<i32>>,
}

/// POST /admin/groups - Créer un groupe (Admin)
#[post("/groups")]
pub async fn create_group(
    auth_user: AuthUser,
    body: web::Json<CreateGroupRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    body.validate()?;
    let body = body.into_inner();

    let group = GroupService::create(
        state.store(),
        auth_user.role,
        body.name,
        body.pharmacist_ids,
        body.preparator_ids,
        Utc::now(),
    )
    .await?;

    Ok(HttpResponse::Created().json(group))
}

#[get("/groups/{id}")]
pub async fn get_group(
    auth_user: AuthUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    let group = GroupService::get(state.store(), auth_user.role, id).await?;
    Ok(HttpResponse::Ok().json(group))
}

/// PUT /admin/groups/{id}/members - Remplacer les membres (et users.group_id)
#[put("/groups/{id}/members")]
pub async fn set_group_members(
    auth_user: AuthUser,
    path: web::Path<String>,
    body: web::Json<GroupMembersRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    let body = body.into_inner();

    let group =
        GroupService::set_members(state.store(), auth_user.role, id, body.pharmacist_ids, body.preparator_ids)
            .await?;
    Ok(HttpResponse::Ok().json(group))
}

/// PUT /admin/groups/{id}/assigned-fiches - Remplacer les fiches assignées
#[put("/groups/{id}/assigned-fiches")]
pub async fn set_assigned_fiches(
    auth_user: AuthUser,
    path: web::Path<String>,
    body: web::Json<AssignedFichesRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;

    let group = GroupService::set_assigned_fiches(
        state.store(),
        auth_user.role,
        id,
        body.into_inner().fiche_ids,
        Utc::now(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(group))
}

/// PATCH /admin/users/{id} - Rôle, abonnement, essai, rattachements (Admin)
#[patch("/users/{id}")]
pub async fn update_user(
    auth_user: AuthUser,
    path: web::Path<String>,
    body: web::Json<UpdateUserRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    let body = body.into_inner();

    let user = UserService::admin_update(
        state.store(),
        auth_user.role,
        id,
        AdminUserUpdate {
            role: body.role,
            subscription_end_date: body.subscription_end_date,
            trial_expires_at: body.trial_expires_at,
            pharmacist_id: body.pharmacist_id,
            group_id: body.group_id,
        },
        Utc::now(),
    )
    .await?;

    tracing::info!(user_id = user.id, admin_id = auth_user.user_id, "user updated by admin");

    Ok(HttpResponse::Ok().json(UserProfile::from(user)))
}

pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .service(create_group)
            .service(get_group)
            .service(set_group_members)
            .service(set_assigned_fiches)
            .service(update_user)
    );
}
