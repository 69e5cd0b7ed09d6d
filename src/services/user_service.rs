use chrono::{DateTime, Utc};

use crate::error::{ApiError, ApiResult, StoreError};
use crate::models::enums::Role;
use crate::models::users;
use crate::store::{NewUser, Store, UserPatch};
use crate::utils::password;

pub struct UserService;

/// Données d'inscription déjà validées par la route
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub pharmacist_id: Option<i32>,
}

/// Modification admin d'un compte ; `None` = champ inchangé
#[derive(Default)]
pub struct AdminUserUpdate {
    pub role: Option<Role>,
    pub subscription_end_date: Option<Option<DateTime<Utc>>>,
    pub trial_expires_at: Option<Option<DateTime<Utc>>>,
    pub pharmacist_id: Option<Option<i32>>,
    pub group_id: Option<Option<i32>>,
}

impl UserService {
    /// Remet has_active_subscription à false si la date de fin est passée
    /// (ou absente), et persiste la correction.
    pub async fn heal_subscription(
        store: &dyn Store,
        user: users::Model,
        now: DateTime<Utc>,
    ) -> Result<users::Model, StoreError> {
        let expired = user.subscription_end_date.is_none_or(|end| end <= now);
        if !(user.has_active_subscription && expired) {
            return Ok(user);
        }

        tracing::info!(user_id = user.id, "subscription expired, clearing active flag");

        let patch = UserPatch {
            has_active_subscription: Some(false),
            ..Default::default()
        };
        let healed = store.update_user(user.id, patch).await?;

        Ok(healed.unwrap_or(users::Model {
            has_active_subscription: false,
            ..user
        }))
    }

    pub async fn register(
        store: &dyn Store,
        registration: Registration,
        now: DateTime<Utc>,
    ) -> ApiResult<users::Model> {
        if !registration.role.is_self_service() {
            return Err(ApiError::Forbidden(
                "This role can only be assigned by an administrator".to_string(),
            ));
        }

        let email = registration.email.trim().to_lowercase();
        if store.find_user_by_email(&email).await?.is_some() {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }

        // Le lien pharmacien n'a de sens que pour un préparateur
        let pharmacist_id = match registration.role {
            Role::Preparateur => Self::checked_pharmacist(store, registration.pharmacist_id).await?,
            _ => None,
        };

        let password_hash = password::hash_password(&registration.password)?;

        let user = store
            .insert_user(NewUser {
                email,
                password_hash,
                first_name: registration.first_name,
                last_name: registration.last_name,
                role: registration.role,
                pharmacist_id,
                created_at: now,
            })
            .await?;

        tracing::info!(user_id = user.id, role = ?user.role, "user registered");
        Ok(user)
    }

    /// Vérifie les identifiants puis applique l'auto-correction d'abonnement
    pub async fn authenticate(
        store: &dyn Store,
        email: &str,
        password_attempt: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<users::Model> {
        let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

        let user = store
            .find_user_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or_else(invalid)?;

        let valid = password::verify_password(password_attempt, &user.password_hash).unwrap_or_else(|e| {
            tracing::warn!(user_id = user.id, error = %e, "unreadable password hash");
            false
        });
        if !valid {
            return Err(invalid());
        }

        Ok(Self::heal_subscription(store, user, now).await?)
    }

    pub async fn admin_update(
        store: &dyn Store,
        actor_role: Role,
        user_id: i32,
        update: AdminUserUpdate,
        now: DateTime<Utc>,
    ) -> ApiResult<users::Model> {
        if actor_role != Role::Admin {
            return Err(ApiError::Forbidden("Admin role required".to_string()));
        }

        let pharmacist_id = match update.pharmacist_id {
            Some(Some(id)) => Some(Self::checked_pharmacist(store, Some(id)).await?),
            other => other,
        };

        if let Some(Some(group_id)) = update.group_id {
            if store.find_group(group_id).await?.is_none() {
                return Err(ApiError::BadRequest(format!("No group with id {}", group_id)));
            }
        }

        // Un abonnement accordé avec une date future active le drapeau
        let has_active_subscription = update
            .subscription_end_date
            .map(|end| end.is_some_and(|end| end > now));

        let patch = UserPatch {
            role: update.role,
            has_active_subscription,
            subscription_end_date: update.subscription_end_date,
            trial_expires_at: update.trial_expires_at,
            pharmacist_id,
            group_id: update.group_id,
        };

        store
            .update_user(user_id, patch)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    async fn checked_pharmacist(store: &dyn Store, pharmacist_id: Option<i32>) -> ApiResult<Option<i32>> {
        let Some(id) = pharmacist_id else {
            return Ok(None);
        };

        match store.find_user(id).await? {
            Some(pharmacist) if pharmacist.role == Role::Pharmacien => Ok(Some(id)),
            _ => Err(ApiError::BadRequest(format!("No pharmacist with id {}", id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use chrono::Duration;

    fn registration(email: &str, role: Role) -> Registration {
        Registration {
            email: email.to_string(),
            password: "s3cret-pass".to_string(),
            first_name: "Nour".to_string(),
            last_name: "Hammami".to_string(),
            role,
            pharmacist_id: None,
        }
    }

    #[tokio::test]
    async fn test_login_heals_expired_subscription() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let user = UserService::register(&store, registration("Owner@Pharmia.tn", Role::Pharmacien), now)
            .await
            .unwrap();
        store
            .update_user(
                user.id,
                UserPatch {
                    has_active_subscription: Some(true),
                    subscription_end_date: Some(Some(now - Duration::days(2))),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let logged = UserService::authenticate(&store, "owner@pharmia.tn", "s3cret-pass", now)
            .await
            .unwrap();
        assert!(!logged.has_active_subscription);

        let stored = store.find_user(user.id).await.unwrap().unwrap();
        assert!(!stored.has_active_subscription);
    }

    #[tokio::test]
    async fn test_login_keeps_valid_subscription() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let user = UserService::register(&store, registration("ok@pharmia.tn", Role::Pharmacien), now)
            .await
            .unwrap();
        let user = store
            .update_user(
                user.id,
                UserPatch {
                    has_active_subscription: Some(true),
                    subscription_end_date: Some(Some(now + Duration::days(2))),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        let healed = UserService::heal_subscription(&store, user, now).await.unwrap();
        assert!(healed.has_active_subscription);
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let store = MemoryStore::new();
        UserService::register(&store, registration("x@pharmia.tn", Role::Apprenant), Utc::now())
            .await
            .unwrap();

        let result = UserService::authenticate(&store, "x@pharmia.tn", "nope", Utc::now()).await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_privileged_roles_and_duplicates() {
        let store = MemoryStore::new();

        let admin = UserService::register(&store, registration("a@pharmia.tn", Role::Admin), Utc::now()).await;
        assert!(matches!(admin, Err(ApiError::Forbidden(_))));

        UserService::register(&store, registration("d@pharmia.tn", Role::Apprenant), Utc::now())
            .await
            .unwrap();
        let duplicate =
            UserService::register(&store, registration("D@pharmia.tn", Role::Apprenant), Utc::now()).await;
        assert!(matches!(duplicate, Err(ApiError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_preparateur_must_link_an_existing_pharmacist() {
        let store = MemoryStore::new();
        let owner = UserService::register(&store, registration("p@pharmia.tn", Role::Pharmacien), Utc::now())
            .await
            .unwrap();

        let mut linked = registration("prep@pharmia.tn", Role::Preparateur);
        linked.pharmacist_id = Some(owner.id);
        let prep = UserService::register(&store, linked, Utc::now()).await.unwrap();
        assert_eq!(prep.pharmacist_id, Some(owner.id));

        let mut dangling = registration("prep2@pharmia.tn", Role::Preparateur);
        dangling.pharmacist_id = Some(9999);
        let result = UserService::register(&store, dangling, Utc::now()).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_admin_grants_subscription() {
        let store = MemoryStore::new();
        let user = UserService::register(&store, registration("s@pharmia.tn", Role::Pharmacien), Utc::now())
            .await
            .unwrap();

        let update = AdminUserUpdate {
            subscription_end_date: Some(Some(Utc::now() + Duration::days(365))),
            ..Default::default()
        };
        let updated = UserService::admin_update(&store, Role::Admin, user.id, update, Utc::now())
            .await
            .unwrap();
        assert!(updated.has_active_subscription);

        let denied =
            UserService::admin_update(&store, Role::Formateur, user.id, AdminUserUpdate::default(), Utc::now())
                .await;
        assert!(matches!(denied, Err(ApiError::Forbidden(_))));
    }
}
