use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::error::{ApiError, ApiResult};
use crate::models::enums::Role;
use crate::models::groups::{self, AssignedFiche, AssignedFiches, IdList};
use crate::store::{NewGroup, Store, UserPatch};

pub struct GroupService;

impl GroupService {
    pub async fn create(
        store: &dyn Store,
        actor_role: Role,
        name: String,
        pharmacist_ids: Vec<i32>,
        preparator_ids: Vec<i32>,
        now: DateTime<Utc>,
    ) -> ApiResult<groups::Model> {
        Self::require_admin(actor_role)?;

        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::BadRequest("Group name is required".to_string()));
        }

        let pharmacist_ids = Self::checked_members(store, pharmacist_ids, |role| role == Role::Pharmacien).await?;
        let preparator_ids = Self::checked_members(store, preparator_ids, |role| role.is_self_service()).await?;

        let group = store
            .insert_group(NewGroup {
                name,
                pharmacist_ids: IdList::default(),
                preparator_ids: IdList::default(),
                created_at: now,
            })
            .await?;

        tracing::info!(group_id = group.id, "group created");

        Self::replace_members(store, group, pharmacist_ids, preparator_ids).await
    }

    pub async fn get(store: &dyn Store, actor_role: Role, group_id: i32) -> ApiResult<groups::Model> {
        Self::require_admin(actor_role)?;
        Self::find(store, group_id).await
    }

    /// Remplace les listes de membres et resynchronise users.group_id :
    /// les nouveaux membres pointent vers le groupe, les anciens sont détachés.
    pub async fn set_members(
        store: &dyn Store,
        actor_role: Role,
        group_id: i32,
        pharmacist_ids: Vec<i32>,
        preparator_ids: Vec<i32>,
    ) -> ApiResult<groups::Model> {
        Self::require_admin(actor_role)?;

        let group = Self::find(store, group_id).await?;
        let pharmacist_ids = Self::checked_members(store, pharmacist_ids, |role| role == Role::Pharmacien).await?;
        let preparator_ids = Self::checked_members(store, preparator_ids, |role| role.is_self_service()).await?;

        Self::replace_members(store, group, pharmacist_ids, preparator_ids).await
    }

    /// Remplace la liste des fiches assignées. La date d'assignation d'une
    /// fiche déjà présente est conservée.
    pub async fn set_assigned_fiches(
        store: &dyn Store,
        actor_role: Role,
        group_id: i32,
        fiche_ids: Vec<i32>,
        now: DateTime<Utc>,
    ) -> ApiResult<groups::Model> {
        Self::require_admin(actor_role)?;

        let group = Self::find(store, group_id).await?;

        let mut seen = HashSet::new();
        let mut assigned = Vec::new();
        for fiche_id in fiche_ids {
            if !seen.insert(fiche_id) {
                continue;
            }
            if store.find_memofiche(fiche_id).await?.is_none() {
                return Err(ApiError::BadRequest(format!("No memofiche with id {}", fiche_id)));
            }

            let assigned_at = group
                .assigned_fiches
                .0
                .iter()
                .find(|existing| existing.fiche_id == fiche_id)
                .map_or(now, |existing| existing.assigned_at);
            assigned.push(AssignedFiche { fiche_id, assigned_at });
        }

        let updated = store
            .set_assigned_fiches(group.id, AssignedFiches(assigned))
            .await?
            .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

        tracing::info!(group_id = updated.id, fiches = updated.assigned_fiches.0.len(), "assigned fiches replaced");
        Ok(updated)
    }

    fn require_admin(actor_role: Role) -> ApiResult<()> {
        if actor_role != Role::Admin {
            return Err(ApiError::Forbidden("Admin role required".to_string()));
        }
        Ok(())
    }

    async fn find(store: &dyn Store, group_id: i32) -> ApiResult<groups::Model> {
        store
            .find_group(group_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))
    }

    /// Dédoublonne en gardant l'ordre (le premier pharmacien est le référent)
    async fn checked_members(
        store: &dyn Store,
        ids: Vec<i32>,
        accepts: impl Fn(Role) -> bool,
    ) -> ApiResult<Vec<i32>> {
        let mut seen = HashSet::new();
        let mut members = Vec::with_capacity(ids.len());

        for id in ids {
            if !seen.insert(id) {
                continue;
            }
            match store.find_user(id).await? {
                Some(user) if accepts(user.role) => members.push(id),
                Some(user) => {
                    return Err(ApiError::BadRequest(format!(
                        "User {} has role {:?} and cannot be added here",
                        id, user.role
                    )));
                }
                None => return Err(ApiError::BadRequest(format!("No user with id {}", id))),
            }
        }

        Ok(members)
    }

    async fn replace_members(
        store: &dyn Store,
        group: groups::Model,
        pharmacist_ids: Vec<i32>,
        preparator_ids: Vec<i32>,
    ) -> ApiResult<groups::Model> {
        let previous: HashSet<i32> = group
            .pharmacist_ids
            .0
            .iter()
            .chain(group.preparator_ids.0.iter())
            .copied()
            .collect();
        let current: HashSet<i32> = pharmacist_ids.iter().chain(preparator_ids.iter()).copied().collect();

        let updated = store
            .set_group_members(group.id, IdList(pharmacist_ids), IdList(preparator_ids))
            .await?
            .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

        for user_id in &current {
            let patch = UserPatch {
                group_id: Some(Some(group.id)),
                ..Default::default()
            };
            store.update_user(*user_id, patch).await?;
        }

        // Un ancien membre n'est détaché que s'il pointe encore vers ce groupe
        for user_id in previous.difference(&current) {
            let still_here = store
                .find_user(*user_id)
                .await?
                .is_some_and(|user| user.group_id == Some(group.id));
            if still_here {
                let patch = UserPatch {
                    group_id: Some(None),
                    ..Default::default()
                };
                store.update_user(*user_id, patch).await?;
            }
        }

        tracing::info!(group_id = group.id, members = current.len(), "group members replaced");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::FicheStatus;
    use crate::models::memofiches::KeyPoints;
    use crate::store::memory::MemoryStore;
    use crate::store::{NewMemoFiche, NewUser};
    use chrono::Duration;

    async fn seed_user(store: &MemoryStore, email: &str, role: Role) -> i32 {
        store
            .insert_user(NewUser {
                email: email.to_string(),
                password_hash: String::new(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                role,
                pharmacist_id: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap()
            .id
    }

    async fn seed_fiche(store: &MemoryStore) -> i32 {
        store
            .insert_memofiche(NewMemoFiche {
                title: "Rhume".to_string(),
                short_description: String::new(),
                theme: "ORL".to_string(),
                system: "Respiratoire".to_string(),
                status: FicheStatus::Published,
                is_free: false,
                key_points: KeyPoints::default(),
                sections: serde_json::json!([]),
                created_at: Utc::now(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_create_group_links_members() {
        let store = MemoryStore::new();
        let owner = seed_user(&store, "owner@pharmia.tn", Role::Pharmacien).await;
        let learner = seed_user(&store, "learner@pharmia.tn", Role::Apprenant).await;

        let group = GroupService::create(
            &store,
            Role::Admin,
            "Officine du Lac".to_string(),
            vec![owner, owner],
            vec![learner],
            Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(group.pharmacist_ids, IdList(vec![owner]));
        assert_eq!(group.first_pharmacist(), Some(owner));
        let learner = store.find_user(learner).await.unwrap().unwrap();
        assert_eq!(learner.group_id, Some(group.id));
    }

    #[tokio::test]
    async fn test_create_rejects_wrong_roles_and_non_admins() {
        let store = MemoryStore::new();
        let learner = seed_user(&store, "l@pharmia.tn", Role::Apprenant).await;

        let wrong_role =
            GroupService::create(&store, Role::Admin, "G".to_string(), vec![learner], vec![], Utc::now()).await;
        assert!(matches!(wrong_role, Err(ApiError::BadRequest(_))));

        let denied =
            GroupService::create(&store, Role::Formateur, "G".to_string(), vec![], vec![], Utc::now()).await;
        assert!(matches!(denied, Err(ApiError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_set_members_detaches_removed_users() {
        let store = MemoryStore::new();
        let owner = seed_user(&store, "o@pharmia.tn", Role::Pharmacien).await;
        let first = seed_user(&store, "a@pharmia.tn", Role::Preparateur).await;
        let second = seed_user(&store, "b@pharmia.tn", Role::Apprenant).await;

        let group =
            GroupService::create(&store, Role::Admin, "G".to_string(), vec![owner], vec![first], Utc::now())
                .await
                .unwrap();

        GroupService::set_members(&store, Role::Admin, group.id, vec![owner], vec![second])
            .await
            .unwrap();

        assert_eq!(store.find_user(first).await.unwrap().unwrap().group_id, None);
        assert_eq!(store.find_user(second).await.unwrap().unwrap().group_id, Some(group.id));
        assert_eq!(store.find_user(owner).await.unwrap().unwrap().group_id, Some(group.id));
    }

    #[tokio::test]
    async fn test_assigned_fiches_keep_original_date() {
        let store = MemoryStore::new();
        let fiche = seed_fiche(&store).await;
        let other = seed_fiche(&store).await;
        let group = GroupService::create(&store, Role::Admin, "G".to_string(), vec![], vec![], Utc::now())
            .await
            .unwrap();

        let first_day = Utc::now() - Duration::days(30);
        GroupService::set_assigned_fiches(&store, Role::Admin, group.id, vec![fiche], first_day)
            .await
            .unwrap();
        let updated = GroupService::set_assigned_fiches(&store, Role::Admin, group.id, vec![fiche, other], Utc::now())
            .await
            .unwrap();

        assert!(updated.assigned_fiches.contains(fiche));
        assert!(updated.assigned_fiches.contains(other));
        assert_eq!(updated.assigned_fiches.0[0].assigned_at, first_day);
    }

    #[tokio::test]
    async fn test_assigning_unknown_fiche_is_rejected() {
        let store = MemoryStore::new();
        let group = GroupService::create(&store, Role::Admin, "G".to_string(), vec![], vec![], Utc::now())
            .await
            .unwrap();

        let result = GroupService::set_assigned_fiches(&store, Role::Admin, group.id, vec![777], Utc::now()).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));

        let missing = GroupService::get(&store, Role::Admin, 9999).await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }
}
