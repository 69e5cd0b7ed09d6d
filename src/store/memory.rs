//! Store en mémoire : HashMap par table derrière un `RwLock` tokio.
//!
//! Sert aux tests et au mode `STORE_BACKEND=memory` (démo locale sans
//! PostgreSQL). Chaque méthode prend le verrou une seule fois, ce qui donne
//! la même atomicité par ligne que le store SeaORM.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{
    FicheQuery, NewAttendee, NewGroup, NewMemoFiche, NewOrder, NewUser, NewWebinar, Store,
    StoreResult, UserPatch, WebinarQuery,
};
use crate::models::enums::{AttendeeStatus, FicheStatus, OrderStatus};
use crate::models::groups::{AssignedFiches, IdList};
use crate::models::webinar_attendees::TimeSlots;
use crate::models::{groups, memofiches, orders, users, webinar_attendees, webinars};

#[derive(Default)]
struct Tables {
    next_id: i32,
    users: HashMap<i32, users::Model>,
    groups: HashMap<i32, groups::Model>,
    memofiches: HashMap<i32, memofiches::Model>,
    webinars: HashMap<i32, webinars::Model>,
    attendees: HashMap<i32, webinar_attendees::Model>,
    orders: HashMap<i32, orders::Model>,
}

impl Tables {
    fn allocate_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by<T, K: Ord>(mut rows: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    rows.sort_by_key(|row| key(row));
    rows
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user(&self, id: i32) -> StoreResult<Option<users::Model>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<users::Model>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<users::Model> {
        let mut tables = self.tables.write().await;
        let id = tables.allocate_id();
        let model = users::Model {
            id,
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            has_active_subscription: false,
            subscription_end_date: None,
            trial_expires_at: None,
            pharmacist_id: user.pharmacist_id,
            group_id: None,
            master_class_credits: 0,
            pharmia_credits: 0,
            created_at: user.created_at,
        };
        tables.users.insert(id, model.clone());
        Ok(model)
    }

    async fn update_user(&self, id: i32, patch: UserPatch) -> StoreResult<Option<users::Model>> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(role) = patch.role {
            user.role = role;
        }
        if let Some(active) = patch.has_active_subscription {
            user.has_active_subscription = active;
        }
        if let Some(end_date) = patch.subscription_end_date {
            user.subscription_end_date = end_date;
        }
        if let Some(trial) = patch.trial_expires_at {
            user.trial_expires_at = trial;
        }
        if let Some(pharmacist_id) = patch.pharmacist_id {
            user.pharmacist_id = pharmacist_id;
        }
        if let Some(group_id) = patch.group_id {
            user.group_id = group_id;
        }

        Ok(Some(user.clone()))
    }

    async fn increment_credits(&self, user_id: i32, master_class: i32, pharmia: i32) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.get_mut(&user_id) {
            user.master_class_credits += master_class;
            user.pharmia_credits += pharmia;
        }
        Ok(())
    }

    async fn find_group(&self, id: i32) -> StoreResult<Option<groups::Model>> {
        Ok(self.tables.read().await.groups.get(&id).cloned())
    }

    async fn insert_group(&self, group: NewGroup) -> StoreResult<groups::Model> {
        let mut tables = self.tables.write().await;
        let id = tables.allocate_id();
        let model = groups::Model {
            id,
            name: group.name,
            pharmacist_ids: group.pharmacist_ids,
            preparator_ids: group.preparator_ids,
            assigned_fiches: AssignedFiches::default(),
            created_at: group.created_at,
        };
        tables.groups.insert(id, model.clone());
        Ok(model)
    }

    async fn set_group_members(
        &self,
        id: i32,
        pharmacist_ids: IdList,
        preparator_ids: IdList,
    ) -> StoreResult<Option<groups::Model>> {
        let mut tables = self.tables.write().await;
        Ok(tables.groups.get_mut(&id).map(|group| {
            group.pharmacist_ids = pharmacist_ids;
            group.preparator_ids = preparator_ids;
            group.clone()
        }))
    }

    async fn set_assigned_fiches(&self, id: i32, fiches: AssignedFiches) -> StoreResult<Option<groups::Model>> {
        let mut tables = self.tables.write().await;
        Ok(tables.groups.get_mut(&id).map(|group| {
            group.assigned_fiches = fiches;
            group.clone()
        }))
    }

    async fn find_memofiche(&self, id: i32) -> StoreResult<Option<memofiches::Model>> {
        Ok(self.tables.read().await.memofiches.get(&id).cloned())
    }

    async fn list_memofiches(&self, query: &FicheQuery) -> StoreResult<(Vec<memofiches::Model>, u64)> {
        let tables = self.tables.read().await;
        let search = query.search.as_ref().map(|s| s.to_lowercase());

        let matching: Vec<memofiches::Model> = tables
            .memofiches
            .values()
            .filter(|f| query.include_unpublished || f.status == FicheStatus::Published)
            .filter(|f| search.as_ref().is_none_or(|s| f.title.to_lowercase().contains(s)))
            .filter(|f| query.theme.as_ref().is_none_or(|t| &f.theme == t))
            .filter(|f| query.system.as_ref().is_none_or(|s| &f.system == s))
            .cloned()
            .collect();

        let total = matching.len() as u64;
        let mut matching = matching;
        // Plus récentes d'abord
        matching.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));

        let offset = (query.page.max(1) - 1).saturating_mul(query.limit);
        let page = matching
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(query.limit as usize)
            .collect();

        Ok((page, total))
    }

    async fn insert_memofiche(&self, fiche: NewMemoFiche) -> StoreResult<memofiches::Model> {
        let mut tables = self.tables.write().await;
        let id = tables.allocate_id();
        let model = memofiches::Model {
            id,
            title: fiche.title,
            short_description: fiche.short_description,
            theme: fiche.theme,
            system: fiche.system,
            status: fiche.status,
            is_free: fiche.is_free,
            key_points: fiche.key_points,
            sections: fiche.sections,
            created_at: fiche.created_at,
            updated_at: fiche.created_at,
        };
        tables.memofiches.insert(id, model.clone());
        Ok(model)
    }

    async fn find_webinar(&self, id: i32) -> StoreResult<Option<webinars::Model>> {
        Ok(self.tables.read().await.webinars.get(&id).cloned())
    }

    async fn find_webinars(&self, ids: &[i32]) -> StoreResult<Vec<webinars::Model>> {
        let tables = self.tables.read().await;
        let found = tables
            .webinars
            .values()
            .filter(|w| ids.contains(&w.id))
            .cloned()
            .collect();
        Ok(sorted_by(found, |w| w.id))
    }

    async fn find_webinars_by_theme(&self, theme: &str) -> StoreResult<Vec<webinars::Model>> {
        let tables = self.tables.read().await;
        let found = tables
            .webinars
            .values()
            .filter(|w| w.master_class_theme.as_deref() == Some(theme))
            .cloned()
            .collect();
        Ok(sorted_by(found, |w| (w.date, w.id)))
    }

    async fn list_webinars(&self, query: &WebinarQuery) -> StoreResult<Vec<webinars::Model>> {
        let tables = self.tables.read().await;
        let found = tables
            .webinars
            .values()
            .filter(|w| query.group.is_none_or(|g| w.group == g))
            .filter(|w| query.theme.as_ref().is_none_or(|t| w.master_class_theme.as_ref() == Some(t)))
            .cloned()
            .collect();
        Ok(sorted_by(found, |w| (w.date, w.id)))
    }

    async fn insert_webinar(&self, webinar: NewWebinar) -> StoreResult<webinars::Model> {
        let mut tables = self.tables.write().await;
        let id = tables.allocate_id();
        let model = webinars::Model {
            id,
            title: webinar.title,
            description: webinar.description,
            group: webinar.group,
            master_class_theme: webinar.master_class_theme,
            date: webinar.date,
            price: webinar.price,
            created_at: webinar.created_at,
        };
        tables.webinars.insert(id, model.clone());
        Ok(model)
    }

    async fn find_attendee(&self, webinar_id: i32, user_id: i32) -> StoreResult<Option<webinar_attendees::Model>> {
        let tables = self.tables.read().await;
        Ok(tables
            .attendees
            .values()
            .find(|a| a.webinar_id == webinar_id && a.user_id == user_id)
            .cloned())
    }

    async fn list_attendees(&self, webinar_id: i32) -> StoreResult<Vec<webinar_attendees::Model>> {
        let tables = self.tables.read().await;
        let found = tables
            .attendees
            .values()
            .filter(|a| a.webinar_id == webinar_id)
            .cloned()
            .collect();
        Ok(sorted_by(found, |a| a.id))
    }

    async fn insert_attendee(&self, attendee: NewAttendee) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        // Même garantie que ON CONFLICT (webinar_id, user_id) DO NOTHING
        if tables
            .attendees
            .values()
            .any(|a| a.webinar_id == attendee.webinar_id && a.user_id == attendee.user_id)
        {
            return Ok(false);
        }

        let id = tables.allocate_id();
        let model = webinar_attendees::Model {
            id,
            webinar_id: attendee.webinar_id,
            user_id: attendee.user_id,
            status: attendee.status,
            proof_url: attendee.proof_url,
            registered_at: attendee.registered_at,
            time_slots: attendee.time_slots,
        };
        tables.attendees.insert(id, model);
        Ok(true)
    }

    async fn update_attendee(
        &self,
        id: i32,
        status: AttendeeStatus,
        proof_url: Option<String>,
        time_slots: TimeSlots,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(attendee) = tables.attendees.get_mut(&id) {
            attendee.status = status;
            attendee.proof_url = proof_url;
            attendee.time_slots = time_slots;
        }
        Ok(())
    }

    async fn find_order(&self, id: i32) -> StoreResult<Option<orders::Model>> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self) -> StoreResult<Vec<orders::Model>> {
        let tables = self.tables.read().await;
        let mut found: Vec<_> = tables.orders.values().cloned().collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(found)
    }

    async fn list_orders_for_user(&self, user_id: i32) -> StoreResult<Vec<orders::Model>> {
        Ok(self
            .list_orders()
            .await?
            .into_iter()
            .filter(|o| o.user_id == user_id)
            .collect())
    }

    async fn insert_order(&self, order: NewOrder) -> StoreResult<orders::Model> {
        let mut tables = self.tables.write().await;
        let id = tables.allocate_id();
        let model = orders::Model {
            id,
            user_id: order.user_id,
            items: order.items,
            total_amount: order.total_amount,
            status: order.status,
            payment_proof_url: order.payment_proof_url,
            created_at: order.created_at,
            updated_at: order.created_at,
        };
        tables.orders.insert(id, model.clone());
        Ok(model)
    }

    async fn transition_order(
        &self,
        id: i32,
        from: &[OrderStatus],
        to: OrderStatus,
        payment_proof_url: Option<String>,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let Some(order) = tables.orders.get_mut(&id) else {
            return Ok(false);
        };
        if !from.contains(&order.status) {
            return Ok(false);
        }

        order.status = to;
        if payment_proof_url.is_some() {
            order.payment_proof_url = payment_proof_url;
        }
        order.updated_at = now;
        Ok(true)
    }
}
