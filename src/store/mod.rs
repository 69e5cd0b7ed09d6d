// ============================================================================
// STORE - ACCÈS AUX DONNÉES
// ============================================================================
//
// Description:
//   Interface unique entre les services et le stockage. Le handle est
//   construit dans main puis injecté via AppState (pas de client global).
//
// Implémentations:
//   - postgres::SeaOrmStore : production (SeaORM / PostgreSQL)
//   - memory::MemoryStore : tests et STORE_BACKEND=memory
//
// Points d'attention:
//   - Chaque méthode est atomique sur UNE ligne/document ; aucune
//     transaction ne couvre plusieurs appels
//   - increment_credits doit être un incrément côté stockage (col = col + n)
//   - transition_order est un compare-and-set sur le statut : il renvoie
//     false si la commande n'était plus dans un des statuts `from`
//
// ============================================================================

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::StoreError;
use crate::models::enums::{AttendeeStatus, FicheStatus, OrderStatus, Role, WebinarGroup};
use crate::models::groups::{AssignedFiches, IdList};
use crate::models::memofiches::KeyPoints;
use crate::models::orders::OrderItems;
use crate::models::webinar_attendees::TimeSlots;
use crate::models::{groups, memofiches, orders, users, webinar_attendees, webinars};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub pharmacist_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Mise à jour partielle : seuls les champs `Some` sont écrits
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub role: Option<Role>,
    pub has_active_subscription: Option<bool>,
    pub subscription_end_date: Option<Option<DateTime<Utc>>>,
    pub trial_expires_at: Option<Option<DateTime<Utc>>>,
    pub pharmacist_id: Option<Option<i32>>,
    pub group_id: Option<Option<i32>>,
}

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub name: String,
    pub pharmacist_ids: IdList,
    pub preparator_ids: IdList,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMemoFiche {
    pub title: String,
    pub short_description: String,
    pub theme: String,
    pub system: String,
    pub status: FicheStatus,
    pub is_free: bool,
    pub key_points: KeyPoints,
    pub sections: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FicheQuery {
    pub include_unpublished: bool,
    pub search: Option<String>,
    pub theme: Option<String>,
    pub system: Option<String>,
    /// Numéro de page, à partir de 1
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Clone)]
pub struct NewWebinar {
    pub title: String,
    pub description: String,
    pub group: WebinarGroup,
    pub master_class_theme: Option<String>,
    pub date: DateTime<Utc>,
    pub price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct WebinarQuery {
    pub group: Option<WebinarGroup>,
    pub theme: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewAttendee {
    pub webinar_id: i32,
    pub user_id: i32,
    pub status: AttendeeStatus,
    pub proof_url: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub time_slots: TimeSlots,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i32,
    pub items: OrderItems,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_proof_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait Store: Send + Sync {
    // Utilisateurs
    async fn find_user(&self, id: i32) -> StoreResult<Option<users::Model>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<users::Model>>;
    async fn insert_user(&self, user: NewUser) -> StoreResult<users::Model>;
    async fn update_user(&self, id: i32, patch: UserPatch) -> StoreResult<Option<users::Model>>;
    async fn increment_credits(&self, user_id: i32, master_class: i32, pharmia: i32) -> StoreResult<()>;

    // Groupes
    async fn find_group(&self, id: i32) -> StoreResult<Option<groups::Model>>;
    async fn insert_group(&self, group: NewGroup) -> StoreResult<groups::Model>;
    async fn set_group_members(
        &self,
        id: i32,
        pharmacist_ids: IdList,
        preparator_ids: IdList,
    ) -> StoreResult<Option<groups::Model>>;
    async fn set_assigned_fiches(&self, id: i32, fiches: AssignedFiches) -> StoreResult<Option<groups::Model>>;

    // Fiches mémo
    async fn find_memofiche(&self, id: i32) -> StoreResult<Option<memofiches::Model>>;
    /// Renvoie la page demandée et le nombre total de fiches correspondantes
    async fn list_memofiches(&self, query: &FicheQuery) -> StoreResult<(Vec<memofiches::Model>, u64)>;
    async fn insert_memofiche(&self, fiche: NewMemoFiche) -> StoreResult<memofiches::Model>;

    // Webinaires
    async fn find_webinar(&self, id: i32) -> StoreResult<Option<webinars::Model>>;
    async fn find_webinars(&self, ids: &[i32]) -> StoreResult<Vec<webinars::Model>>;
    async fn find_webinars_by_theme(&self, theme: &str) -> StoreResult<Vec<webinars::Model>>;
    async fn list_webinars(&self, query: &WebinarQuery) -> StoreResult<Vec<webinars::Model>>;
    async fn insert_webinar(&self, webinar: NewWebinar) -> StoreResult<webinars::Model>;

    // Inscriptions
    async fn find_attendee(&self, webinar_id: i32, user_id: i32) -> StoreResult<Option<webinar_attendees::Model>>;
    async fn list_attendees(&self, webinar_id: i32) -> StoreResult<Vec<webinar_attendees::Model>>;
    /// Insère l'inscription si le couple (webinar_id, user_id) est libre.
    /// Renvoie false quand une inscription existe déjà.
    async fn insert_attendee(&self, attendee: NewAttendee) -> StoreResult<bool>;
    async fn update_attendee(
        &self,
        id: i32,
        status: AttendeeStatus,
        proof_url: Option<String>,
        time_slots: TimeSlots,
    ) -> StoreResult<()>;

    // Commandes
    async fn find_order(&self, id: i32) -> StoreResult<Option<orders::Model>>;
    async fn list_orders(&self) -> StoreResult<Vec<orders::Model>>;
    async fn list_orders_for_user(&self, user_id: i32) -> StoreResult<Vec<orders::Model>>;
    async fn insert_order(&self, order: NewOrder) -> StoreResult<orders::Model>;
    async fn transition_order(
        &self,
        id: i32,
        from: &[OrderStatus],
        to: OrderStatus,
        payment_proof_url: Option<String>,
        now: DateTime<Utc>,
    ) -> StoreResult<bool>;
}
