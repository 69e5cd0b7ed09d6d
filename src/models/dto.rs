// Structures de réponse de l'API (camelCase côté client)
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::enums::{AttendeeStatus, FicheStatus, Role, WebinarGroup};
use super::{memofiches, users, webinar_attendees, webinars};
use crate::services::catalog::{self, Pack};

// ============================================================================
// UTILISATEURS
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub has_active_subscription: bool,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub trial_expires_at: Option<DateTime<Utc>>,
    pub pharmacist_id: Option<i32>,
    pub group_id: Option<i32>,
    pub master_class_credits: i32,
    pub pharmia_credits: i32,
    pub created_at: DateTime<Utc>,
}

impl From<users::Model> for UserProfile {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            has_active_subscription: user.has_active_subscription,
            subscription_end_date: user.subscription_end_date,
            trial_expires_at: user.trial_expires_at,
            pharmacist_id: user.pharmacist_id,
            group_id: user.group_id,
            master_class_credits: user.master_class_credits,
            pharmia_credits: user.pharmia_credits,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

// ============================================================================
// FICHES MÉMO
// ============================================================================

/// Entrée de liste : jamais de sections, keyPoints absents si verrouillée
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoFicheSummary {
    pub id: i32,
    pub title: String,
    pub short_description: String,
    pub theme: String,
    pub system: String,
    pub status: FicheStatus,
    pub is_free: bool,
    pub is_locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_points: Option<Vec<String>>,
    pub updated_at: DateTime<Utc>,
}

impl MemoFicheSummary {
    pub fn new(fiche: memofiches::Model, is_locked: bool) -> Self {
        Self {
            id: fiche.id,
            title: fiche.title,
            short_description: fiche.short_description,
            theme: fiche.theme,
            system: fiche.system,
            status: fiche.status,
            is_free: fiche.is_free,
            is_locked,
            key_points: (!is_locked).then_some(fiche.key_points.0),
            updated_at: fiche.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoFicheDetail {
    pub id: i32,
    pub title: String,
    pub short_description: String,
    pub theme: String,
    pub system: String,
    pub status: FicheStatus,
    pub is_free: bool,
    pub is_locked: bool,
    pub key_points: Vec<String>,
    pub sections: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<memofiches::Model> for MemoFicheDetail {
    fn from(fiche: memofiches::Model) -> Self {
        Self {
            id: fiche.id,
            title: fiche.title,
            short_description: fiche.short_description,
            theme: fiche.theme,
            system: fiche.system,
            status: fiche.status,
            is_free: fiche.is_free,
            is_locked: false,
            key_points: fiche.key_points.0,
            sections: fiche.sections,
            created_at: fiche.created_at,
            updated_at: fiche.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        Self {
            items,
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit.max(1)),
        }
    }
}

// ============================================================================
// WEBINAIRES
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebinarView {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub group: WebinarGroup,
    pub master_class_theme: Option<String>,
    pub date: DateTime<Utc>,
    pub price: Option<Decimal>,
    /// Prix effectivement facturé (TTC pour les groupes taxables)
    pub checkout_price: Decimal,
}

impl From<webinars::Model> for WebinarView {
    fn from(webinar: webinars::Model) -> Self {
        let checkout_price = catalog::price_webinar(&webinar).price;
        Self {
            id: webinar.id,
            title: webinar.title,
            description: webinar.description,
            group: webinar.group,
            master_class_theme: webinar.master_class_theme,
            date: webinar.date,
            price: webinar.price,
            checkout_price,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeView {
    pub user_id: i32,
    pub status: AttendeeStatus,
    pub proof_url: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub time_slots: Vec<String>,
}

impl From<webinar_attendees::Model> for AttendeeView {
    fn from(attendee: webinar_attendees::Model) -> Self {
        Self {
            user_id: attendee.user_id,
            status: attendee.status,
            proof_url: attendee.proof_url,
            registered_at: attendee.registered_at,
            time_slots: attendee.time_slots.0,
        }
    }
}

// ============================================================================
// CATALOGUE
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackView {
    pub id: &'static str,
    pub name: &'static str,
    pub credits: i32,
    pub price_ht: Decimal,
    pub price_ttc: Decimal,
}

impl From<&'static Pack> for PackView {
    fn from(pack: &'static Pack) -> Self {
        Self {
            id: pack.id,
            name: pack.name,
            credits: pack.credits,
            price_ht: pack.price_ht(),
            price_ttc: catalog::price_pack(pack).price,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackCatalogView {
    pub master_class: Vec<PackView>,
    pub pharmia: Vec<PackView>,
    pub vat: Decimal,
    pub stamp_duty: Decimal,
}

impl PackCatalogView {
    pub fn current() -> Self {
        Self {
            master_class: catalog::MASTER_CLASS_PACKS.iter().map(PackView::from).collect(),
            pharmia: catalog::PHARMIA_CREDIT_PACKS.iter().map(PackView::from).collect(),
            vat: catalog::TAX_RATES.vat(),
            stamp_duty: catalog::TAX_RATES.stamp_duty(),
        }
    }
}
