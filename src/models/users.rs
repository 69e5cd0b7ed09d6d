use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

use super::enums::Role;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Format: pbkdf2:sha256:iterations$salt$hash
    pub first_name: String,
    pub last_name: String,
    pub role: Role,

    // Cache dénormalisé : n'est fiable qu'avec subscription_end_date > maintenant
    pub has_active_subscription: bool,
    pub subscription_end_date: Option<DateTimeUtc>,
    pub trial_expires_at: Option<DateTimeUtc>,

    // Références faibles (pas de cascade) : préparateur -> pharmacien titulaire
    pub pharmacist_id: Option<i32>,
    pub group_id: Option<i32>,

    // Soldes incrémentés uniquement par la confirmation de commande
    pub master_class_credits: i32,
    pub pharmia_credits: i32,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::orders::Entity")]
    Orders,

    #[sea_orm(has_many = "super::webinar_attendees::Entity")]
    WebinarAttendees,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::webinar_attendees::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WebinarAttendees.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
