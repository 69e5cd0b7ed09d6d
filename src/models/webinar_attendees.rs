// ============================================================================
// MODÈLE : WEBINAR ATTENDEES
// ============================================================================
//
// Description:
//   Une ligne par (webinaire, utilisateur). Le statut reflète celui de la
//   commande qui a déclenché l'inscription mais évolue séparément, séance par
//   séance, lors de l'expansion par thème.
//
// Points d'attention:
//   - Contrainte UNIQUE (webinar_id, user_id)
//   - proof_url vaut ADMIN_CONFIRMED pour une inscription créée directement
//     par la confirmation admin (aucun justificatif fourni)
//
// ============================================================================

use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;

use super::enums::AttendeeStatus;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct TimeSlots(pub Vec<String>);

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "webinar_attendees")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub webinar_id: i32,
    pub user_id: i32,
    pub status: AttendeeStatus,
    pub proof_url: Option<String>,
    pub registered_at: DateTimeUtc,
    #[sea_orm(column_type = "JsonBinary")]
    pub time_slots: TimeSlots,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::webinars::Entity",
        from = "Column::WebinarId",
        to = "super::webinars::Column::Id"
    )]
    Webinar,

    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
}

impl Related<super::webinars::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Webinar.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
