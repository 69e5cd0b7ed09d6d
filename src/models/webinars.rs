use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

use super::enums::WebinarGroup;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "webinars")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub description: String,
    pub group: WebinarGroup,
    // Clé de regroupement des séances d'une même Master Class
    pub master_class_theme: Option<String>,
    pub date: DateTimeUtc,
    // HT pour MASTER_CLASS / PHARMIA, prix final pour les autres groupes
    #[sea_orm(column_type = "Decimal(Some((12, 3)))", nullable)]
    pub price: Option<Decimal>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::webinar_attendees::Entity")]
    Attendees,
}

impl Related<super::webinar_attendees::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendees.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
