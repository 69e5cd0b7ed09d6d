use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;

use super::enums::FicheStatus;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct KeyPoints(pub Vec<String>);

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "memofiches")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub short_description: String,
    pub theme: String,
    pub system: String,
    pub status: FicheStatus,
    // Si vrai : accessible à tous, même sans compte
    pub is_free: bool,
    #[sea_orm(column_type = "JsonBinary")]
    pub key_points: KeyPoints,
    // Sections rédactionnelles (structure libre, rendue par le front)
    #[sea_orm(column_type = "JsonBinary")]
    pub sections: Json,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
