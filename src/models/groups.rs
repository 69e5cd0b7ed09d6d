// ============================================================================
// MODÈLE : GROUPS
// ============================================================================
//
// Description:
//   Cohorte liant un ou plusieurs pharmaciens, des préparateurs et une liste
//   de fiches assignées qui court-circuite la vérification d'abonnement.
//
// Colonnes de la table groups:
//   - id (SERIAL, PRIMARY KEY)
//   - name (VARCHAR, NOT NULL)
//   - pharmacist_ids (JSONB) - ordonnée, le premier est le pharmacien référent
//   - preparator_ids (JSONB)
//   - assigned_fiches (JSONB) - [{ "ficheId": 12, "assignedAt": "..." }]
//   - created_at (TIMESTAMPTZ)
//
// Points d'attention:
//   - assigned_fiches évolue indépendamment des listes de membres
//   - Les ids de membres ne sont pas des clés étrangères (références faibles)
//
// ============================================================================

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct IdList(pub Vec<i32>);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedFiche {
    pub fiche_id: i32,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct AssignedFiches(pub Vec<AssignedFiche>);

impl AssignedFiches {
    pub fn contains(&self, fiche_id: i32) -> bool {
        self.0.iter().any(|assigned| assigned.fiche_id == fiche_id)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "groups")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub pharmacist_ids: IdList,
    #[sea_orm(column_type = "JsonBinary")]
    pub preparator_ids: IdList,
    #[sea_orm(column_type = "JsonBinary")]
    pub assigned_fiches: AssignedFiches,
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Pharmacien référent du groupe (premier de la liste)
    pub fn first_pharmacist(&self) -> Option<i32> {
        self.pharmacist_ids.0.first().copied()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
