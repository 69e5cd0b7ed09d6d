// ============================================================================
// MODÈLE : ORDERS
// ============================================================================
//
// Description:
//   Agrégat de commande. Les lignes sont hétérogènes : inscription à un
//   webinaire (avec créneaux éventuels) ou achat d'un pack de crédits.
//
// Colonnes de la table orders:
//   - id (SERIAL, PRIMARY KEY)
//   - user_id (INTEGER, NOT NULL) - propriétaire, immuable
//   - items (JSONB) - lignes tarifées au checkout
//   - total_amount (NUMERIC(12,3)) - calculé au checkout, jamais recalculé
//   - status (TEXT) - PENDING_PAYMENT | PAYMENT_SUBMITTED | CONFIRMED
//   - payment_proof_url (TEXT, NULL)
//   - created_at / updated_at (TIMESTAMPTZ)
//
// ============================================================================

use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;

use super::enums::OrderStatus;

/// Référence d'article, telle qu'envoyée par le panier et conservée dans la commande
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemRef {
    #[serde(rename_all = "camelCase")]
    Webinar {
        webinar_id: i32,
        #[serde(default)]
        time_slots: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Pack { pack_id: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(flatten)]
    pub item: ItemRef,
    // Prix TTC si tax_applicable, prix final sinon
    pub price: Decimal,
    pub tax_applicable: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct OrderItems(pub Vec<OrderItem>);

impl OrderItems {
    pub fn webinar_items(&self) -> impl Iterator<Item = (i32, &[String])> {
        self.0.iter().filter_map(|line| match &line.item {
            ItemRef::Webinar { webinar_id, time_slots } => Some((*webinar_id, time_slots.as_slice())),
            ItemRef::Pack { .. } => None,
        })
    }

    pub fn pack_ids(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|line| match &line.item {
            ItemRef::Pack { pack_id } => Some(pack_id.as_str()),
            ItemRef::Webinar { .. } => None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    #[sea_orm(column_type = "JsonBinary")]
    pub items: OrderItems,
    #[sea_orm(column_type = "Decimal(Some((12, 3)))")]
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_proof_url: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_item_json_shape() {
        let items: Vec<ItemRef> = serde_json::from_str(
            r#"[
                {"type": "WEBINAR", "webinarId": 4, "timeSlots": ["MORNING"]},
                {"type": "WEBINAR", "webinarId": 5},
                {"type": "PACK", "packId": "MC_PACK_3"}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            items[0],
            ItemRef::Webinar { webinar_id: 4, time_slots: vec!["MORNING".to_string()] }
        );
        assert_eq!(items[1], ItemRef::Webinar { webinar_id: 5, time_slots: vec![] });
        assert_eq!(items[2], ItemRef::Pack { pack_id: "MC_PACK_3".to_string() });
    }

    #[test]
    fn test_order_items_split_by_kind() {
        let items = OrderItems(vec![
            OrderItem {
                item: ItemRef::Webinar { webinar_id: 1, time_slots: vec![] },
                price: Decimal::new(80_000, 3),
                tax_applicable: false,
            },
            OrderItem {
                item: ItemRef::Pack { pack_id: "PHARMIA_10".to_string() },
                price: Decimal::new(59_500, 3),
                tax_applicable: true,
            },
        ]);

        assert_eq!(items.webinar_items().map(|(id, _)| id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(items.pack_ids().collect::<Vec<_>>(), vec!["PHARMIA_10"]);
    }
}
