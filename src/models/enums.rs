// ============================================================================
// ÉNUMÉRATIONS PARTAGÉES
// ============================================================================
//
// Description:
//   Rôles, statuts de fiche, familles de webinaires et les deux machines à
//   états liées : statut de commande et statut d'inscription (attendee).
//
// Points d'attention:
//   - Stockées en TEXT (valeurs SCREAMING_SNAKE_CASE identiques au JSON)
//   - Le lien commande -> inscription passe par OrderStatus::attendee_status
//   - Une inscription CONFIRMED ne peut plus changer (pas de rétrogradation)
//
// ============================================================================

use sea_orm::entity::prelude::*;
use sea_orm::Iterable;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[sea_orm(string_value = "ADMIN")]
    Admin,
    #[sea_orm(string_value = "FORMATEUR")]
    Formateur,
    #[sea_orm(string_value = "PHARMACIEN")]
    Pharmacien,
    #[sea_orm(string_value = "PREPARATEUR")]
    Preparateur,
    #[sea_orm(string_value = "APPRENANT")]
    Apprenant,
    #[sea_orm(string_value = "ADMIN_WEBINAR")]
    AdminWebinar,
}

impl Role {
    /// Admin et Formateur voient tout le back-office
    pub fn is_back_office(self) -> bool {
        matches!(self, Role::Admin | Role::Formateur)
    }

    /// Rôles autorisés à valider les paiements de commandes
    pub fn can_manage_orders(self) -> bool {
        matches!(self, Role::Admin | Role::AdminWebinar)
    }

    /// Rôles qu'un visiteur peut choisir à l'inscription
    pub fn is_self_service(self) -> bool {
        matches!(self, Role::Pharmacien | Role::Preparateur | Role::Apprenant)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FicheStatus {
    #[sea_orm(string_value = "DRAFT")]
    Draft,
    #[sea_orm(string_value = "PUBLISHED")]
    Published,
    #[sea_orm(string_value = "ARCHIVED")]
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebinarGroup {
    #[sea_orm(string_value = "MASTER_CLASS")]
    MasterClass,
    #[sea_orm(string_value = "PHARMIA")]
    Pharmia,
    #[sea_orm(string_value = "CROP_TUNIS")]
    CropTunis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[sea_orm(string_value = "PENDING_PAYMENT")]
    PendingPayment,
    #[sea_orm(string_value = "PAYMENT_SUBMITTED")]
    PaymentSubmitted,
    #[sea_orm(string_value = "CONFIRMED")]
    Confirmed,
}

impl OrderStatus {
    /// Transitions autorisées :
    /// PENDING_PAYMENT -> PAYMENT_SUBMITTED -> CONFIRMED,
    /// PENDING_PAYMENT -> CONFIRMED (raccourci admin / commande gratuite)
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::PendingPayment, OrderStatus::PaymentSubmitted)
                | (OrderStatus::PaymentSubmitted, OrderStatus::Confirmed)
                | (OrderStatus::PendingPayment, OrderStatus::Confirmed)
        )
    }

    /// Statuts depuis lesquels `next` est atteignable
    pub fn sources_of(next: OrderStatus) -> Vec<OrderStatus> {
        OrderStatus::iter()
            .filter(|status| status.can_transition_to(next))
            .collect()
    }

    /// Table de correspondance commande -> inscription aux webinaires.
    /// Une commande en attente de paiement n'inscrit personne.
    pub fn attendee_status(self) -> Option<AttendeeStatus> {
        match self {
            OrderStatus::PendingPayment => None,
            OrderStatus::PaymentSubmitted => Some(AttendeeStatus::PaymentSubmitted),
            OrderStatus::Confirmed => Some(AttendeeStatus::Confirmed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendeeStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "PAYMENT_SUBMITTED")]
    PaymentSubmitted,
    #[sea_orm(string_value = "CONFIRMED")]
    Confirmed,
}

impl AttendeeStatus {
    fn rank(self) -> u8 {
        match self {
            AttendeeStatus::Pending => 0,
            AttendeeStatus::PaymentSubmitted => 1,
            AttendeeStatus::Confirmed => 2,
        }
    }

    /// Une inscription n'avance que vers un rang égal ou supérieur,
    /// et ne quitte jamais CONFIRMED.
    pub fn can_move_to(self, target: AttendeeStatus) -> bool {
        self != AttendeeStatus::Confirmed && target.rank() >= self.rank()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_transitions() {
        use OrderStatus::*;

        assert!(PendingPayment.can_transition_to(PaymentSubmitted));
        assert!(PaymentSubmitted.can_transition_to(Confirmed));
        assert!(PendingPayment.can_transition_to(Confirmed));

        assert!(!Confirmed.can_transition_to(PaymentSubmitted));
        assert!(!Confirmed.can_transition_to(Confirmed));
        assert!(!PaymentSubmitted.can_transition_to(PendingPayment));
        assert!(!PaymentSubmitted.can_transition_to(PaymentSubmitted));
    }

    #[test]
    fn test_sources_of_confirmed() {
        let sources = OrderStatus::sources_of(OrderStatus::Confirmed);
        assert_eq!(sources, vec![OrderStatus::PendingPayment, OrderStatus::PaymentSubmitted]);
        assert_eq!(
            OrderStatus::sources_of(OrderStatus::PaymentSubmitted),
            vec![OrderStatus::PendingPayment]
        );
    }

    #[test]
    fn test_confirmed_attendee_is_never_downgraded() {
        assert!(!AttendeeStatus::Confirmed.can_move_to(AttendeeStatus::PaymentSubmitted));
        assert!(!AttendeeStatus::Confirmed.can_move_to(AttendeeStatus::Confirmed));
        assert!(AttendeeStatus::PaymentSubmitted.can_move_to(AttendeeStatus::Confirmed));
        assert!(AttendeeStatus::PaymentSubmitted.can_move_to(AttendeeStatus::PaymentSubmitted));
        assert!(!AttendeeStatus::PaymentSubmitted.can_move_to(AttendeeStatus::Pending));
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::AdminWebinar).unwrap();
        assert_eq!(json, "\"ADMIN_WEBINAR\"");
        let role: Role = serde_json::from_str("\"PREPARATEUR\"").unwrap();
        assert_eq!(role, Role::Preparateur);
    }
}
