// ============================================================================
// SERVICES - LOGIQUE MÉTIER
// ============================================================================
//
// Liste des modules:
//   - catalog : packs de crédits, taxes et tarification des lignes
//   - entitlement_service : accès aux fiches mémo (verrouillage)
//   - user_service : inscription, connexion, auto-correction d'abonnement
//   - group_service : cohortes et fiches assignées
//   - order_service : commandes, crédits, inscriptions aux webinaires
//
// Points d'attention:
//   - Les services ne connaissent que le trait Store
//   - L'heure courante est toujours passée en paramètre
//
// ============================================================================

pub mod catalog;
pub mod entitlement_service;
pub mod group_service;
pub mod order_service;
pub mod user_service;

use crate::models::enums::Role;

/// Utilisateur authentifié à l'origine d'une opération
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i32,
    pub role: Role,
}
