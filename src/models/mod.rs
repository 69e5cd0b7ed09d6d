// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Point d'entrée pour tous les modèles de données.
//   Chaque entité correspond à une table PostgreSQL avec SeaORM.
//
// Liste des modules:
//   - enums : rôles, statuts de fiche / commande / inscription
//   - link : résolution des références faibles (pharmacien, groupe)
//   - users : comptes (abonnement, essai, crédits)
//   - groups : cohortes et fiches assignées
//   - memofiches : fiches mémo (contenu payant ou gratuit)
//   - webinars : séances, regroupées par thème de Master Class
//   - webinar_attendees : inscriptions aux séances
//   - orders : commandes et lignes tarifées
//   - health : Health check API
//   - dto : Data Transfer Objects pour les réponses API
//
// Points d'attention:
//   - Les listes imbriquées sont stockées en JSONB (FromJsonQueryResult)
//   - Les montants sont en dinars, 3 décimales (NUMERIC(12,3))
//
// ============================================================================

pub mod enums;
pub mod link;
pub mod users;
pub mod groups;
pub mod memofiches;
pub mod webinars;
pub mod webinar_attendees;
pub mod orders;
pub mod health;
pub mod dto;
