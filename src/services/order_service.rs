// ============================================================================
// COMMANDES ET INSCRIPTIONS
// ============================================================================
//
// Description:
//   Machine à états des commandes et ses effets :
//     PENDING_PAYMENT --[justificatif]--> PAYMENT_SUBMITTED --[admin]--> CONFIRMED
//     PENDING_PAYMENT --[checkout admin OU total = 0]--> CONFIRMED
//
// Effets:
//   - justificatif : inscriptions PAYMENT_SUBMITTED sur chaque webinaire
//   - confirmation : crédits des packs cumulés + inscriptions CONFIRMED
//   - un webinaire avec master_class_theme inscrit à TOUTES les séances du thème
//
// Points d'attention:
//   - Toute la validation a lieu avant la première écriture
//   - Le changement de statut est un compare-and-set : une double
//     confirmation (même concurrente) échoue en 409 et les crédits ne sont
//     accordés qu'une fois
//   - Aucune transaction ne couvre l'expansion multi-webinaires ; chaque
//     écriture d'inscription est idempotente et reconcile_order permet de
//     rejouer l'expansion d'une commande
//
// ============================================================================

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::error::{ApiError, ApiResult, StoreError};
use crate::models::enums::{AttendeeStatus, OrderStatus, Role};
use crate::models::orders::{ItemRef, OrderItem, OrderItems};
use crate::models::webinar_attendees::TimeSlots;
use crate::models::{orders, webinars};
use crate::services::catalog::{self, PackCatalog};
use crate::services::Actor;
use crate::store::{NewAttendee, NewOrder, Store};

/// Justificatif enregistré sur une inscription créée par la confirmation admin
pub const ADMIN_CONFIRMED_PROOF: &str = "ADMIN_CONFIRMED";

pub struct OrderService;

/// Bilan d'une expansion d'inscriptions
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FanOutReport {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

enum AttendeeChange {
    Inserted,
    Updated,
    Unchanged,
}

impl OrderService {
    pub async fn checkout(
        store: &dyn Store,
        actor: &Actor,
        cart: Vec<ItemRef>,
        now: DateTime<Utc>,
    ) -> ApiResult<orders::Model> {
        if cart.is_empty() {
            return Err(ApiError::BadRequest("Cart is empty".to_string()));
        }

        // 1. Webinaires : une seule lecture, tout manquant annule la commande
        let mut webinar_ids: Vec<i32> = cart
            .iter()
            .filter_map(|item| match item {
                ItemRef::Webinar { webinar_id, .. } => Some(*webinar_id),
                ItemRef::Pack { .. } => None,
            })
            .collect();
        webinar_ids.sort_unstable();
        webinar_ids.dedup();

        let webinars: HashMap<i32, webinars::Model> = store
            .find_webinars(&webinar_ids)
            .await?
            .into_iter()
            .map(|webinar| (webinar.id, webinar))
            .collect();

        if let Some(missing) = webinar_ids.iter().find(|id| !webinars.contains_key(id)) {
            return Err(ApiError::NotFound(format!("Webinar {} not found", missing)));
        }

        // 2. Tarification ligne par ligne
        let mut items = Vec::with_capacity(cart.len());
        for item in cart {
            let priced = match &item {
                ItemRef::Webinar { webinar_id, .. } => match webinars.get(webinar_id) {
                    Some(webinar) => catalog::price_webinar(webinar),
                    None => return Err(ApiError::NotFound(format!("Webinar {} not found", webinar_id))),
                },
                ItemRef::Pack { pack_id } => {
                    let (_, pack) = catalog::find_pack(pack_id)
                        .ok_or_else(|| ApiError::BadRequest(format!("Unknown pack: {}", pack_id)))?;
                    catalog::price_pack(pack)
                }
            };

            items.push(OrderItem {
                item,
                price: priced.price,
                tax_applicable: priced.tax_applicable,
            });
        }

        let lines: Vec<catalog::PricedLine> = items
            .iter()
            .map(|line| catalog::PricedLine {
                price: line.price,
                tax_applicable: line.tax_applicable,
            })
            .collect();
        let total_amount = catalog::order_total(&lines);

        // 3. Raccourci : admin ou commande gratuite
        let status = if actor.role == Role::Admin || total_amount.is_zero() {
            OrderStatus::Confirmed
        } else {
            OrderStatus::PendingPayment
        };

        let order = store
            .insert_order(NewOrder {
                user_id: actor.user_id,
                items: OrderItems(items),
                total_amount,
                status,
                payment_proof_url: None,
                created_at: now,
            })
            .await?;

        tracing::info!(
            order_id = order.id,
            user_id = order.user_id,
            total = %order.total_amount,
            status = ?order.status,
            "order created"
        );

        if order.status == OrderStatus::Confirmed {
            Self::apply_confirmation(store, &order, now).await?;
        }

        Ok(order)
    }

    pub async fn submit_payment(
        store: &dyn Store,
        actor: &Actor,
        order_id: i32,
        proof_url: String,
        now: DateTime<Utc>,
    ) -> ApiResult<orders::Model> {
        let proof_url = proof_url.trim().to_string();
        if proof_url.is_empty() {
            return Err(ApiError::BadRequest("Payment proof is required".to_string()));
        }

        let order = Self::find(store, order_id).await?;

        if order.user_id != actor.user_id {
            return Err(ApiError::Forbidden("Not your order".to_string()));
        }
        if order.status != OrderStatus::PendingPayment {
            return Err(ApiError::Conflict(format!(
                "Order is {:?}, payment cannot be submitted",
                order.status
            )));
        }

        let next = OrderStatus::PaymentSubmitted;
        let moved = store
            .transition_order(order.id, &OrderStatus::sources_of(next), next, Some(proof_url.clone()), now)
            .await?;
        if !moved {
            return Err(ApiError::Conflict("Order status changed concurrently".to_string()));
        }

        tracing::info!(order_id = order.id, user_id = order.user_id, "payment submitted");

        let order = orders::Model {
            status: next,
            payment_proof_url: Some(proof_url.clone()),
            updated_at: now,
            ..order
        };

        Self::fan_out(store, &order, &proof_url, now).await?;

        Ok(order)
    }

    pub async fn confirm_order(
        store: &dyn Store,
        actor: &Actor,
        order_id: i32,
        now: DateTime<Utc>,
    ) -> ApiResult<orders::Model> {
        if !actor.role.can_manage_orders() {
            return Err(ApiError::Forbidden("Admin role required".to_string()));
        }

        let order = Self::find(store, order_id).await?;

        let next = OrderStatus::Confirmed;
        if !order.status.can_transition_to(next) {
            return Err(ApiError::Conflict("Order already confirmed".to_string()));
        }

        let moved = store
            .transition_order(order.id, &OrderStatus::sources_of(next), next, None, now)
            .await?;
        if !moved {
            return Err(ApiError::Conflict("Order already confirmed".to_string()));
        }

        tracing::info!(order_id = order.id, confirmed_by = actor.user_id, "order confirmed");

        let order = orders::Model {
            status: next,
            updated_at: now,
            ..order
        };

        Self::apply_confirmation(store, &order, now).await?;

        Ok(order)
    }

    /// Rejoue l'expansion d'inscriptions d'une commande payée ou confirmée.
    /// N'accorde jamais de crédits.
    pub async fn reconcile_order(
        store: &dyn Store,
        actor: &Actor,
        order_id: i32,
        now: DateTime<Utc>,
    ) -> ApiResult<FanOutReport> {
        if !actor.role.can_manage_orders() {
            return Err(ApiError::Forbidden("Admin role required".to_string()));
        }

        let order = Self::find(store, order_id).await?;

        let proof = match order.status {
            OrderStatus::PendingPayment => {
                return Err(ApiError::Conflict("Order has no payment to reconcile".to_string()));
            }
            OrderStatus::PaymentSubmitted => order
                .payment_proof_url
                .clone()
                .ok_or_else(|| StoreError::Corrupted(format!("order {} has no payment proof", order.id)))?,
            OrderStatus::Confirmed => ADMIN_CONFIRMED_PROOF.to_string(),
        };

        let report = Self::fan_out(store, &order, &proof, now).await?;
        tracing::info!(order_id = order.id, ?report, "order reconciled");

        Ok(report)
    }

    pub async fn list_all(store: &dyn Store, actor: &Actor) -> ApiResult<Vec<orders::Model>> {
        if !actor.role.can_manage_orders() {
            return Err(ApiError::Forbidden("Admin role required".to_string()));
        }
        Ok(store.list_orders().await?)
    }

    pub async fn list_for_user(store: &dyn Store, actor: &Actor) -> ApiResult<Vec<orders::Model>> {
        Ok(store.list_orders_for_user(actor.user_id).await?)
    }

    pub async fn get(store: &dyn Store, actor: &Actor, order_id: i32) -> ApiResult<orders::Model> {
        let order = Self::find(store, order_id).await?;

        if order.user_id != actor.user_id && !actor.role.can_manage_orders() {
            return Err(ApiError::Forbidden("Not your order".to_string()));
        }
        Ok(order)
    }

    async fn find(store: &dyn Store, order_id: i32) -> ApiResult<orders::Model> {
        store
            .find_order(order_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))
    }

    /// Effets de la confirmation : crédits des packs puis inscriptions
    async fn apply_confirmation(
        store: &dyn Store,
        order: &orders::Model,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let (mut master_class, mut pharmia) = (0, 0);
        for pack_id in order.items.pack_ids() {
            match catalog::find_pack(pack_id) {
                Some((PackCatalog::MasterClass, pack)) => master_class += pack.credits,
                Some((PackCatalog::Pharmia, pack)) => pharmia += pack.credits,
                // Pack retiré du catalogue depuis le checkout
                None => tracing::warn!(order_id = order.id, pack_id, "pack no longer in catalog"),
            }
        }

        if master_class > 0 || pharmia > 0 {
            store.increment_credits(order.user_id, master_class, pharmia).await?;
            tracing::info!(
                order_id = order.id,
                user_id = order.user_id,
                master_class,
                pharmia,
                "credits granted"
            );
        }

        Self::fan_out(store, order, ADMIN_CONFIRMED_PROOF, now).await?;
        Ok(())
    }

    /// Liste des webinaires ciblés : chaque webinaire acheté, étendu à toutes
    /// les séances de son thème. Un id n'apparaît qu'une fois.
    async fn expand_targets(
        store: &dyn Store,
        order: &orders::Model,
    ) -> Result<BTreeMap<i32, TimeSlots>, StoreError> {
        let purchased: Vec<(i32, &[String])> = order.items.webinar_items().collect();
        let ids: Vec<i32> = purchased.iter().map(|(id, _)| *id).collect();

        let webinars: HashMap<i32, webinars::Model> = store
            .find_webinars(&ids)
            .await?
            .into_iter()
            .map(|webinar| (webinar.id, webinar))
            .collect();

        let mut sessions_by_theme: HashMap<String, Vec<i32>> = HashMap::new();
        let mut targets: BTreeMap<i32, TimeSlots> = BTreeMap::new();

        for (webinar_id, slots) in purchased {
            let Some(webinar) = webinars.get(&webinar_id) else {
                tracing::warn!(order_id = order.id, webinar_id, "webinar deleted since checkout");
                continue;
            };

            let sessions = match &webinar.master_class_theme {
                Some(theme) => {
                    if !sessions_by_theme.contains_key(theme) {
                        let ids = store
                            .find_webinars_by_theme(theme)
                            .await?
                            .into_iter()
                            .map(|session| session.id)
                            .collect();
                        sessions_by_theme.insert(theme.clone(), ids);
                    }
                    sessions_by_theme.get(theme).cloned().unwrap_or_default()
                }
                None => vec![webinar_id],
            };

            for session_id in sessions {
                targets
                    .entry(session_id)
                    .or_insert_with(|| TimeSlots(slots.to_vec()));
            }
        }

        Ok(targets)
    }

    /// Applique le statut d'inscription correspondant au statut de la
    /// commande sur chaque webinaire ciblé
    async fn fan_out(
        store: &dyn Store,
        order: &orders::Model,
        proof: &str,
        now: DateTime<Utc>,
    ) -> Result<FanOutReport, StoreError> {
        let mut report = FanOutReport::default();

        let Some(target) = order.status.attendee_status() else {
            return Ok(report);
        };

        for (webinar_id, slots) in Self::expand_targets(store, order).await? {
            let change = Self::register(store, webinar_id, order.user_id, target, proof, slots, now).await?;
            match change {
                AttendeeChange::Inserted => report.inserted += 1,
                AttendeeChange::Updated => report.updated += 1,
                AttendeeChange::Unchanged => report.unchanged += 1,
            }
        }

        tracing::debug!(order_id = order.id, ?target, ?report, "attendee fan-out done");
        Ok(report)
    }

    async fn register(
        store: &dyn Store,
        webinar_id: i32,
        user_id: i32,
        target: AttendeeStatus,
        proof: &str,
        slots: TimeSlots,
        now: DateTime<Utc>,
    ) -> Result<AttendeeChange, StoreError> {
        let existing = match store.find_attendee(webinar_id, user_id).await? {
            Some(existing) => existing,
            None => {
                let inserted = store
                    .insert_attendee(NewAttendee {
                        webinar_id,
                        user_id,
                        status: target,
                        proof_url: Some(proof.to_string()),
                        registered_at: now,
                        time_slots: slots.clone(),
                    })
                    .await?;
                if inserted {
                    return Ok(AttendeeChange::Inserted);
                }

                // Inscription créée entre-temps par un autre fan-out : on la met à niveau
                store.find_attendee(webinar_id, user_id).await?.ok_or_else(|| {
                    StoreError::Corrupted(format!(
                        "attendee for webinar {} and user {} vanished after conflict",
                        webinar_id, user_id
                    ))
                })?
            }
        };

        if !existing.status.can_move_to(target) {
            return Ok(AttendeeChange::Unchanged);
        }

        // La confirmation admin conserve le justificatif déjà fourni
        let proof_url = if proof == ADMIN_CONFIRMED_PROOF {
            existing.proof_url.or_else(|| Some(proof.to_string()))
        } else {
            Some(proof.to_string())
        };
        let time_slots = if slots.0.is_empty() { existing.time_slots } else { slots };

        store
            .update_attendee(existing.id, target, proof_url, time_slots)
            .await?;
        Ok(AttendeeChange::Updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::WebinarGroup;
    use crate::store::memory::MemoryStore;
    use crate::store::{NewUser, NewWebinar};
    use chrono::Duration;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicU32, Ordering};

    static NEXT_EMAIL: AtomicU32 = AtomicU32::new(1);

    async fn seed_user(store: &MemoryStore, role: Role) -> Actor {
        let n = NEXT_EMAIL.fetch_add(1, Ordering::Relaxed);
        let user = store
            .insert_user(NewUser {
                email: format!("user{}@pharmia.tn", n),
                password_hash: String::new(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                role,
                pharmacist_id: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        Actor { user_id: user.id, role }
    }

    async fn seed_webinar(
        store: &MemoryStore,
        group: WebinarGroup,
        theme: Option<&str>,
        price: Option<Decimal>,
    ) -> webinars::Model {
        store
            .insert_webinar(NewWebinar {
                title: "Séance".to_string(),
                description: String::new(),
                group,
                master_class_theme: theme.map(str::to_string),
                date: Utc::now() + Duration::days(10),
                price,
                created_at: Utc::now(),
            })
            .await
            .unwrap()
    }

    fn webinar_item(webinar_id: i32) -> ItemRef {
        ItemRef::Webinar { webinar_id, time_slots: vec![] }
    }

    fn pack_item(pack_id: &str) -> ItemRef {
        ItemRef::Pack { pack_id: pack_id.to_string() }
    }

    #[tokio::test]
    async fn test_master_class_checkout_total() {
        let store = MemoryStore::new();
        let buyer = seed_user(&store, Role::Pharmacien).await;
        let webinar = seed_webinar(&store, WebinarGroup::MasterClass, None, Some(Decimal::new(100, 0))).await;

        let order = OrderService::checkout(&store, &buyer, vec![webinar_item(webinar.id)], Utc::now())
            .await
            .unwrap();

        assert_eq!(order.total_amount, Decimal::new(120_000, 3));
        assert_eq!(order.items.0[0].price, Decimal::new(119_000, 3));
        assert!(order.items.0[0].tax_applicable);
        assert_eq!(order.status, OrderStatus::PendingPayment);
    }

    #[tokio::test]
    async fn test_crop_tunis_checkout_has_no_stamp_duty() {
        let store = MemoryStore::new();
        let buyer = seed_user(&store, Role::Preparateur).await;
        let webinar = seed_webinar(&store, WebinarGroup::CropTunis, None, Some(Decimal::new(80_000, 3))).await;

        let order = OrderService::checkout(&store, &buyer, vec![webinar_item(webinar.id)], Utc::now())
            .await
            .unwrap();

        assert_eq!(order.total_amount, Decimal::new(80_000, 3));
        assert!(!order.items.0[0].tax_applicable);
    }

    #[tokio::test]
    async fn test_missing_webinar_rejects_whole_checkout() {
        let store = MemoryStore::new();
        let buyer = seed_user(&store, Role::Pharmacien).await;
        let webinar = seed_webinar(&store, WebinarGroup::CropTunis, None, None).await;

        let result =
            OrderService::checkout(&store, &buyer, vec![webinar_item(webinar.id), webinar_item(404)], Utc::now())
                .await;

        assert!(matches!(result, Err(ApiError::NotFound(_))));
        assert!(store.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_pack_and_empty_cart_are_bad_requests() {
        let store = MemoryStore::new();
        let buyer = seed_user(&store, Role::Pharmacien).await;

        let unknown = OrderService::checkout(&store, &buyer, vec![pack_item("GOLD")], Utc::now()).await;
        assert!(matches!(unknown, Err(ApiError::BadRequest(_))));

        let empty = OrderService::checkout(&store, &buyer, vec![], Utc::now()).await;
        assert!(matches!(empty, Err(ApiError::BadRequest(_))));

        assert!(store.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_admin_checkout_is_confirmed_with_effects() {
        let store = MemoryStore::new();
        let admin = seed_user(&store, Role::Admin).await;
        let webinar = seed_webinar(&store, WebinarGroup::Pharmia, None, None).await;

        let order = OrderService::checkout(
            &store,
            &admin,
            vec![webinar_item(webinar.id), pack_item("MC_PACK_3")],
            Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(order.status, OrderStatus::Confirmed);

        let attendee = store.find_attendee(webinar.id, admin.user_id).await.unwrap().unwrap();
        assert_eq!(attendee.status, AttendeeStatus::Confirmed);
        assert_eq!(attendee.proof_url.as_deref(), Some(ADMIN_CONFIRMED_PROOF));

        let user = store.find_user(admin.user_id).await.unwrap().unwrap();
        assert_eq!(user.master_class_credits, 3);
    }

    #[tokio::test]
    async fn test_free_order_is_confirmed_immediately() {
        let store = MemoryStore::new();
        let buyer = seed_user(&store, Role::Apprenant).await;
        let webinar = seed_webinar(&store, WebinarGroup::CropTunis, None, Some(Decimal::ZERO)).await;

        let order = OrderService::checkout(&store, &buyer, vec![webinar_item(webinar.id)], Utc::now())
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Confirmed);
        let attendee = store.find_attendee(webinar.id, buyer.user_id).await.unwrap().unwrap();
        assert_eq!(attendee.status, AttendeeStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_confirm_twice_grants_credits_once() {
        let store = MemoryStore::new();
        let buyer = seed_user(&store, Role::Pharmacien).await;
        let admin = seed_user(&store, Role::AdminWebinar).await;

        let order = OrderService::checkout(
            &store,
            &buyer,
            vec![pack_item("MC_PACK_3"), pack_item("PHARMIA_10"), pack_item("PHARMIA_5")],
            Utc::now(),
        )
        .await
        .unwrap();
        OrderService::submit_payment(&store, &buyer, order.id, "/uploads/virement.pdf".to_string(), Utc::now())
            .await
            .unwrap();

        let confirmed = OrderService::confirm_order(&store, &admin, order.id, Utc::now()).await.unwrap();
        assert_eq!(confirmed.status, OrderStatus::Confirmed);

        let second = OrderService::confirm_order(&store, &admin, order.id, Utc::now()).await;
        assert!(matches!(second, Err(ApiError::Conflict(_))));

        let user = store.find_user(buyer.user_id).await.unwrap().unwrap();
        assert_eq!(user.master_class_credits, 3);
        assert_eq!(user.pharmia_credits, 15);
    }

    #[tokio::test]
    async fn test_concurrent_confirmations_share_one_registration() {
        let store = MemoryStore::new();
        let buyer = seed_user(&store, Role::Pharmacien).await;
        let admin = seed_user(&store, Role::Admin).await;
        let webinar = seed_webinar(&store, WebinarGroup::CropTunis, None, Some(Decimal::new(80_000, 3))).await;

        let first = OrderService::checkout(&store, &buyer, vec![webinar_item(webinar.id)], Utc::now())
            .await
            .unwrap();
        let second = OrderService::checkout(&store, &buyer, vec![webinar_item(webinar.id)], Utc::now())
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            OrderService::confirm_order(&store, &admin, first.id, Utc::now()),
            OrderService::confirm_order(&store, &admin, second.id, Utc::now()),
        );
        assert_eq!(a.unwrap().status, OrderStatus::Confirmed);
        assert_eq!(b.unwrap().status, OrderStatus::Confirmed);

        let attendees = store.list_attendees(webinar.id).await.unwrap();
        assert_eq!(attendees.len(), 1);
        assert_eq!(attendees[0].status, AttendeeStatus::Confirmed);
        assert_eq!(attendees[0].proof_url.as_deref(), Some(ADMIN_CONFIRMED_PROOF));
    }

    #[tokio::test]
    async fn test_credits_accumulate_across_orders() {
        let store = MemoryStore::new();
        let buyer = seed_user(&store, Role::Pharmacien).await;
        let admin = seed_user(&store, Role::Admin).await;

        for _ in 0..2 {
            let order = OrderService::checkout(&store, &buyer, vec![pack_item("MC_UNIT")], Utc::now())
                .await
                .unwrap();
            OrderService::confirm_order(&store, &admin, order.id, Utc::now()).await.unwrap();
        }

        let user = store.find_user(buyer.user_id).await.unwrap().unwrap();
        assert_eq!(user.master_class_credits, 2);
    }

    #[tokio::test]
    async fn test_submit_payment_fans_out_to_every_theme_session() {
        let store = MemoryStore::new();
        let buyer = seed_user(&store, Role::Pharmacien).await;

        let mut sessions = Vec::new();
        for _ in 0..5 {
            sessions.push(seed_webinar(&store, WebinarGroup::MasterClass, Some("Diabète"), None).await);
        }
        let other = seed_webinar(&store, WebinarGroup::MasterClass, Some("Dermatologie"), None).await;

        let order = OrderService::checkout(&store, &buyer, vec![webinar_item(sessions[2].id)], Utc::now())
            .await
            .unwrap();
        let order =
            OrderService::submit_payment(&store, &buyer, order.id, "/uploads/recu.jpg".to_string(), Utc::now())
                .await
                .unwrap();
        assert_eq!(order.status, OrderStatus::PaymentSubmitted);

        for session in &sessions {
            let attendee = store.find_attendee(session.id, buyer.user_id).await.unwrap().unwrap();
            assert_eq!(attendee.status, AttendeeStatus::PaymentSubmitted);
            assert_eq!(attendee.proof_url.as_deref(), Some("/uploads/recu.jpg"));
        }
        assert!(store.find_attendee(other.id, buyer.user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_confirmed_attendee_is_not_downgraded() {
        let store = MemoryStore::new();
        let buyer = seed_user(&store, Role::Pharmacien).await;
        let admin = seed_user(&store, Role::Admin).await;
        let first = seed_webinar(&store, WebinarGroup::MasterClass, Some("Pédiatrie"), None).await;
        let second = seed_webinar(&store, WebinarGroup::MasterClass, Some("Pédiatrie"), None).await;

        // Première commande confirmée : les deux séances sont CONFIRMED
        let order = OrderService::checkout(&store, &buyer, vec![webinar_item(first.id)], Utc::now())
            .await
            .unwrap();
        OrderService::confirm_order(&store, &admin, order.id, Utc::now()).await.unwrap();

        // Nouvelle commande sur le même thème : le justificatif ne rétrograde rien
        let again = OrderService::checkout(&store, &buyer, vec![webinar_item(second.id)], Utc::now())
            .await
            .unwrap();
        OrderService::submit_payment(&store, &buyer, again.id, "/uploads/bis.pdf".to_string(), Utc::now())
            .await
            .unwrap();

        for webinar in [&first, &second] {
            let attendee = store.find_attendee(webinar.id, buyer.user_id).await.unwrap().unwrap();
            assert_eq!(attendee.status, AttendeeStatus::Confirmed);
            assert_eq!(attendee.proof_url.as_deref(), Some(ADMIN_CONFIRMED_PROOF));
        }
    }

    #[tokio::test]
    async fn test_confirm_upgrades_submitted_attendee_and_keeps_proof() {
        let store = MemoryStore::new();
        let buyer = seed_user(&store, Role::Preparateur).await;
        let admin = seed_user(&store, Role::Admin).await;
        let webinar = seed_webinar(&store, WebinarGroup::CropTunis, None, None).await;

        let order = OrderService::checkout(
            &store,
            &buyer,
            vec![ItemRef::Webinar { webinar_id: webinar.id, time_slots: vec!["MORNING".to_string()] }],
            Utc::now(),
        )
        .await
        .unwrap();
        OrderService::submit_payment(&store, &buyer, order.id, "/uploads/p.pdf".to_string(), Utc::now())
            .await
            .unwrap();
        OrderService::confirm_order(&store, &admin, order.id, Utc::now()).await.unwrap();

        let attendees = store.list_attendees(webinar.id).await.unwrap();
        assert_eq!(attendees.len(), 1);
        assert_eq!(attendees[0].status, AttendeeStatus::Confirmed);
        assert_eq!(attendees[0].proof_url.as_deref(), Some("/uploads/p.pdf"));
        assert_eq!(attendees[0].time_slots, TimeSlots(vec!["MORNING".to_string()]));
    }

    #[tokio::test]
    async fn test_submit_payment_guards() {
        let store = MemoryStore::new();
        let buyer = seed_user(&store, Role::Pharmacien).await;
        let intruder = seed_user(&store, Role::Pharmacien).await;
        let webinar = seed_webinar(&store, WebinarGroup::CropTunis, None, None).await;
        let order = OrderService::checkout(&store, &buyer, vec![webinar_item(webinar.id)], Utc::now())
            .await
            .unwrap();

        let foreign =
            OrderService::submit_payment(&store, &intruder, order.id, "/x.pdf".to_string(), Utc::now()).await;
        assert!(matches!(foreign, Err(ApiError::Forbidden(_))));

        let blank = OrderService::submit_payment(&store, &buyer, order.id, "  ".to_string(), Utc::now()).await;
        assert!(matches!(blank, Err(ApiError::BadRequest(_))));

        let missing = OrderService::submit_payment(&store, &buyer, 9999, "/x.pdf".to_string(), Utc::now()).await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));

        OrderService::submit_payment(&store, &buyer, order.id, "/x.pdf".to_string(), Utc::now())
            .await
            .unwrap();
        let twice = OrderService::submit_payment(&store, &buyer, order.id, "/y.pdf".to_string(), Utc::now()).await;
        assert!(matches!(twice, Err(ApiError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_confirm_requires_order_manager() {
        let store = MemoryStore::new();
        let buyer = seed_user(&store, Role::Pharmacien).await;
        let trainer = seed_user(&store, Role::Formateur).await;
        let order = OrderService::checkout(&store, &buyer, vec![pack_item("PHARMIA_5")], Utc::now())
            .await
            .unwrap();

        let denied = OrderService::confirm_order(&store, &trainer, order.id, Utc::now()).await;
        assert!(matches!(denied, Err(ApiError::Forbidden(_))));

        let own = OrderService::confirm_order(&store, &buyer, order.id, Utc::now()).await;
        assert!(matches!(own, Err(ApiError::Forbidden(_))));

        let admin = seed_user(&store, Role::Admin).await;
        let missing = OrderService::confirm_order(&store, &admin, 424242, Utc::now()).await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_reconcile_replays_missing_sessions_without_credits() {
        let store = MemoryStore::new();
        let buyer = seed_user(&store, Role::Pharmacien).await;
        let admin = seed_user(&store, Role::Admin).await;
        let first = seed_webinar(&store, WebinarGroup::MasterClass, Some("Nutrition"), None).await;

        let order = OrderService::checkout(
            &store,
            &buyer,
            vec![webinar_item(first.id), pack_item("PHARMIA_5")],
            Utc::now(),
        )
        .await
        .unwrap();
        OrderService::confirm_order(&store, &admin, order.id, Utc::now()).await.unwrap();

        // Séance ajoutée au thème après la confirmation
        let late = seed_webinar(&store, WebinarGroup::MasterClass, Some("Nutrition"), None).await;

        let report = OrderService::reconcile_order(&store, &admin, order.id, Utc::now()).await.unwrap();
        assert_eq!(report, FanOutReport { inserted: 1, updated: 0, unchanged: 1 });

        let attendee = store.find_attendee(late.id, buyer.user_id).await.unwrap().unwrap();
        assert_eq!(attendee.status, AttendeeStatus::Confirmed);

        let user = store.find_user(buyer.user_id).await.unwrap().unwrap();
        assert_eq!(user.pharmia_credits, 5);
    }

    #[tokio::test]
    async fn test_order_reads_are_owner_or_admin() {
        let store = MemoryStore::new();
        let buyer = seed_user(&store, Role::Pharmacien).await;
        let other = seed_user(&store, Role::Apprenant).await;
        let admin = seed_user(&store, Role::AdminWebinar).await;
        let order = OrderService::checkout(&store, &buyer, vec![pack_item("PHARMIA_5")], Utc::now())
            .await
            .unwrap();

        assert!(OrderService::get(&store, &buyer, order.id).await.is_ok());
        assert!(OrderService::get(&store, &admin, order.id).await.is_ok());
        assert!(matches!(OrderService::get(&store, &other, order.id).await, Err(ApiError::Forbidden(_))));

        assert_eq!(OrderService::list_for_user(&store, &buyer).await.unwrap().len(), 1);
        assert!(OrderService::list_for_user(&store, &other).await.unwrap().is_empty());
        assert!(matches!(OrderService::list_all(&store, &other).await, Err(ApiError::Forbidden(_))));
        assert_eq!(OrderService::list_all(&store, &admin).await.unwrap().len(), 1);
    }
}
