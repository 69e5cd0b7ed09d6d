use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func, OnConflict};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet,
    PaginatorTrait, QueryFilter, QueryOrder, Set, Unchanged,
};

use super::{
    FicheQuery, NewAttendee, NewGroup, NewMemoFiche, NewOrder, NewUser, NewWebinar, Store,
    StoreResult, UserPatch, WebinarQuery,
};
use crate::models::enums::{AttendeeStatus, FicheStatus, OrderStatus};
use crate::models::groups::{AssignedFiches, IdList};
use crate::models::webinar_attendees::TimeSlots;
use crate::models::{groups, memofiches, orders, users, webinar_attendees, webinars};

/// Store de production : PostgreSQL via SeaORM
#[derive(Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Store for SeaOrmStore {
    async fn find_user(&self, id: i32) -> StoreResult<Option<users::Model>> {
        Ok(users::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<users::Model>> {
        Ok(users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await?)
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<users::Model> {
        let model = users::ActiveModel {
            email: Set(user.email),
            password_hash: Set(user.password_hash),
            first_name: Set(user.first_name),
            last_name: Set(user.last_name),
            role: Set(user.role),
            has_active_subscription: Set(false),
            subscription_end_date: Set(None),
            trial_expires_at: Set(None),
            pharmacist_id: Set(user.pharmacist_id),
            group_id: Set(None),
            master_class_credits: Set(0),
            pharmia_credits: Set(0),
            created_at: Set(user.created_at),
            ..Default::default()
        };

        Ok(model.insert(&self.db).await?)
    }

    async fn update_user(&self, id: i32, patch: UserPatch) -> StoreResult<Option<users::Model>> {
        if users::Entity::find_by_id(id).one(&self.db).await?.is_none() {
            return Ok(None);
        }

        // Seules les colonnes Set sont écrites : les crédits ne sont jamais
        // réécrits ici, ils n'évoluent que par increment_credits
        let model = users::ActiveModel {
            id: Unchanged(id),
            role: patch.role.map_or(NotSet, Set),
            has_active_subscription: patch.has_active_subscription.map_or(NotSet, Set),
            subscription_end_date: patch.subscription_end_date.map_or(NotSet, Set),
            trial_expires_at: patch.trial_expires_at.map_or(NotSet, Set),
            pharmacist_id: patch.pharmacist_id.map_or(NotSet, Set),
            group_id: patch.group_id.map_or(NotSet, Set),
            ..Default::default()
        };

        if !model.is_changed() {
            return Ok(users::Entity::find_by_id(id).one(&self.db).await?);
        }

        Ok(Some(model.update(&self.db).await?))
    }

    async fn increment_credits(&self, user_id: i32, master_class: i32, pharmia: i32) -> StoreResult<()> {
        users::Entity::update_many()
            .col_expr(
                users::Column::MasterClassCredits,
                Expr::col(users::Column::MasterClassCredits).add(master_class),
            )
            .col_expr(
                users::Column::PharmiaCredits,
                Expr::col(users::Column::PharmiaCredits).add(pharmia),
            )
            .filter(users::Column::Id.eq(user_id))
            .exec(&self.db)
            .await?;

        Ok(())
    }

    async fn find_group(&self, id: i32) -> StoreResult<Option<groups::Model>> {
        Ok(groups::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn insert_group(&self, group: NewGroup) -> StoreResult<groups::Model> {
        let model = groups::ActiveModel {
            name: Set(group.name),
            pharmacist_ids: Set(group.pharmacist_ids),
            preparator_ids: Set(group.preparator_ids),
            assigned_fiches: Set(AssignedFiches::default()),
            created_at: Set(group.created_at),
            ..Default::default()
        };

        Ok(model.insert(&self.db).await?)
    }

    async fn set_group_members(
        &self,
        id: i32,
        pharmacist_ids: IdList,
        preparator_ids: IdList,
    ) -> StoreResult<Option<groups::Model>> {
        let Some(group) = groups::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };

        let mut active: groups::ActiveModel = group.into();
        active.pharmacist_ids = Set(pharmacist_ids);
        active.preparator_ids = Set(preparator_ids);

        Ok(Some(active.update(&self.db).await?))
    }

    async fn set_assigned_fiches(&self, id: i32, fiches: AssignedFiches) -> StoreResult<Option<groups::Model>> {
        let Some(group) = groups::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };

        let mut active: groups::ActiveModel = group.into();
        active.assigned_fiches = Set(fiches);

        Ok(Some(active.update(&self.db).await?))
    }

    async fn find_memofiche(&self, id: i32) -> StoreResult<Option<memofiches::Model>> {
        Ok(memofiches::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn list_memofiches(&self, query: &FicheQuery) -> StoreResult<(Vec<memofiches::Model>, u64)> {
        let mut select = memofiches::Entity::find();

        if !query.include_unpublished {
            select = select.filter(memofiches::Column::Status.eq(FicheStatus::Published));
        }
        if let Some(search) = &query.search {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(memofiches::Column::Title)))
                    .like(format!("%{}%", search.to_lowercase())),
            );
        }
        if let Some(theme) = &query.theme {
            select = select.filter(memofiches::Column::Theme.eq(theme.as_str()));
        }
        if let Some(system) = &query.system {
            select = select.filter(memofiches::Column::System.eq(system.as_str()));
        }

        let paginator = select
            .order_by_desc(memofiches::Column::UpdatedAt)
            .order_by_desc(memofiches::Column::Id)
            .paginate(&self.db, query.limit);

        let total = paginator.num_items().await?;
        let page = paginator.fetch_page(query.page.max(1) - 1).await?;

        Ok((page, total))
    }

    async fn insert_memofiche(&self, fiche: NewMemoFiche) -> StoreResult<memofiches::Model> {
        let model = memofiches::ActiveModel {
            title: Set(fiche.title),
            short_description: Set(fiche.short_description),
            theme: Set(fiche.theme),
            system: Set(fiche.system),
            status: Set(fiche.status),
            is_free: Set(fiche.is_free),
            key_points: Set(fiche.key_points),
            sections: Set(fiche.sections),
            created_at: Set(fiche.created_at),
            updated_at: Set(fiche.created_at),
            ..Default::default()
        };

        Ok(model.insert(&self.db).await?)
    }

    async fn find_webinar(&self, id: i32) -> StoreResult<Option<webinars::Model>> {
        Ok(webinars::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_webinars(&self, ids: &[i32]) -> StoreResult<Vec<webinars::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(webinars::Entity::find()
            .filter(webinars::Column::Id.is_in(ids.to_vec()))
            .order_by_asc(webinars::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn find_webinars_by_theme(&self, theme: &str) -> StoreResult<Vec<webinars::Model>> {
        Ok(webinars::Entity::find()
            .filter(webinars::Column::MasterClassTheme.eq(theme))
            .order_by_asc(webinars::Column::Date)
            .order_by_asc(webinars::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn list_webinars(&self, query: &WebinarQuery) -> StoreResult<Vec<webinars::Model>> {
        let mut select = webinars::Entity::find();

        if let Some(group) = query.group {
            select = select.filter(webinars::Column::Group.eq(group));
        }
        if let Some(theme) = &query.theme {
            select = select.filter(webinars::Column::MasterClassTheme.eq(theme.as_str()));
        }

        Ok(select
            .order_by_asc(webinars::Column::Date)
            .order_by_asc(webinars::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn insert_webinar(&self, webinar: NewWebinar) -> StoreResult<webinars::Model> {
        let model = webinars::ActiveModel {
            title: Set(webinar.title),
            description: Set(webinar.description),
            group: Set(webinar.group),
            master_class_theme: Set(webinar.master_class_theme),
            date: Set(webinar.date),
            price: Set(webinar.price),
            created_at: Set(webinar.created_at),
            ..Default::default()
        };

        Ok(model.insert(&self.db).await?)
    }

    async fn find_attendee(&self, webinar_id: i32, user_id: i32) -> StoreResult<Option<webinar_attendees::Model>> {
        Ok(webinar_attendees::Entity::find()
            .filter(webinar_attendees::Column::WebinarId.eq(webinar_id))
            .filter(webinar_attendees::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?)
    }

    async fn list_attendees(&self, webinar_id: i32) -> StoreResult<Vec<webinar_attendees::Model>> {
        Ok(webinar_attendees::Entity::find()
            .filter(webinar_attendees::Column::WebinarId.eq(webinar_id))
            .order_by_asc(webinar_attendees::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn insert_attendee(&self, attendee: NewAttendee) -> StoreResult<bool> {
        let model = webinar_attendees::ActiveModel {
            webinar_id: Set(attendee.webinar_id),
            user_id: Set(attendee.user_id),
            status: Set(attendee.status),
            proof_url: Set(attendee.proof_url),
            registered_at: Set(attendee.registered_at),
            time_slots: Set(attendee.time_slots),
            ..Default::default()
        };

        let inserted = webinar_attendees::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    webinar_attendees::Column::WebinarId,
                    webinar_attendees::Column::UserId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(inserted == 1)
    }

    async fn update_attendee(
        &self,
        id: i32,
        status: AttendeeStatus,
        proof_url: Option<String>,
        time_slots: TimeSlots,
    ) -> StoreResult<()> {
        webinar_attendees::Entity::update_many()
            .col_expr(webinar_attendees::Column::Status, Expr::value(status.to_value()))
            .col_expr(webinar_attendees::Column::ProofUrl, Expr::value(proof_url))
            .col_expr(
                webinar_attendees::Column::TimeSlots,
                Expr::value(serde_json::json!(time_slots.0)),
            )
            .filter(webinar_attendees::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        Ok(())
    }

    async fn find_order(&self, id: i32) -> StoreResult<Option<orders::Model>> {
        Ok(orders::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn list_orders(&self) -> StoreResult<Vec<orders::Model>> {
        Ok(orders::Entity::find()
            .order_by_desc(orders::Column::CreatedAt)
            .order_by_desc(orders::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn list_orders_for_user(&self, user_id: i32) -> StoreResult<Vec<orders::Model>> {
        Ok(orders::Entity::find()
            .filter(orders::Column::UserId.eq(user_id))
            .order_by_desc(orders::Column::CreatedAt)
            .order_by_desc(orders::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn insert_order(&self, order: NewOrder) -> StoreResult<orders::Model> {
        let model = orders::ActiveModel {
            user_id: Set(order.user_id),
            items: Set(order.items),
            total_amount: Set(order.total_amount),
            status: Set(order.status),
            payment_proof_url: Set(order.payment_proof_url),
            created_at: Set(order.created_at),
            updated_at: Set(order.created_at),
            ..Default::default()
        };

        Ok(model.insert(&self.db).await?)
    }

    async fn transition_order(
        &self,
        id: i32,
        from: &[OrderStatus],
        to: OrderStatus,
        payment_proof_url: Option<String>,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        // UPDATE ... WHERE id = $1 AND status IN (...) : deux confirmations
        // concurrentes ne peuvent pas réussir toutes les deux
        let mut update = orders::Entity::update_many()
            .col_expr(orders::Column::Status, Expr::value(to.to_value()))
            .col_expr(orders::Column::UpdatedAt, Expr::value(now));

        if let Some(proof) = payment_proof_url {
            update = update.col_expr(orders::Column::PaymentProofUrl, Expr::value(proof));
        }

        let result = update
            .filter(orders::Column::Id.eq(id))
            .filter(orders::Column::Status.is_in(from.iter().map(|status| status.to_value())))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }
}
