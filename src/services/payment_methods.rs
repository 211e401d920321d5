use std::sync::Arc;

use sea_orm::prelude::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::instrument;

use crate::database::Database;
use crate::entities;
use crate::services::accounts::AccountError;
use crate::services::pagination::{PageRequest, PaginatedResult, fetch_page};

const MAX_TITLE_LEN: usize = 100;

/// What a user asks for when adding a payment method to their account.
#[derive(Debug, Clone)]
pub enum NewUserPaymentMethod {
    Existing(i64),
    Titled(String),
}

pub struct PaymentMethodService {
    db: Arc<Database>,
}

impl PaymentMethodService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a payment method that users can then pick
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        title: &str,
    ) -> Result<entities::payment_method::Model, AccountError> {
        let title = validate_title(title)?;
        let method = entities::payment_method::ActiveModel {
            title: Set(title),
            ..Default::default()
        }
        .insert(&self.db.conn)
        .await?;

        tracing::info!(payment_method_id = method.id, "Created payment method");
        Ok(method)
    }

    pub async fn list_for_user(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> Result<PaginatedResult<entities::payment_method::Model>, DbErr> {
        let ids: Vec<i64> = entities::user_payment_method::Entity::find()
            .filter(entities::user_payment_method::Column::UserId.eq(user_id))
            .all(&self.db.conn)
            .await?
            .into_iter()
            .map(|link| link.payment_method_id)
            .collect();

        let query = entities::payment_method::Entity::find()
            .filter(entities::payment_method::Column::Id.is_in(ids))
            .order_by_asc(entities::payment_method::Column::Id);

        fetch_page(query, &self.db.conn, page).await
    }

    pub async fn get_for_user(
        &self,
        user_id: i64,
        payment_method_id: i64,
    ) -> Result<Option<entities::payment_method::Model>, DbErr> {
        if self.link(user_id, payment_method_id).await?.is_none() {
            return Ok(None);
        }

        entities::payment_method::Entity::find_by_id(payment_method_id)
            .one(&self.db.conn)
            .await
    }

    /// Link a payment method to the user. Linking an already linked method is a no-op.
    #[instrument(skip(self))]
    pub async fn add_for_user(
        &self,
        user_id: i64,
        request: NewUserPaymentMethod,
    ) -> Result<entities::payment_method::Model, AccountError> {
        let method = match request {
            NewUserPaymentMethod::Existing(id) => entities::payment_method::Entity::find_by_id(id)
                .one(&self.db.conn)
                .await?
                .ok_or(AccountError::PaymentNotFound)?,
            NewUserPaymentMethod::Titled(title) => self.create(&title).await?,
        };

        if self.link(user_id, method.id).await?.is_none() {
            entities::user_payment_method::ActiveModel {
                user_id: Set(user_id),
                payment_method_id: Set(method.id),
            }
            .insert(&self.db.conn)
            .await?;
        }

        Ok(method)
    }

    /// Unlink a payment method from the user, clearing their default if it pointed there.
    /// Returns false when the method was not linked.
    #[instrument(skip(self))]
    pub async fn remove_for_user(
        &self,
        user_id: i64,
        payment_method_id: i64,
    ) -> Result<bool, DbErr> {
        if self.link(user_id, payment_method_id).await?.is_none() {
            return Ok(false);
        }

        let txn = self.db.conn.begin().await?;

        entities::user_payment_method::Entity::delete_by_id((user_id, payment_method_id))
            .exec(&txn)
            .await?;

        entities::user::Entity::update_many()
            .col_expr(
                entities::user::Column::DefaultMethodId,
                Expr::value(Option::<i64>::None),
            )
            .filter(
                Condition::all()
                    .add(entities::user::Column::Id.eq(user_id))
                    .add(entities::user::Column::DefaultMethodId.eq(payment_method_id)),
            )
            .exec(&txn)
            .await?;

        txn.commit().await?;

        Ok(true)
    }

    async fn link(
        &self,
        user_id: i64,
        payment_method_id: i64,
    ) -> Result<Option<entities::user_payment_method::Model>, DbErr> {
        entities::user_payment_method::Entity::find_by_id((user_id, payment_method_id))
            .one(&self.db.conn)
            .await
    }
}

fn validate_title(title: &str) -> Result<String, AccountError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
        return Err(AccountError::InvalidTitle);
    }
    Ok(title.to_string())
}
