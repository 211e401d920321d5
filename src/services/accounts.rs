use std::sync::Arc;

use sea_orm::prelude::Expr;
use sea_orm::sea_query::ExprTrait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::instrument;

use crate::database::Database;
use crate::entities;
use crate::token::{generate_token, hash_token};

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("A user with email {0} already exists")]
    EmailTaken(String),
    #[error("No user with email {0}")]
    UserNotFound(String),
    #[error("Amount must be a positive number")]
    InvalidAmount,
    #[error("Payment method title must be 1 to 100 characters")]
    InvalidTitle,
    #[error("Payment method not found")]
    PaymentNotFound,
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// A user together with the payment methods they have used.
#[derive(Debug, Clone)]
pub struct AccountView {
    pub user: entities::user::Model,
    pub methods_used: Vec<entities::payment_method::Model>,
}

pub struct AccountService {
    db: Arc<Database>,
}

impl AccountService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a user and return it along with its freshly issued API token.
    #[instrument(skip(self))]
    pub async fn create_user(
        &self,
        email: &str,
        username: &str,
        is_staff: bool,
    ) -> Result<(entities::user::Model, String), AccountError> {
        if self.find_by_email(email).await?.is_some() {
            return Err(AccountError::EmailTaken(email.to_string()));
        }

        let token = generate_token();
        let user = entities::user::ActiveModel {
            email: Set(email.to_string()),
            username: Set(username.to_string()),
            is_staff: Set(is_staff),
            api_token_hash: Set(Some(hash_token(&token))),
            ..entities::user::ActiveModel::new()
        }
        .insert(&self.db.conn)
        .await?;

        tracing::info!(user_id = user.id, "Created user");
        Ok((user, token))
    }

    /// Issue a new token for the user; the old one stops working.
    #[instrument(skip(self))]
    pub async fn rotate_token(&self, email: &str) -> Result<String, AccountError> {
        let user = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| AccountError::UserNotFound(email.to_string()))?;

        let token = generate_token();
        let mut active: entities::user::ActiveModel = user.into();
        active.api_token_hash = Set(Some(hash_token(&token)));
        active.update(&self.db.conn).await?;

        Ok(token)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<entities::user::Model>, DbErr> {
        entities::user::Entity::find()
            .filter(entities::user::Column::Email.eq(email))
            .one(&self.db.conn)
            .await
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<entities::user::Model>, DbErr> {
        entities::user::Entity::find()
            .filter(entities::user::Column::ApiTokenHash.eq(hash_token(token)))
            .one(&self.db.conn)
            .await
    }

    /// Add money to a user's balance.
    #[instrument(skip(self))]
    pub async fn deposit(
        &self,
        email: &str,
        amount: f64,
    ) -> Result<entities::user::Model, AccountError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(AccountError::InvalidAmount);
        }

        let user = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| AccountError::UserNotFound(email.to_string()))?;

        // Relative update so a purchase committed in between is not overwritten.
        entities::user::Entity::update_many()
            .col_expr(
                entities::user::Column::Balance,
                Expr::col(entities::user::Column::Balance).add(amount),
            )
            .filter(entities::user::Column::Id.eq(user.id))
            .exec(&self.db.conn)
            .await?;
        let user = entities::user::Entity::find_by_id(user.id)
            .one(&self.db.conn)
            .await?
            .ok_or_else(|| AccountError::UserNotFound(email.to_string()))?;

        tracing::info!(user_id = user.id, amount, balance = user.balance, "Deposited");
        Ok(user)
    }

    pub async fn account(&self, user: entities::user::Model) -> Result<AccountView, DbErr> {
        let methods_used = self.methods_used(user.id).await?;
        Ok(AccountView { user, methods_used })
    }

    /// Set or clear the default payment method. A method has to be among the
    /// ones the user has used before it can become the default.
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn set_default_method(
        &self,
        user: entities::user::Model,
        payment_method_id: Option<i64>,
    ) -> Result<AccountView, AccountError> {
        let methods_used = self.methods_used(user.id).await?;

        if let Some(id) = payment_method_id
            && !methods_used.iter().any(|method| method.id == id)
        {
            return Err(AccountError::PaymentNotFound);
        }

        let mut active: entities::user::ActiveModel = user.into();
        active.default_method_id = Set(payment_method_id);
        let user = active.update(&self.db.conn).await?;

        Ok(AccountView { user, methods_used })
    }

    async fn methods_used(
        &self,
        user_id: i64,
    ) -> Result<Vec<entities::payment_method::Model>, DbErr> {
        let ids: Vec<i64> = entities::user_payment_method::Entity::find()
            .filter(entities::user_payment_method::Column::UserId.eq(user_id))
            .all(&self.db.conn)
            .await?
            .into_iter()
            .map(|link| link.payment_method_id)
            .collect();

        entities::payment_method::Entity::find()
            .filter(entities::payment_method::Column::Id.is_in(ids))
            .order_by_asc(entities::payment_method::Column::Id)
            .all(&self.db.conn)
            .await
    }
}
