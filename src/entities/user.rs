use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue::Set};

/// A store customer (or staff member).
///
/// `api_token_hash` holds the SHA-256 of the bearer token, never the token itself.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub email: String,
    pub username: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub balance: f64,
    pub default_method_id: Option<i64>,
    #[sea_orm(unique)]
    pub api_token_hash: Option<String>,
    pub date_joined: DateTime<Utc>,
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    fn new() -> Self {
        Self {
            balance: Set(0.0),
            is_staff: Set(false),
            is_active: Set(true),
            date_joined: Set(Utc::now()),
            ..ActiveModelTrait::default()
        }
    }

    async fn before_save<C>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if let Some(balance) = self.balance.try_as_ref()
            && *balance < 0.0
        {
            return Err(DbErr::Custom("Balance must not be negative".to_string()));
        }
        Ok(self)
    }
}
