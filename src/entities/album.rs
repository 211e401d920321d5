use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue::Set};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "albums")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    pub author: String,
    pub image: Option<String>,
    pub price: f64,
    pub created_at: DateTime<Utc>,

    #[sea_orm(has_many)]
    pub tracks: HasMany<super::track::Entity>,
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    fn new() -> Self {
        Self {
            price: Set(0.0),
            created_at: Set(Utc::now()),
            ..ActiveModelTrait::default()
        }
    }
}
