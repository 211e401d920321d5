use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue::Set};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tracks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    pub author: String,
    pub album_id: Option<i64>,
    pub price: f64,
    /// Preview served to anyone who does not own the track
    pub free_version: Option<String>,
    /// Media-relative path of the complete track
    pub full_version: Option<String>,
    pub created_at: DateTime<Utc>,

    #[sea_orm(belongs_to, from = "album_id", to = "id")]
    pub album: HasOne<super::album::Entity>,
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
