use sea_orm::entity::prelude::*;

/// Links a user to a payment method they have used.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "user_payment_methods")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub payment_method_id: i64,

    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,
    #[sea_orm(belongs_to, from = "payment_method_id", to = "id")]
    pub payment_method: HasOne<super::payment_method::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
