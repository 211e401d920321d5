use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::ExprTrait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, Set, TransactionError, TransactionTrait,
};
use tracing::instrument;

use crate::database::Database;
use crate::entities;

#[derive(Debug, thiserror::Error)]
pub enum PurchaseError {
    #[error("Payment method not found")]
    PaymentNotFound,
    #[error("Not enough money")]
    NotEnoughMoney,
    #[error("Item already bought")]
    ItemAlreadyBought,
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Something a user can buy with their balance.
#[async_trait]
pub trait Purchasable: Send + Sync {
    fn item_id(&self) -> i64;

    fn price(&self) -> f64;

    async fn is_owned_by<C>(&self, conn: &C, user_id: i64) -> Result<bool, DbErr>
    where
        C: ConnectionTrait + Sync;

    async fn record_purchase<C>(&self, conn: &C, user_id: i64) -> Result<(), DbErr>
    where
        C: ConnectionTrait + Sync;
}

#[async_trait]
impl Purchasable for entities::album::Model {
    fn item_id(&self) -> i64 {
        self.id
    }

    fn price(&self) -> f64 {
        self.price
    }

    async fn is_owned_by<C>(&self, conn: &C, user_id: i64) -> Result<bool, DbErr>
    where
        C: ConnectionTrait + Sync,
    {
        album_bought(conn, user_id, self.id).await
    }

    async fn record_purchase<C>(&self, conn: &C, user_id: i64) -> Result<(), DbErr>
    where
        C: ConnectionTrait + Sync,
    {
        entities::bought_album::ActiveModel {
            user_id: Set(user_id),
            item_id: Set(self.id),
            ..entities::bought_album::ActiveModel::new()
        }
        .insert(conn)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Purchasable for entities::track::Model {
    fn item_id(&self) -> i64 {
        self.id
    }

    fn price(&self) -> f64 {
        self.price
    }

    /// A track is owned when bought on its own or as part of its album.
    async fn is_owned_by<C>(&self, conn: &C, user_id: i64) -> Result<bool, DbErr>
    where
        C: ConnectionTrait + Sync,
    {
        let bought = entities::bought_track::Entity::find()
            .filter(
                Condition::all()
                    .add(entities::bought_track::Column::UserId.eq(user_id))
                    .add(entities::bought_track::Column::ItemId.eq(self.id)),
            )
            .count(conn)
            .await?
            > 0;
        if bought {
            return Ok(true);
        }

        match self.album_id {
            Some(album_id) => album_bought(conn, user_id, album_id).await,
            None => Ok(false),
        }
    }

    async fn record_purchase<C>(&self, conn: &C, user_id: i64) -> Result<(), DbErr>
    where
        C: ConnectionTrait + Sync,
    {
        entities::bought_track::ActiveModel {
            user_id: Set(user_id),
            item_id: Set(self.id),
            ..entities::bought_track::ActiveModel::new()
        }
        .insert(conn)
        .await?;
        Ok(())
    }
}

async fn album_bought<C>(conn: &C, user_id: i64, album_id: i64) -> Result<bool, DbErr>
where
    C: ConnectionTrait,
{
    let count = entities::bought_album::Entity::find()
        .filter(
            Condition::all()
                .add(entities::bought_album::Column::UserId.eq(user_id))
                .add(entities::bought_album::Column::ItemId.eq(album_id)),
        )
        .count(conn)
        .await?;
    Ok(count > 0)
}

/// Everything a user has bought, loaded once to answer ownership questions for many items.
#[derive(Debug, Default, Clone)]
pub struct Ownership {
    albums: HashSet<i64>,
    tracks: HashSet<i64>,
}

impl Ownership {
    pub async fn load<C>(conn: &C, user_id: Option<i64>) -> Result<Self, DbErr>
    where
        C: ConnectionTrait + Sync,
    {
        let Some(user_id) = user_id else {
            return Ok(Self::default());
        };

        let albums = entities::bought_album::Entity::find()
            .filter(entities::bought_album::Column::UserId.eq(user_id))
            .all(conn)
            .await?
            .into_iter()
            .map(|bought| bought.item_id)
            .collect();
        let tracks = entities::bought_track::Entity::find()
            .filter(entities::bought_track::Column::UserId.eq(user_id))
            .all(conn)
            .await?
            .into_iter()
            .map(|bought| bought.item_id)
            .collect();

        Ok(Self { albums, tracks })
    }

    pub fn owns_album(&self, album_id: i64) -> bool {
        self.albums.contains(&album_id)
    }

    pub fn owns_track(&self, track: &entities::track::Model) -> bool {
        self.tracks.contains(&track.id) || track.album_id.is_some_and(|id| self.owns_album(id))
    }
}

pub struct PurchaseService {
    db: Arc<Database>,
}

impl PurchaseService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Buy `item` for the user, paying with `payment_method_id` or, when absent,
    /// the user's default payment method.
    ///
    /// The balance check and the debit are one conditional `UPDATE`, and the debit
    /// and the ownership record commit together.
    #[instrument(skip(self, item), fields(item_id = item.item_id(), price = item.price()))]
    pub async fn buy<I>(
        &self,
        user_id: i64,
        item: &I,
        payment_method_id: Option<i64>,
    ) -> Result<(), PurchaseError>
    where
        I: Purchasable + Clone + 'static,
    {
        let item = item.clone();

        self.db
            .conn
            .transaction::<_, (), PurchaseError>(|txn| {
                Box::pin(async move {
                    let user = entities::user::Entity::find_by_id(user_id)
                        .one(txn)
                        .await?
                        .ok_or(PurchaseError::PaymentNotFound)?;

                    let method_id = payment_method_id
                        .or(user.default_method_id)
                        .ok_or(PurchaseError::PaymentNotFound)?;
                    entities::user_payment_method::Entity::find_by_id((user_id, method_id))
                        .one(txn)
                        .await?
                        .ok_or(PurchaseError::PaymentNotFound)?;

                    if item.is_owned_by(txn, user_id).await? {
                        return Err(PurchaseError::ItemAlreadyBought);
                    }

                    let price = item.price();
                    let debited = entities::user::Entity::update_many()
                        .col_expr(
                            entities::user::Column::Balance,
                            Expr::col(entities::user::Column::Balance).sub(price),
                        )
                        .filter(entities::user::Column::Id.eq(user_id))
                        .filter(entities::user::Column::Balance.gte(price))
                        .exec(txn)
                        .await?;
                    if debited.rows_affected == 0 {
                        return Err(PurchaseError::NotEnoughMoney);
                    }

                    item.record_purchase(txn, user_id).await?;

                    tracing::info!(user_id, payment_method_id = method_id, "Item bought");
                    Ok(())
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(e) => PurchaseError::Database(e),
                TransactionError::Transaction(e) => e,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        insert_album, insert_payment_method, insert_track, insert_user, link_payment_method,
        test_db,
    };

    async fn reload_balance(db: &Database, user_id: i64) -> f64 {
        entities::user::Entity::find_by_id(user_id)
            .one(&db.conn)
            .await
            .unwrap()
            .unwrap()
            .balance
    }

    #[tokio::test]
    async fn test_buy_track_debits_balance() {
        let db = test_db().await;
        let user = insert_user(&db, "ann@example.com", 10.0).await;
        let card = insert_payment_method(&db, "Card").await;
        link_payment_method(&db, user.id, card.id).await;
        let track = insert_track(&db, "Song", 4.0, None).await;

        let service = PurchaseService::new(db.clone());
        service.buy(user.id, &track, Some(card.id)).await.unwrap();

        assert_eq!(reload_balance(&db, user.id).await, 6.0);
        assert!(track.is_owned_by(&db.conn, user.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_buy_fails_when_balance_below_price() {
        let db = test_db().await;
        let user = insert_user(&db, "ann@example.com", 3.0).await;
        let card = insert_payment_method(&db, "Card").await;
        link_payment_method(&db, user.id, card.id).await;
        let track = insert_track(&db, "Song", 4.0, None).await;

        let service = PurchaseService::new(db.clone());
        let result = service.buy(user.id, &track, Some(card.id)).await;

        assert!(matches!(result, Err(PurchaseError::NotEnoughMoney)));
        assert_eq!(reload_balance(&db, user.id).await, 3.0);
        assert!(!track.is_owned_by(&db.conn, user.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_buy_exact_balance_leaves_zero() {
        let db = test_db().await;
        let user = insert_user(&db, "ann@example.com", 4.0).await;
        let card = insert_payment_method(&db, "Card").await;
        link_payment_method(&db, user.id, card.id).await;
        let album = insert_album(&db, "Band", "Record", 4.0).await;

        let service = PurchaseService::new(db.clone());
        service.buy(user.id, &album, Some(card.id)).await.unwrap();

        assert_eq!(reload_balance(&db, user.id).await, 0.0);
    }

    #[tokio::test]
    async fn test_buy_twice_is_rejected() {
        let db = test_db().await;
        let user = insert_user(&db, "ann@example.com", 10.0).await;
        let card = insert_payment_method(&db, "Card").await;
        link_payment_method(&db, user.id, card.id).await;
        let track = insert_track(&db, "Song", 1.0, None).await;

        let service = PurchaseService::new(db.clone());
        service.buy(user.id, &track, Some(card.id)).await.unwrap();
        let result = service.buy(user.id, &track, Some(card.id)).await;

        assert!(matches!(result, Err(PurchaseError::ItemAlreadyBought)));
        assert_eq!(reload_balance(&db, user.id).await, 9.0);
    }

    #[tokio::test]
    async fn test_track_of_bought_album_counts_as_owned() {
        let db = test_db().await;
        let user = insert_user(&db, "ann@example.com", 10.0).await;
        let card = insert_payment_method(&db, "Card").await;
        link_payment_method(&db, user.id, card.id).await;
        let album = insert_album(&db, "Band", "Record", 5.0).await;
        let track = insert_track(&db, "Song", 1.0, Some(album.id)).await;

        let service = PurchaseService::new(db.clone());
        service.buy(user.id, &album, Some(card.id)).await.unwrap();

        let result = service.buy(user.id, &track, Some(card.id)).await;
        assert!(matches!(result, Err(PurchaseError::ItemAlreadyBought)));

        let ownership = Ownership::load(&db.conn, Some(user.id)).await.unwrap();
        assert!(ownership.owns_album(album.id));
        assert!(ownership.owns_track(&track));
    }

    #[tokio::test]
    async fn test_payment_method_must_belong_to_user() {
        let db = test_db().await;
        let user = insert_user(&db, "ann@example.com", 10.0).await;
        let card = insert_payment_method(&db, "Card").await;
        let track = insert_track(&db, "Song", 1.0, None).await;

        let service = PurchaseService::new(db.clone());

        let result = service.buy(user.id, &track, Some(card.id)).await;
        assert!(matches!(result, Err(PurchaseError::PaymentNotFound)));

        let result = service.buy(user.id, &track, None).await;
        assert!(matches!(result, Err(PurchaseError::PaymentNotFound)));
    }

    #[tokio::test]
    async fn test_default_method_is_used_without_payment_id() {
        let db = test_db().await;
        let user = insert_user(&db, "ann@example.com", 10.0).await;
        let card = insert_payment_method(&db, "Card").await;
        link_payment_method(&db, user.id, card.id).await;
        let mut active: entities::user::ActiveModel = user.clone().into();
        active.default_method_id = Set(Some(card.id));
        active.update(&db.conn).await.unwrap();
        let track = insert_track(&db, "Song", 2.5, None).await;

        let service = PurchaseService::new(db.clone());
        service.buy(user.id, &track, None).await.unwrap();

        assert_eq!(reload_balance(&db, user.id).await, 7.5);
    }

    #[tokio::test]
    async fn test_anonymous_ownership_is_empty() {
        let db = test_db().await;
        let track = insert_track(&db, "Song", 1.0, None).await;

        let ownership = Ownership::load(&db.conn, None).await.unwrap();
        assert!(!ownership.owns_track(&track));
    }
}
