use std::sync::Arc;

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use tracing::instrument;

use crate::database::Database;
use crate::entities;
use crate::services::pagination::{PageRequest, PaginatedResult, fetch_page};

#[derive(Debug, thiserror::Error)]
pub enum ActivityError {
    #[error("Track {0} not found")]
    TrackNotFound(i64),
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    Created,
    AlreadyLiked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlikeOutcome {
    Removed,
    NotLiked,
}

pub struct TrackActivityService {
    db: Arc<Database>,
}

impl TrackActivityService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn like(&self, user_id: i64, track_id: i64) -> Result<LikeOutcome, ActivityError> {
        self.ensure_track(track_id).await?;

        if self.find_like(user_id, track_id).await?.is_some() {
            return Ok(LikeOutcome::AlreadyLiked);
        }

        let inserted = entities::like_track::ActiveModel {
            user_id: Set(user_id),
            track_id: Set(track_id),
            ..entities::like_track::ActiveModel::new()
        }
        .insert(&self.db.conn)
        .await;

        match inserted {
            Ok(_) => Ok(LikeOutcome::Created),
            // A concurrent like won the unique index
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(LikeOutcome::AlreadyLiked)
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    pub async fn unlike(
        &self,
        user_id: i64,
        track_id: i64,
    ) -> Result<UnlikeOutcome, ActivityError> {
        self.ensure_track(track_id).await?;

        let Some(like) = self.find_like(user_id, track_id).await? else {
            return Ok(UnlikeOutcome::NotLiked);
        };

        let deleted = entities::like_track::Entity::delete_by_id(like.id)
            .exec(&self.db.conn)
            .await?;

        if deleted.rows_affected == 0 {
            Ok(UnlikeOutcome::NotLiked)
        } else {
            Ok(UnlikeOutcome::Removed)
        }
    }

    /// Record one listen. Every call adds a record.
    #[instrument(skip(self))]
    pub async fn listen(
        &self,
        user_id: i64,
        track_id: i64,
    ) -> Result<entities::listen_track::Model, ActivityError> {
        self.ensure_track(track_id).await?;

        let listen = entities::listen_track::ActiveModel {
            user_id: Set(user_id),
            track_id: Set(track_id),
            ..entities::listen_track::ActiveModel::new()
        }
        .insert(&self.db.conn)
        .await?;

        Ok(listen)
    }

    /// The user's likes, newest first.
    pub async fn liked(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> Result<PaginatedResult<entities::like_track::Model>, DbErr> {
        let query = entities::like_track::Entity::find()
            .filter(entities::like_track::Column::UserId.eq(user_id))
            .order_by_desc(entities::like_track::Column::LikeTime)
            .order_by_desc(entities::like_track::Column::Id);
        fetch_page(query, &self.db.conn, page).await
    }

    /// The user's listens, newest first.
    pub async fn listened(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> Result<PaginatedResult<entities::listen_track::Model>, DbErr> {
        let query = entities::listen_track::Entity::find()
            .filter(entities::listen_track::Column::UserId.eq(user_id))
            .order_by_desc(entities::listen_track::Column::ListenTime)
            .order_by_desc(entities::listen_track::Column::Id);
        fetch_page(query, &self.db.conn, page).await
    }

    async fn ensure_track(&self, track_id: i64) -> Result<(), ActivityError> {
        entities::track::Entity::find_by_id(track_id)
            .one(&self.db.conn)
            .await?
            .map(|_| ())
            .ok_or(ActivityError::TrackNotFound(track_id))
    }

    async fn find_like(
        &self,
        user_id: i64,
        track_id: i64,
    ) -> Result<Option<entities::like_track::Model>, DbErr> {
        entities::like_track::Entity::find()
            .filter(
                Condition::all()
                    .add(entities::like_track::Column::UserId.eq(user_id))
                    .add(entities::like_track::Column::TrackId.eq(track_id)),
            )
            .one(&self.db.conn)
            .await
    }
}
