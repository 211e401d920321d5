use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::http_server::{
    auth::{AuthUser, MaybeUser},
    error::ApiError,
    http_routes::BuyParams,
    responses::{Message, Page, TrackResponse},
    state::AppState,
};
use crate::services::{
    catalog::CatalogService,
    pagination::PageRequest,
    purchase::PurchaseService,
    track_activity::{LikeOutcome, TrackActivityService, UnlikeOutcome},
};

pub async fn list_tracks(
    State(app_state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<TrackResponse>>, ApiError> {
    let tracks = CatalogService::new(app_state.db.clone())
        .list_tracks(viewer.id(), page)
        .await?;
    Ok(Json(tracks.into()))
}

pub async fn get_track(
    State(app_state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Path(track_id): Path<i64>,
) -> Result<Json<TrackResponse>, ApiError> {
    let track = CatalogService::new(app_state.db.clone())
        .get_track(viewer.id(), track_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(track.into()))
}

pub async fn buy_track(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(track_id): Path<i64>,
    Query(params): Query<BuyParams>,
) -> Result<Json<Message>, ApiError> {
    let track = CatalogService::new(app_state.db.clone())
        .get_track(Some(user.id), track_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    PurchaseService::new(app_state.db.clone())
        .buy(user.id, &track.track, params.payment_id)
        .await?;

    Ok(Json(Message::new("Track bought")))
}

pub async fn like_track(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(track_id): Path<i64>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let outcome = TrackActivityService::new(app_state.db.clone())
        .like(user.id, track_id)
        .await?;

    Ok(match outcome {
        LikeOutcome::Created => (
            StatusCode::CREATED,
            Json(Message::new("You liked track! Great!")),
        ),
        LikeOutcome::AlreadyLiked => (
            StatusCode::OK,
            Json(Message::new("You already liked this track")),
        ),
    })
}

pub async fn unlike_track(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(track_id): Path<i64>,
) -> Result<Response, ApiError> {
    let outcome = TrackActivityService::new(app_state.db.clone())
        .unlike(user.id, track_id)
        .await?;

    Ok(match outcome {
        UnlikeOutcome::Removed => (
            StatusCode::OK,
            Json(Message::new("You disliked track! SAD!")),
        )
            .into_response(),
        // 204 carries no body
        UnlikeOutcome::NotLiked => StatusCode::NO_CONTENT.into_response(),
    })
}

pub async fn listen_track(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(track_id): Path<i64>,
) -> Result<Json<Message>, ApiError> {
    TrackActivityService::new(app_state.db.clone())
        .listen(user.id, track_id)
        .await?;
    Ok(Json(Message::new("Yeah! Music!")))
}
