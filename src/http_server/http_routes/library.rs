use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};

use crate::http_server::{
    auth::AuthUser,
    error::ApiError,
    responses::{AlbumResponse, LikeResponse, ListenResponse, Page, TrackResponse},
    state::AppState,
};
use crate::services::{
    catalog::CatalogService, pagination::PageRequest, track_activity::TrackActivityService,
};

pub async fn liked(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<LikeResponse>>, ApiError> {
    let likes = TrackActivityService::new(app_state.db.clone())
        .liked(user.id, page)
        .await?;
    Ok(Json(likes.into()))
}

pub async fn listened(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<ListenResponse>>, ApiError> {
    let listens = TrackActivityService::new(app_state.db.clone())
        .listened(user.id, page)
        .await?;
    Ok(Json(listens.into()))
}

pub async fn bought_albums(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<AlbumResponse>>, ApiError> {
    let albums = CatalogService::new(app_state.db.clone())
        .bought_albums(user.id, page)
        .await?;
    Ok(Json(albums.into()))
}

pub async fn bought_tracks(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<TrackResponse>>, ApiError> {
    let tracks = CatalogService::new(app_state.db.clone())
        .bought_tracks(user.id, page)
        .await?;
    Ok(Json(tracks.into()))
}
