use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::http_server::{
    auth::{AuthUser, MaybeUser},
    error::ApiError,
    http_routes::BuyParams,
    responses::{AlbumResponse, Message, Page},
    state::AppState,
};
use crate::services::{
    catalog::CatalogService, pagination::PageRequest, purchase::PurchaseService,
};

pub async fn list_albums(
    State(app_state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<AlbumResponse>>, ApiError> {
    let albums = CatalogService::new(app_state.db.clone())
        .list_albums(viewer.id(), page)
        .await?;
    Ok(Json(albums.into()))
}

pub async fn get_album(
    State(app_state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Path(album_id): Path<i64>,
) -> Result<Json<AlbumResponse>, ApiError> {
    let album = CatalogService::new(app_state.db.clone())
        .get_album(viewer.id(), album_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(album.into()))
}

pub async fn buy_album(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(album_id): Path<i64>,
    Query(params): Query<BuyParams>,
) -> Result<Json<Message>, ApiError> {
    let album = CatalogService::new(app_state.db.clone())
        .get_album(Some(user.id), album_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    PurchaseService::new(app_state.db.clone())
        .buy(user.id, &album.album, params.payment_id)
        .await?;

    Ok(Json(Message::new("Album bought")))
}
