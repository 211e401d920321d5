use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::http_server::{
    auth::MaybeUser, error::ApiError, responses::SearchResponse, state::AppState,
};
use crate::services::catalog::CatalogService;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
}

pub async fn search(
    State(app_state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let results = CatalogService::new(app_state.db.clone())
        .search(viewer.id(), &params.q)
        .await?;

    Ok(Json(SearchResponse {
        albums: results.albums.into_iter().map(Into::into).collect(),
        tracks: results.tracks.into_iter().map(Into::into).collect(),
    }))
}
