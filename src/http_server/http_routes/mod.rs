use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use serde::Deserialize;

use crate::http_server::state::AppState;

pub mod account;
pub mod admin;
pub mod albums;
pub mod library;
pub mod payment_methods;
pub mod search;
pub mod tracks;

#[derive(Debug, Default, Deserialize)]
pub struct BuyParams {
    pub payment_id: Option<i64>,
}

/// JSON API, mounted under `/api/v1/music_store`
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/albums", get(albums::list_albums))
        .route("/albums/{id}", get(albums::get_album))
        .route("/albums/{id}/buy", post(albums::buy_album))
        .route("/tracks", get(tracks::list_tracks))
        .route("/tracks/{id}", get(tracks::get_track))
        .route("/tracks/{id}/buy", post(tracks::buy_track))
        .route(
            "/tracks/{id}/like",
            post(tracks::like_track).delete(tracks::unlike_track),
        )
        .route("/tracks/{id}/listen", post(tracks::listen_track))
        .route("/liked", get(library::liked))
        .route("/listened", get(library::listened))
        .route("/bought_albums", get(library::bought_albums))
        .route("/bought_tracks", get(library::bought_tracks))
        .route(
            "/payment_methods",
            get(payment_methods::list_payment_methods).post(payment_methods::add_payment_method),
        )
        .route(
            "/payment_methods/{id}",
            get(payment_methods::get_payment_method)
                .delete(payment_methods::remove_payment_method),
        )
        .route(
            "/account",
            get(account::get_account)
                .put(account::put_account)
                .patch(account::patch_account),
        )
        .route("/search", get(search::search))
}

/// Server-rendered staff pages
pub fn admin_routes(upload_limit_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/upload",
            get(admin::upload_form)
                .post(admin::upload_archive)
                .layer(DefaultBodyLimit::max(upload_limit_bytes)),
        )
        .route("/albums", get(admin::album_table))
}
