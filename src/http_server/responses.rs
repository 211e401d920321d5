use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entities;
use crate::services::accounts::AccountView;
use crate::services::catalog::{AlbumView, TrackView};
use crate::services::pagination::PaginatedResult;

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub page: u64,
    pub page_size: u64,
    pub results: Vec<T>,
}

impl<T, U> From<PaginatedResult<U>> for Page<T>
where
    U: Into<T>,
{
    fn from(result: PaginatedResult<U>) -> Self {
        Self {
            count: result.total_count,
            page: result.page,
            page_size: result.page_size,
            results: result.items.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AlbumResponse {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub image: Option<String>,
    pub price: f64,
    pub tracks: Vec<i64>,
    pub is_bought: bool,
    pub created_at: DateTime<Utc>,
}

impl From<AlbumView> for AlbumResponse {
    fn from(view: AlbumView) -> Self {
        Self {
            id: view.album.id,
            title: view.album.title,
            author: view.album.author,
            image: view.album.image,
            price: view.album.price,
            tracks: view.track_ids,
            is_bought: view.is_bought,
            created_at: view.album.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub album: Option<i64>,
    pub price: f64,
    /// Full version for owners, free preview otherwise
    pub content: Option<String>,
    pub is_bought: bool,
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
}

impl From<TrackView> for TrackResponse {
    fn from(view: TrackView) -> Self {
        let content = view.content().map(str::to_string);
        Self {
            id: view.track.id,
            title: view.track.title,
            author: view.track.author,
            album: view.track.album_id,
            price: view.track.price,
            content,
            is_bought: view.is_bought,
            is_liked: view.is_liked,
            created_at: view.track.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub id: i64,
    pub user: i64,
    pub track: i64,
    pub like_time: DateTime<Utc>,
}

impl From<entities::like_track::Model> for LikeResponse {
    fn from(like: entities::like_track::Model) -> Self {
        Self {
            id: like.id,
            user: like.user_id,
            track: like.track_id,
            like_time: like.like_time,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListenResponse {
    pub id: i64,
    pub user: i64,
    pub track: i64,
    pub listen_time: DateTime<Utc>,
}

impl From<entities::listen_track::Model> for ListenResponse {
    fn from(listen: entities::listen_track::Model) -> Self {
        Self {
            id: listen.id,
            user: listen.user_id,
            track: listen.track_id,
            listen_time: listen.listen_time,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentMethodResponse {
    pub id: i64,
    pub title: String,
}

impl From<entities::payment_method::Model> for PaymentMethodResponse {
    fn from(method: entities::payment_method::Model) -> Self {
        Self {
            id: method.id,
            title: method.title,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub balance: f64,
    pub methods_used: Vec<PaymentMethodResponse>,
    pub default_method: Option<i64>,
}

impl From<AccountView> for AccountResponse {
    fn from(view: AccountView) -> Self {
        Self {
            id: view.user.id,
            username: view.user.username,
            email: view.user.email,
            balance: view.user.balance,
            methods_used: view.methods_used.into_iter().map(Into::into).collect(),
            default_method: view.user.default_method_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub albums: Vec<AlbumResponse>,
    pub tracks: Vec<TrackResponse>,
}
