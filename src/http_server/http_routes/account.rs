use std::sync::Arc;

use axum::{Json, extract::State};
use serde::{Deserialize, Deserializer};

use crate::http_server::{
    auth::AuthUser, error::ApiError, responses::AccountResponse, state::AppState,
};
use crate::services::accounts::AccountService;

/// Writable account fields. Everything else, balance included, is ignored.
#[derive(Debug, Deserialize)]
pub struct AccountUpdate {
    /// `None` when the field is absent, `Some(None)` when it is explicitly null
    #[serde(default, deserialize_with = "present")]
    default_method: Option<Option<i64>>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

pub async fn get_account(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = AccountService::new(app_state.db.clone())
        .account(user)
        .await?;
    Ok(Json(account.into()))
}

pub async fn put_account(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(update): Json<AccountUpdate>,
) -> Result<Json<AccountResponse>, ApiError> {
    let default_method = update
        .default_method
        .ok_or_else(|| ApiError::BadRequest("default_method is required".to_string()))?;

    let account = AccountService::new(app_state.db.clone())
        .set_default_method(user, default_method)
        .await?;
    Ok(Json(account.into()))
}

pub async fn patch_account(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(update): Json<AccountUpdate>,
) -> Result<Json<AccountResponse>, ApiError> {
    let accounts = AccountService::new(app_state.db.clone());
    let account = match update.default_method {
        Some(default_method) => accounts.set_default_method(user, default_method).await?,
        None => accounts.account(user).await?,
    };
    Ok(Json(account.into()))
}
