use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{
        Authorization,
        authorization::{Basic, Bearer},
    },
};

use crate::entities;
use crate::http_server::{error::ApiError, state::AppState};
use crate::services::accounts::AccountService;

/// A request carrying a valid API token.
pub struct AuthUser(pub entities::user::Model);

/// Anonymous or authenticated. A token that is presented but unknown is still rejected.
pub struct MaybeUser(pub Option<entities::user::Model>);

/// A staff member, authenticated with HTTP Basic (email and API token) or a bearer token.
pub struct StaffUser(pub entities::user::Model);

impl MaybeUser {
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|user| user.id)
    }
}

async fn bearer_user(
    parts: &mut Parts,
    state: &Arc<AppState>,
) -> Result<Option<entities::user::Model>, ApiError> {
    let Ok(TypedHeader(Authorization(bearer))) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await
    else {
        return Ok(None);
    };

    let user = AccountService::new(state.db.clone())
        .find_by_token(bearer.token())
        .await?
        .filter(|user| user.is_active);

    match user {
        Some(user) => Ok(Some(user)),
        None => Err(ApiError::NotAuthenticated),
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        bearer_user(parts, state)
            .await?
            .map(AuthUser)
            .ok_or(ApiError::NotAuthenticated)
    }
}

impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(bearer_user(parts, state).await?))
    }
}

impl FromRequestParts<Arc<AppState>> for StaffUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let accounts = AccountService::new(state.db.clone());

        let user = if let Ok(TypedHeader(Authorization(basic))) =
            TypedHeader::<Authorization<Basic>>::from_request_parts(parts, state).await
        {
            accounts
                .find_by_token(basic.password())
                .await?
                .filter(|user| user.email == basic.username())
        } else {
            match bearer_user(parts, state).await {
                Ok(user) => user,
                Err(ApiError::NotAuthenticated) => None,
                Err(e) => return Err(e),
            }
        };

        match user {
            Some(user) if user.is_active && user.is_staff => Ok(StaffUser(user)),
            Some(user) => {
                tracing::warn!(user_id = user.id, "Non-staff user tried to reach admin");
                Err(ApiError::AdminAuthRequired)
            }
            None => Err(ApiError::AdminAuthRequired),
        }
    }
}
