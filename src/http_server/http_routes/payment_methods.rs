use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::http_server::{
    auth::AuthUser,
    error::ApiError,
    responses::{Page, PaymentMethodResponse},
    state::AppState,
};
use crate::services::{
    pagination::PageRequest,
    payment_methods::{NewUserPaymentMethod, PaymentMethodService},
};

/// Either an existing method to link by `id`, or a `title` for a new one.
#[derive(Debug, Deserialize)]
pub struct AddPaymentMethod {
    id: Option<i64>,
    title: Option<String>,
}

pub async fn list_payment_methods(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<PaymentMethodResponse>>, ApiError> {
    let methods = PaymentMethodService::new(app_state.db.clone())
        .list_for_user(user.id, page)
        .await?;
    Ok(Json(methods.into()))
}

pub async fn add_payment_method(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(input): Json<AddPaymentMethod>,
) -> Result<(StatusCode, Json<PaymentMethodResponse>), ApiError> {
    let request = match (input.id, input.title) {
        (Some(id), _) => NewUserPaymentMethod::Existing(id),
        (None, Some(title)) => NewUserPaymentMethod::Titled(title),
        (None, None) => {
            return Err(ApiError::BadRequest(
                "Either id or title is required".to_string(),
            ));
        }
    };

    let method = PaymentMethodService::new(app_state.db.clone())
        .add_for_user(user.id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(method.into())))
}

pub async fn get_payment_method(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(payment_method_id): Path<i64>,
) -> Result<Json<PaymentMethodResponse>, ApiError> {
    let method = PaymentMethodService::new(app_state.db.clone())
        .get_for_user(user.id, payment_method_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(method.into()))
}

pub async fn remove_payment_method(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(payment_method_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let removed = PaymentMethodService::new(app_state.db.clone())
        .remove_for_user(user.id, payment_method_id)
        .await?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
