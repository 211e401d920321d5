use axum::{
    Json,
    body::Body,
    http::{HeaderValue, Response, StatusCode, header},
    response::IntoResponse,
};
use sea_orm::DbErr;
use serde_json::json;

use crate::services::{
    accounts::AccountError, purchase::PurchaseError, track_activity::ActivityError,
};

// A generic error report
// Produced via `Err(some_err).wrap_err("Some context")`
// or `Err(color_eyre::eyre::Report::new(SomeError))`
pub struct Report(color_eyre::Report);

impl std::fmt::Debug for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<E> From<E> for Report
where
    E: Into<color_eyre::Report>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

// Tell axum how to convert `Report` into a response.
// The detail goes to the log, the client only learns that something failed.
impl IntoResponse for Report {
    fn into_response(self) -> Response<Body> {
        tracing::error!("{:?}", self.0);

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "Something went wrong" })),
        )
            .into_response()
    }
}

pub enum ApiError {
    /// Missing or invalid token on an API route
    NotAuthenticated,
    /// Admin pages ask the browser for credentials
    AdminAuthRequired,
    NotFound,
    BadRequest(String),
    Internal(Report),
}

impl std::fmt::Debug for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAuthenticated => f.write_str("NotAuthenticated"),
            Self::AdminAuthRequired => f.write_str("AdminAuthRequired"),
            Self::NotFound => f.write_str("NotFound"),
            Self::BadRequest(message) => f.debug_tuple("BadRequest").field(message).finish(),
            Self::Internal(report) => f.debug_tuple("Internal").field(report).finish(),
        }
    }
}

fn message(status: StatusCode, message: &str) -> Response<Body> {
    (status, Json(json!({ "message": message }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response<Body> {
        match self {
            Self::NotAuthenticated => message(
                StatusCode::FORBIDDEN,
                "Authentication credentials were not provided or are invalid",
            ),
            Self::AdminAuthRequired => {
                let mut response =
                    (StatusCode::UNAUTHORIZED, "Staff login required").into_response();
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static(r#"Basic realm="music-store admin""#),
                );
                response
            }
            Self::NotFound => message(StatusCode::NOT_FOUND, "Not found"),
            Self::BadRequest(text) => message(StatusCode::BAD_REQUEST, &text),
            Self::Internal(report) => report.into_response(),
        }
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        Self::Internal(err.into())
    }
}

impl From<color_eyre::Report> for ApiError {
    fn from(err: color_eyre::Report) -> Self {
        Self::Internal(err.into())
    }
}

impl From<PurchaseError> for ApiError {
    fn from(err: PurchaseError) -> Self {
        match err {
            PurchaseError::Database(e) => e.into(),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Database(e) => e.into(),
            AccountError::UserNotFound(_) => Self::NotFound,
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<ActivityError> for ApiError {
    fn from(err: ActivityError) -> Self {
        match err {
            ActivityError::TrackNotFound(_) => Self::NotFound,
            ActivityError::Database(e) => e.into(),
        }
    }
}
