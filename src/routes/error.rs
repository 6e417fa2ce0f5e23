//! Service error → HTTP response translation.
//!
//! Every handler returns `Result<_, ApiError>`. Not-found maps to 404,
//! validation to 400, storage failures to 500. The body is always
//! `{"detail": "..."}`; storage details are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use tracing::error;

use crate::services::item::ItemError;
use crate::services::my_list::MyListError;

const INTERNAL_DETAIL: &str = "internal server error";

#[derive(Debug)]
pub struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) detail: String,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self { status, detail: detail.into() }
    }

    fn internal(err: &sqlx::Error) -> Self {
        error!(error = %err, "database operation failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_DETAIL)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "detail": self.detail }))).into_response()
    }
}

impl From<ItemError> for ApiError {
    fn from(err: ItemError) -> Self {
        match err {
            ItemError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, "Item not found"),
            ItemError::Validation(field) => Self::new(StatusCode::BAD_REQUEST, field.to_string()),
            ItemError::Database(e) => Self::internal(&e),
        }
    }
}

impl From<MyListError> for ApiError {
    fn from(err: MyListError) -> Self {
        match err {
            MyListError::ListNotFound(_) => Self::new(StatusCode::NOT_FOUND, "List not found"),
            MyListError::LocationNotFound { .. } => Self::new(StatusCode::NOT_FOUND, "Location not found"),
            MyListError::Validation(field) => Self::new(StatusCode::BAD_REQUEST, field.to_string()),
            MyListError::Database(e) => Self::internal(&e),
        }
    }
}
