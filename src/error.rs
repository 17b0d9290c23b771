use crate::appointment_manager::BookingError;
use crate::auth::AuthError;
use crate::backend::BackendError;
use axum::{
    http::{header::WWW_AUTHENTICATE, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Authentication(#[from] AuthError),
    #[error(transparent)]
    Booking(#[from] BookingError),
    #[error("{0}")]
    BadRequest(String),
    #[error("Request handling failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Booking(err) => match err {
                BookingError::MissingUser => StatusCode::BAD_REQUEST,
                BookingError::CreateForOtherRoom { .. }
                | BookingError::DeleteForOtherRoom { .. } => StatusCode::FORBIDDEN,
                BookingError::SlotTaken | BookingError::DailyLimitReached => StatusCode::CONFLICT,
                BookingError::Backend(BackendError::UnknownMachine(_)) => StatusCode::BAD_REQUEST,
                BookingError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(err = %self, "Request failed");
        }

        let message = match &self {
            ApiError::Booking(BookingError::Backend(BackendError::Database(_))) => {
                "Database error".to_string()
            }
            ApiError::Worker(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        match self {
            ApiError::Authentication(AuthError::MalformedToken) => {
                (status, [(WWW_AUTHENTICATE, "Bearer")], message).into_response()
            }
            _ => (status, message).into_response(),
        }
    }
}
