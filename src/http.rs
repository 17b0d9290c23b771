use crate::appointment_manager::{AppointmentManager, BookingError};
use crate::auth::{AuthError, TokenVerifier, VerifiedToken};
use crate::backend::AppointmentBackend;
use crate::configuration::Configuration;
use crate::error::ApiError;
use crate::types::{parse_iso_date, Appointment};
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderValue, Method};
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use axum_valid::{Valid, ValidRejection, ValidationRejection};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::spawn_blocking;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

#[derive(Clone)]
pub struct AppState<T: AppointmentBackend> {
    appointment_manager: AppointmentManager<T>,
    token_verifier: Arc<TokenVerifier>,
}

#[derive(Debug, Clone, Deserialize)]
struct DateQuery {
    date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: u64,
}

/// Identity of the caller, taken from a verified bearer token.
pub struct Authenticated(pub VerifiedToken);

impl<T: AppointmentBackend> FromRequestParts<AppState<T>> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<T>,
    ) -> Result<Self, Self::Rejection> {
        let authorization = parts
            .headers
            .get(AUTHORIZATION)
            .map(|value| value.to_str().map_err(|_| AuthError::MalformedToken))
            .transpose()?;

        let token = state.token_verifier.verify(authorization).map_err(|err| {
            warn!(%err, "Rejected request");
            err
        })?;
        Ok(Self(token))
    }
}

pub fn create_app<T: AppointmentBackend, C: Configuration>(
    backend: T,
    token_verifier: TokenVerifier,
    configuration: &C,
) -> Router {
    let state = AppState {
        appointment_manager: AppointmentManager::new(backend, configuration.daily_limit()),
        token_verifier: Arc::new(token_verifier),
    };

    Router::new()
        .route(
            "/api/appointments",
            get(get_appointments::<T>)
                .post(create_appointment::<T>)
                .delete(delete_appointment::<T>),
        )
        .with_state(state)
        .layer(cors_layer(&configuration.cors_origins()))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if origins.trim() == "*" {
        return cors.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();
    cors.allow_origin(origins)
}

fn malformed_body(rejection: ValidRejection<JsonRejection>) -> ApiError {
    match rejection {
        ValidationRejection::Valid(errors) => ApiError::BadRequest(errors.to_string()),
        ValidationRejection::Inner(rejection) => ApiError::BadRequest(rejection.body_text()),
    }
}

/// Runs a manager call on the blocking pool, the diesel store holds a
/// synchronous connection for the whole call.
async fn run_blocking<T, R, F>(manager: &AppointmentManager<T>, operation: F) -> Result<R, ApiError>
where
    T: AppointmentBackend,
    R: Send + 'static,
    F: FnOnce(AppointmentManager<T>) -> Result<R, BookingError> + Send + 'static,
{
    let manager = manager.clone();
    Ok(spawn_blocking(move || operation(manager)).await??)
}

async fn get_appointments<T: AppointmentBackend>(
    State(state): State<AppState<T>>,
    Authenticated(_): Authenticated,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let date = query
        .date
        .ok_or_else(|| ApiError::BadRequest("Missing date parameter".into()))?;
    let date = parse_iso_date(&date)
        .ok_or_else(|| ApiError::BadRequest("Invalid date parameter, ISO-8601 expected".into()))?;

    let appointments =
        run_blocking(&state.appointment_manager, move |manager| manager.appointments(date)).await?;
    Ok(Json(appointments))
}

async fn create_appointment<T: AppointmentBackend>(
    State(state): State<AppState<T>>,
    Authenticated(token): Authenticated,
    payload: Result<Valid<Json<Appointment>>, ValidRejection<JsonRejection>>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let Valid(Json(appointment)) = payload.map_err(malformed_body)?;
    let created = run_blocking(&state.appointment_manager, move |manager| {
        manager.book(&token, appointment)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn delete_appointment<T: AppointmentBackend>(
    State(state): State<AppState<T>>,
    Authenticated(token): Authenticated,
    payload: Result<Valid<Json<Appointment>>, ValidRejection<JsonRejection>>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let Valid(Json(appointment)) = payload.map_err(malformed_body)?;
    let deleted = run_blocking(&state.appointment_manager, move |manager| {
        manager.cancel(&token, appointment)
    })
    .await?;
    Ok(Json(DeleteResponse { deleted }))
}
