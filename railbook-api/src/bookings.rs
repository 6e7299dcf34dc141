use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use railbook_core::{Booking, BookingStatus};

use crate::error::AppError;
use crate::middleware::{auth_middleware, Claims};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub train_id: Uuid,
    pub seat_count: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookingRequest {
    pub status: String,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/bookings", get(list_bookings).post(create_booking))
        .route("/api/bookings/{id}", put(update_booking))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// POST /api/bookings
async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let actor = claims.actor()?;
    let booking = state
        .reservations
        .create_booking(actor, req.train_id, req.seat_count)
        .await?;

    Ok((StatusCode::CREATED, Json(booking)))
}

/// GET /api/bookings — own bookings, or all bookings for admins
async fn list_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let actor = claims.actor()?;
    let bookings = state.reservations.list_bookings(actor).await?;
    Ok(Json(bookings))
}

/// PUT /api/bookings/:id — status transition; only cancellation is supported
async fn update_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    let actor = claims.actor()?;

    match BookingStatus::parse(&req.status) {
        Some(BookingStatus::Cancelled) => {
            let booking = state.reservations.cancel_booking(actor, id).await?;
            Ok(Json(booking))
        }
        Some(other) => Err(AppError::ValidationError(format!(
            "unsupported status transition target: {other}"
        ))),
        None => Err(AppError::ValidationError(format!(
            "unknown booking status: {}",
            req.status
        ))),
    }
}
