use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use ridepool_core::booking::Booking;

use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct BookingResponse {
    booking_id: Uuid,
    ride_id: Uuid,
    status: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/rides/{ride_id}/bookings", post(book_ride))
        .route("/api/bookings/mine", get(my_bookings))
        .route("/api/bookings/{id}/cancel", post(cancel_booking))
}

async fn book_ride(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(ride_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let passenger = ctx.require_user()?;
    let booking = state.booking_svc.book_ride(ride_id, passenger).await?;
    Ok(Json(BookingResponse {
        booking_id: booking.id,
        ride_id: booking.ride_id,
        status: booking.status.to_string(),
    }))
}

async fn my_bookings(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let passenger = ctx.require_user()?;
    let bookings = state.booking_svc.my_bookings(passenger).await?;
    Ok(Json(bookings))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let passenger = ctx.require_user()?;
    state.booking_svc.cancel_booking(id, passenger).await?;
    Ok(Json(json!({ "status": "cancelled" })))
}
