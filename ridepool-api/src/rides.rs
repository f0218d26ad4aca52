use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use ridepool_core::ride::{CreateRideRequest, Ride};

use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    start: String,
    #[serde(default)]
    destination: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/rides", post(create_ride))
        .route("/api/rides/search", get(search_rides))
        .route("/api/rides/mine", get(my_rides))
        .route("/api/rides/{id}", get(get_ride))
}

async fn create_ride(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<CreateRideRequest>,
) -> Result<Json<Ride>, AppError> {
    let driver = ctx.require_user()?;
    let ride = state.ride_svc.create_ride(req, driver).await?;
    Ok(Json(ride))
}

async fn search_rides(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Ride>>, AppError> {
    let rides = state
        .ride_svc
        .search(&params.start, &params.destination)
        .await?;
    Ok(Json(rides))
}

async fn my_rides(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<Vec<Ride>>, AppError> {
    let driver = ctx.require_user()?;
    let rides = state.ride_svc.by_driver(driver).await?;
    Ok(Json(rides))
}

async fn get_ride(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    let ride = state.ride_svc.get(id).await?;
    Ok(Json(ride))
}
