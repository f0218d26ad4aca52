use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use ridepool_core::user::ROLE_ADMIN;

use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct BlockRequest {
    client: String,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    users: u64,
    rides: u64,
    bookings: u64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/blacklist", get(list_blacklist).post(block_client))
        .route("/api/admin/blacklist/{client}", delete(unblock_client))
        .route("/api/admin/users/{id}/toggle", post(toggle_user))
        .route("/api/admin/stats", get(stats))
        .route("/api/admin/rides/{id}", delete(delete_ride))
}

async fn list_blacklist(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<Vec<String>>, AppError> {
    ctx.require_role(ROLE_ADMIN)?;
    Ok(Json(state.blacklist.entries()))
}

async fn block_client(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<BlockRequest>,
) -> Result<StatusCode, AppError> {
    let admin = ctx.require_role(ROLE_ADMIN)?;
    state.blacklist.block(&req.client);
    info!(admin = %admin, client = %req.client, "client blacklisted");
    Ok(StatusCode::CREATED)
}

async fn unblock_client(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(client): Path<String>,
) -> Result<StatusCode, AppError> {
    let admin = ctx.require_role(ROLE_ADMIN)?;
    if !state.blacklist.unblock(&client) {
        return Err(AppError::NotFound(format!(
            "client {client} is not blacklisted"
        )));
    }
    info!(admin = %admin, client = %client, "client removed from blacklist");
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let admin = ctx.require_role(ROLE_ADMIN)?;

    let user = state
        .users
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))?;
    let enabled = !user.enabled;
    state.users.set_enabled(id, enabled).await?;

    info!(admin = %admin, user = %user.username, enabled, "user toggled");
    Ok(Json(json!({ "username": user.username, "enabled": enabled })))
}

async fn stats(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<StatsResponse>, AppError> {
    ctx.require_role(ROLE_ADMIN)?;
    Ok(Json(StatsResponse {
        users: state.users.count_users().await?,
        rides: state.rides.count_rides().await?,
        bookings: state.bookings.count_bookings().await?,
    }))
}

async fn delete_ride(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ctx.require_role(ROLE_ADMIN)?;
    state.ride_svc.admin_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
