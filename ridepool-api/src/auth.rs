use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

use ridepool_core::user::{User, ROLE_USER};

use crate::error::AppError;
use crate::middleware::auth::issue_token;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
    phone_number: String,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<User>, AppError> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_string();
    let phone_number = req.phone_number.trim().to_string();

    if username.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "username, email and password are required".to_string(),
        ));
    }

    if !state.sms.validate_destination(&phone_number).await {
        return Err(AppError::Validation(
            "invalid phone number provided".to_string(),
        ));
    }

    if state.users.username_exists(&username).await? {
        return Err(AppError::Conflict("username is already taken".to_string()));
    }
    if state.users.email_exists(&email).await? {
        return Err(AppError::Conflict("email is already in use".to_string()));
    }

    let user = User {
        id: Uuid::new_v4(),
        username: username.clone(),
        email,
        phone_number: phone_number.clone(),
        password_hash: hash_password(&req.password),
        roles: vec![ROLE_USER.to_string()],
        enabled: true,
        created_at: Utc::now(),
    };
    state.users.create_user(&user).await?;

    info!(username = %username, "user registered");
    state
        .sms
        .send_message(
            &phone_number,
            "Welcome to Ridepool! Your account is now active.",
        )
        .await;

    Ok(Json(user))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = state
        .users
        .find_by_username(req.username.trim())
        .await?
        .ok_or_else(|| AppError::Unauthorized("bad credentials".to_string()))?;

    if !user.enabled || !verify_password(&req.password, &user.password_hash) {
        return Err(AppError::Unauthorized("bad credentials".to_string()));
    }

    let token = issue_token(&state.auth, &user.username, &user.roles)?;
    Ok(Json(AuthResponse { token }))
}

// ============================================================================
// Password digesting
// ============================================================================
//
// Salted SHA-256 in "salt$hex" form. Hashing strength is an external
// concern here; the seam to swap in a KDF is this pair of functions.

fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    let digest = Sha256::digest(format!("{salt}{password}").as_bytes());
    format!("{salt}${digest:x}")
}

fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, expected)) => {
            let digest = Sha256::digest(format!("{salt}{password}").as_bytes());
            format!("{digest:x}") == expected
        }
        None => false,
    }
}
