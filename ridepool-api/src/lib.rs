use axum::{http::Method, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod error;
pub mod events;
pub mod middleware;
pub mod rides;
pub mod state;

pub use state::AppState;

/// Build the router. Admission gates wrap everything in strict order:
/// blacklist first, then the rate limiter, then identity annotation.
/// A blocked client never touches a token bucket, and a rate-limited
/// request never reaches credential parsing or business logic.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    // Layers run outermost-last: the blacklist gate is added last so it is
    // the first thing an inbound request meets.
    Router::new()
        .merge(auth::routes())
        .merge(rides::routes())
        .merge(bookings::routes())
        .merge(admin::routes())
        .merge(events::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::annotate_identity,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit_gate,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::blacklist::blacklist_gate,
        ))
        .with_state(state)
}
