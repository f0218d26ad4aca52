#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use ridepool_api::state::AuthSettings;
use ridepool_api::AppState;
use ridepool_core::booking_service::BookingService;
use ridepool_core::events::EventBus;
use ridepool_core::notify::MockSmsNotifier;
use ridepool_core::repository::{RideRepository, UserRepository};
use ridepool_core::ride::Ride;
use ridepool_core::user::{User, ROLE_ADMIN, ROLE_USER};
use ridepool_store::app_config::{AdmissionConfig, BusinessRules};
use ridepool_store::MemoryStore;

pub fn auth_settings() -> AuthSettings {
    AuthSettings {
        secret: "integration-test-secret-key".to_string(),
        issuer: "ridepool-api".to_string(),
        audience: "ridepool-clients".to_string(),
        ttl_minutes: 30,
    }
}

pub fn business_rules() -> BusinessRules {
    BusinessRules {
        max_active_rides: 5,
        cancel_cutoff_minutes: 10,
        reminder_window_minutes: 60,
        reminder_period_seconds: 60,
    }
}

/// Full state over a fresh in-memory store and recording notifier.
pub fn build_state(
    requests_per_minute: u32,
) -> (AppState, Arc<MemoryStore>, Arc<MockSmsNotifier>) {
    let store = Arc::new(MemoryStore::new());
    let sms = Arc::new(MockSmsNotifier::new());
    let state = AppState::build(
        store.clone(),
        sms.clone(),
        auth_settings(),
        &business_rules(),
        &AdmissionConfig {
            requests_per_minute,
        },
    );
    (state, store, sms)
}

/// Booking coordinator wired directly over a store, for service-level
/// tests that do not need the HTTP surface.
pub fn booking_service(store: &Arc<MemoryStore>, cutoff_minutes: i64) -> BookingService {
    BookingService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        EventBus::default(),
        cutoff_minutes,
    )
}

pub async fn seed_user(store: &Arc<MemoryStore>, username: &str) -> User {
    seed_user_with_roles(store, username, vec![ROLE_USER.to_string()]).await
}

pub async fn seed_admin(store: &Arc<MemoryStore>, username: &str) -> User {
    seed_user_with_roles(
        store,
        username,
        vec![ROLE_USER.to_string(), ROLE_ADMIN.to_string()],
    )
    .await
}

async fn seed_user_with_roles(
    store: &Arc<MemoryStore>,
    username: &str,
    roles: Vec<String>,
) -> User {
    let user = User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: format!("{username}@example.test"),
        phone_number: "+306971234567".to_string(),
        password_hash: "unused$unused".to_string(),
        roles,
        enabled: true,
        created_at: Utc::now(),
    };
    store.create_user(&user).await.unwrap();
    user
}

pub async fn seed_ride(
    store: &Arc<MemoryStore>,
    driver: &str,
    seats: i32,
    departs_at: DateTime<Utc>,
) -> Ride {
    let ride = Ride {
        id: Uuid::new_v4(),
        start_location: "Athens".to_string(),
        destination: "Thessaloniki".to_string(),
        departure_time: departs_at,
        available_seats: seats,
        driver_username: driver.to_string(),
        created_at: Utc::now(),
    };
    store.create_ride(&ride).await.unwrap();
    ride
}

pub fn in_minutes(minutes: i64) -> DateTime<Utc> {
    Utc::now() + Duration::minutes(minutes)
}
