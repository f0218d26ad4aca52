use std::sync::Arc;

use ridepool_core::booking_service::BookingService;
use ridepool_core::events::EventBus;
use ridepool_core::notify::SmsNotifier;
use ridepool_core::repository::{BookingRepository, RideRepository, UserRepository};
use ridepool_core::ride_service::RideService;
use ridepool_store::app_config::{AdmissionConfig, BusinessRules};

use crate::middleware::blacklist::Blacklist;
use crate::middleware::rate_limit::ClientRateLimiter;

#[derive(Clone)]
pub struct AuthSettings {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub rides: Arc<dyn RideRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub users: Arc<dyn UserRepository>,
    pub booking_svc: Arc<BookingService>,
    pub ride_svc: Arc<RideService>,
    pub sms: Arc<dyn SmsNotifier>,
    pub blacklist: Arc<Blacklist>,
    pub limiter: Arc<ClientRateLimiter>,
    pub events: EventBus,
    pub auth: AuthSettings,
}

impl AppState {
    /// Wire the full state over a single store that implements all three
    /// repository traits (both the memory and the Postgres store do).
    pub fn build<S>(
        store: Arc<S>,
        sms: Arc<dyn SmsNotifier>,
        auth: AuthSettings,
        rules: &BusinessRules,
        admission: &AdmissionConfig,
    ) -> Self
    where
        S: RideRepository + BookingRepository + UserRepository + 'static,
    {
        let rides: Arc<dyn RideRepository> = store.clone();
        let bookings: Arc<dyn BookingRepository> = store.clone();
        let users: Arc<dyn UserRepository> = store;
        let events = EventBus::default();

        let booking_svc = Arc::new(BookingService::new(
            rides.clone(),
            bookings.clone(),
            users.clone(),
            events.clone(),
            rules.cancel_cutoff_minutes,
        ));
        let ride_svc = Arc::new(RideService::new(
            rides.clone(),
            users.clone(),
            events.clone(),
            rules.max_active_rides,
        ));

        Self {
            rides,
            bookings,
            users,
            booking_svc,
            ride_svc,
            sms,
            blacklist: Arc::new(Blacklist::default()),
            limiter: Arc::new(ClientRateLimiter::new(admission.requests_per_minute)),
            events,
            auth,
        }
    }
}
