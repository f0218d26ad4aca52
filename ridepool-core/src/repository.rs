use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::booking::Booking;
use crate::ride::Ride;
use crate::user::User;
use crate::Result;

/// Repository trait for ride data access. The capacity counter is mutated
/// exclusively through `try_decrement_seats` / `increment_seats`; callers
/// never read-then-write the seat count.
#[async_trait]
pub trait RideRepository: Send + Sync {
    async fn create_ride(&self, ride: &Ride) -> Result<()>;

    async fn get_ride(&self, id: Uuid) -> Result<Option<Ride>>;

    /// Case-insensitive substring match on both endpoints.
    async fn search_rides(&self, start: &str, destination: &str) -> Result<Vec<Ride>>;

    async fn list_rides_by_driver(&self, driver_username: &str) -> Result<Vec<Ride>>;

    async fn count_active_rides(&self, driver_username: &str, after: DateTime<Utc>) -> Result<u64>;

    /// Atomically decrement the seat counter iff it is currently > 0.
    /// Returns whether the decrement occurred. This is the single
    /// concurrency-correctness mechanism for booking: when only one seat
    /// remains, at most one concurrent caller may observe `true`.
    async fn try_decrement_seats(&self, id: Uuid) -> Result<bool>;

    /// Unconditionally add one seat back (cancellation path). The upper
    /// bound is guaranteed by the 1:1 pairing with successful decrements.
    async fn increment_seats(&self, id: Uuid) -> Result<()>;

    async fn list_all_rides(&self) -> Result<Vec<Ride>>;

    async fn count_rides(&self) -> Result<u64>;

    /// Administrative hard delete, cascading the ride's bookings.
    async fn delete_ride(&self, id: Uuid) -> Result<bool>;
}

/// Repository trait for the booking ledger.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create_booking(&self, booking: &Booking) -> Result<()>;

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>>;

    async fn list_bookings_by_passenger(&self, passenger_username: &str)
        -> Result<Vec<Booking>>;

    /// Whether a passenger holds a non-cancelled booking on this ride.
    async fn has_active_booking(&self, ride_id: Uuid, passenger_username: &str) -> Result<bool>;

    /// Atomically flip the booking to `Cancelled` iff it is currently
    /// `Confirmed`. Returns whether the flip occurred. Mirrors the guarded
    /// seat decrement: among concurrent cancellations at most one caller
    /// may observe `true`, which keeps the seat release paired 1:1 with
    /// the original claim.
    async fn cancel_if_confirmed(&self, id: Uuid) -> Result<bool>;

    /// One-way flip of the reminder flag. Written only by the sweeper.
    async fn mark_reminder_sent(&self, id: Uuid) -> Result<()>;

    /// All non-cancelled bookings, for the reminder sweep.
    async fn list_active_bookings(&self) -> Result<Vec<Booking>>;

    async fn count_bookings(&self) -> Result<u64>;
}

/// Repository trait for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: &User) -> Result<()>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn username_exists(&self, username: &str) -> Result<bool>;

    async fn email_exists(&self, email: &str) -> Result<bool>;

    async fn set_enabled(&self, id: Uuid, enabled: bool) -> Result<bool>;

    async fn count_users(&self) -> Result<u64>;
}
