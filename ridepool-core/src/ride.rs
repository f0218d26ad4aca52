use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ride {
    pub id: Uuid,
    pub start_location: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    /// Remaining seat count. Never negative; mutated only through the
    /// conditional decrement / unconditional increment pair.
    pub available_seats: i32,
    pub driver_username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRideRequest {
    pub start_location: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub available_seats: i32,
}
