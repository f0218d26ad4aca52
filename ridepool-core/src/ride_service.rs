use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::events::{BookingEvent, EventBus};
use crate::repository::{RideRepository, UserRepository};
use crate::ride::{CreateRideRequest, Ride};
use crate::{Error, Result};

pub struct RideService {
    rides: Arc<dyn RideRepository>,
    users: Arc<dyn UserRepository>,
    events: EventBus,
    /// Cap on concurrently-active (future departure) rides per driver.
    max_active_rides: u64,
}

impl RideService {
    pub fn new(
        rides: Arc<dyn RideRepository>,
        users: Arc<dyn UserRepository>,
        events: EventBus,
        max_active_rides: u64,
    ) -> Self {
        Self {
            rides,
            users,
            events,
            max_active_rides,
        }
    }

    pub async fn create_ride(&self, req: CreateRideRequest, driver_username: &str) -> Result<Ride> {
        let driver = self
            .users
            .find_by_username(driver_username)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user {driver_username}")))?;

        if req.available_seats < 1 {
            return Err(Error::Validation(
                "a ride needs at least one seat".to_string(),
            ));
        }
        let now = Utc::now();
        if req.departure_time <= now {
            return Err(Error::Validation(
                "departure time must be in the future".to_string(),
            ));
        }

        let active = self.rides.count_active_rides(&driver.username, now).await?;
        if active >= self.max_active_rides {
            return Err(Error::Conflict(format!(
                "you cannot have more than {} active rides",
                self.max_active_rides
            )));
        }

        let ride = Ride {
            id: Uuid::new_v4(),
            start_location: req.start_location,
            destination: req.destination,
            departure_time: req.departure_time,
            available_seats: req.available_seats,
            driver_username: driver.username.clone(),
            created_at: now,
        };
        self.rides.create_ride(&ride).await?;

        info!(ride_id = %ride.id, driver = %driver.username, "ride published");
        self.events.publish(BookingEvent::RideCreated {
            ride_id: ride.id,
            driver: driver.username,
            destination: ride.destination.clone(),
        });

        Ok(ride)
    }

    pub async fn search(&self, start: &str, destination: &str) -> Result<Vec<Ride>> {
        self.rides.search_rides(start, destination).await
    }

    pub async fn get(&self, ride_id: Uuid) -> Result<Ride> {
        self.rides
            .get_ride(ride_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("ride {ride_id}")))
    }

    pub async fn by_driver(&self, driver_username: &str) -> Result<Vec<Ride>> {
        self.rides.list_rides_by_driver(driver_username).await
    }

    pub async fn list_all(&self) -> Result<Vec<Ride>> {
        self.rides.list_all_rides().await
    }

    /// Administrative hard delete; the store cascades booking cleanup.
    pub async fn admin_delete(&self, ride_id: Uuid) -> Result<()> {
        if !self.rides.delete_ride(ride_id).await? {
            return Err(Error::NotFound(format!("ride {ride_id}")));
        }
        info!(ride_id = %ride_id, "ride deleted by admin");
        Ok(())
    }
}
