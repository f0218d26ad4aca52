use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use ridepool_core::booking::{Booking, BookingStatus};
use ridepool_core::repository::{BookingRepository, RideRepository, UserRepository};
use ridepool_core::ride::Ride;
use ridepool_core::user::User;
use ridepool_core::{Error, Result};

/// In-memory store. Backs tests and local runs; the conditional seat
/// decrement is evaluated inside a single write-lock critical section,
/// which gives it the same atomicity contract as the guarded UPDATE in the
/// Postgres store.
#[derive(Default)]
pub struct MemoryStore {
    rides: RwLock<HashMap<Uuid, Ride>>,
    bookings: RwLock<HashMap<Uuid, Booking>>,
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RideRepository for MemoryStore {
    async fn create_ride(&self, ride: &Ride) -> Result<()> {
        self.rides.write().await.insert(ride.id, ride.clone());
        Ok(())
    }

    async fn get_ride(&self, id: Uuid) -> Result<Option<Ride>> {
        Ok(self.rides.read().await.get(&id).cloned())
    }

    async fn search_rides(&self, start: &str, destination: &str) -> Result<Vec<Ride>> {
        let start = start.to_lowercase();
        let destination = destination.to_lowercase();
        let rides = self.rides.read().await;
        let mut found: Vec<Ride> = rides
            .values()
            .filter(|r| {
                r.start_location.to_lowercase().contains(&start)
                    && r.destination.to_lowercase().contains(&destination)
            })
            .cloned()
            .collect();
        found.sort_by_key(|r| r.departure_time);
        Ok(found)
    }

    async fn list_rides_by_driver(&self, driver_username: &str) -> Result<Vec<Ride>> {
        let rides = self.rides.read().await;
        Ok(rides
            .values()
            .filter(|r| r.driver_username == driver_username)
            .cloned()
            .collect())
    }

    async fn count_active_rides(&self, driver_username: &str, after: DateTime<Utc>) -> Result<u64> {
        let rides = self.rides.read().await;
        Ok(rides
            .values()
            .filter(|r| r.driver_username == driver_username && r.departure_time > after)
            .count() as u64)
    }

    async fn try_decrement_seats(&self, id: Uuid) -> Result<bool> {
        let mut rides = self.rides.write().await;
        match rides.get_mut(&id) {
            Some(ride) if ride.available_seats > 0 => {
                ride.available_seats -= 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment_seats(&self, id: Uuid) -> Result<()> {
        let mut rides = self.rides.write().await;
        let ride = rides
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("ride {id}")))?;
        ride.available_seats += 1;
        Ok(())
    }

    async fn list_all_rides(&self) -> Result<Vec<Ride>> {
        Ok(self.rides.read().await.values().cloned().collect())
    }

    async fn count_rides(&self) -> Result<u64> {
        Ok(self.rides.read().await.len() as u64)
    }

    async fn delete_ride(&self, id: Uuid) -> Result<bool> {
        let removed = self.rides.write().await.remove(&id).is_some();
        if removed {
            // Cascade the ledger, mirroring ON DELETE CASCADE in Postgres.
            self.bookings.write().await.retain(|_, b| b.ride_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn create_booking(&self, booking: &Booking) -> Result<()> {
        self.bookings
            .write()
            .await
            .insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn list_bookings_by_passenger(&self, passenger_username: &str) -> Result<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        let mut found: Vec<Booking> = bookings
            .values()
            .filter(|b| b.passenger_username == passenger_username)
            .cloned()
            .collect();
        found.sort_by_key(|b| b.booked_at);
        Ok(found)
    }

    async fn has_active_booking(&self, ride_id: Uuid, passenger_username: &str) -> Result<bool> {
        let bookings = self.bookings.read().await;
        Ok(bookings.values().any(|b| {
            b.ride_id == ride_id && b.passenger_username == passenger_username && b.is_active()
        }))
    }

    async fn cancel_if_confirmed(&self, id: Uuid) -> Result<bool> {
        // Check and flip under one write lock, like the seat decrement.
        let mut bookings = self.bookings.write().await;
        let booking = bookings
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("booking {id}")))?;
        if booking.status != BookingStatus::Confirmed {
            return Ok(false);
        }
        booking.status = BookingStatus::Cancelled;
        Ok(true)
    }

    async fn mark_reminder_sent(&self, id: Uuid) -> Result<()> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("booking {id}")))?;
        booking.reminder_sent = true;
        Ok(())
    }

    async fn list_active_bookings(&self) -> Result<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings.values().filter(|b| b.is_active()).cloned().collect())
    }

    async fn count_bookings(&self) -> Result<u64> {
        Ok(self.bookings.read().await.len() as u64)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        self.users.write().await.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn username_exists(&self, username: &str) -> Result<bool> {
        let users = self.users.read().await;
        Ok(users.values().any(|u| u.username == username))
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let users = self.users.read().await;
        Ok(users.values().any(|u| u.email == email))
    }

    async fn set_enabled(&self, id: Uuid, enabled: bool) -> Result<bool> {
        let mut users = self.users.write().await;
        match users.get_mut(&id) {
            Some(user) => {
                user.enabled = enabled;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_users(&self) -> Result<u64> {
        Ok(self.users.read().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn ride_with_seats(seats: i32) -> Ride {
        Ride {
            id: Uuid::new_v4(),
            start_location: "Athens".to_string(),
            destination: "Patras".to_string(),
            departure_time: Utc::now() + chrono::Duration::hours(2),
            available_seats: seats,
            driver_username: "driver".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn decrement_refuses_at_zero() {
        let store = MemoryStore::new();
        let ride = ride_with_seats(1);
        store.create_ride(&ride).await.unwrap();

        assert!(store.try_decrement_seats(ride.id).await.unwrap());
        assert!(!store.try_decrement_seats(ride.id).await.unwrap());
        assert_eq!(
            store.get_ride(ride.id).await.unwrap().unwrap().available_seats,
            0
        );
    }

    #[tokio::test]
    async fn decrement_on_unknown_ride_is_a_miss() {
        let store = MemoryStore::new();
        assert!(!store.try_decrement_seats(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_decrements_claim_exactly_the_capacity() {
        let store = Arc::new(MemoryStore::new());
        let ride = ride_with_seats(3);
        store.create_ride(&ride).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            let id = ride.id;
            handles.push(tokio::spawn(async move {
                store.try_decrement_seats(id).await.unwrap()
            }));
        }

        let mut wins = 0;
        for h in handles {
            if h.await.unwrap() {
                wins += 1;
            }
        }

        assert_eq!(wins, 3);
        assert_eq!(
            store.get_ride(ride.id).await.unwrap().unwrap().available_seats,
            0
        );
    }

    #[tokio::test]
    async fn concurrent_cancellations_release_exactly_one_seat() {
        let store = Arc::new(MemoryStore::new());
        let ride = ride_with_seats(1);
        store.create_ride(&ride).await.unwrap();
        assert!(store.try_decrement_seats(ride.id).await.unwrap());

        let booking = Booking {
            id: Uuid::new_v4(),
            ride_id: ride.id,
            passenger_username: "rider".to_string(),
            status: BookingStatus::Confirmed,
            reminder_sent: false,
            booked_at: Utc::now(),
        };
        store.create_booking(&booking).await.unwrap();

        // Every canceller has read the booking as Confirmed before any of
        // them writes; only the guarded flip may hand out the release.
        let mut handles = Vec::new();
        for _ in 0..4 {
            let store = store.clone();
            let booking_id = booking.id;
            let ride_id = ride.id;
            handles.push(tokio::spawn(async move {
                if store.cancel_if_confirmed(booking_id).await.unwrap() {
                    store.increment_seats(ride_id).await.unwrap();
                    true
                } else {
                    false
                }
            }));
        }

        let mut wins = 0;
        for h in handles {
            if h.await.unwrap() {
                wins += 1;
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(
            store.get_ride(ride.id).await.unwrap().unwrap().available_seats,
            1
        );
    }

    #[tokio::test]
    async fn delete_ride_cascades_bookings() {
        let store = MemoryStore::new();
        let ride = ride_with_seats(4);
        store.create_ride(&ride).await.unwrap();

        let booking = Booking {
            id: Uuid::new_v4(),
            ride_id: ride.id,
            passenger_username: "rider".to_string(),
            status: BookingStatus::Confirmed,
            reminder_sent: false,
            booked_at: Utc::now(),
        };
        store.create_booking(&booking).await.unwrap();

        assert!(store.delete_ride(ride.id).await.unwrap());
        assert!(store.get_booking(booking.id).await.unwrap().is_none());
        assert_eq!(store.count_bookings().await.unwrap(), 0);
    }
}
