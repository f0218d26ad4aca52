use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus};
use crate::events::{BookingEvent, EventBus};
use crate::repository::{BookingRepository, RideRepository, UserRepository};
use crate::{Error, Result};

/// Orchestrates seat booking and cancellation against the capacity counter
/// and the booking ledger.
///
/// The precondition checks are cheap advisory reads; the conditional seat
/// decrement is the only step requiring atomicity and is deliberately done
/// last, so no lock is ever held across the whole sequence.
pub struct BookingService {
    rides: Arc<dyn RideRepository>,
    bookings: Arc<dyn BookingRepository>,
    users: Arc<dyn UserRepository>,
    events: EventBus,
    cancel_cutoff: Duration,
}

impl BookingService {
    pub fn new(
        rides: Arc<dyn RideRepository>,
        bookings: Arc<dyn BookingRepository>,
        users: Arc<dyn UserRepository>,
        events: EventBus,
        cancel_cutoff_minutes: i64,
    ) -> Self {
        Self {
            rides,
            bookings,
            users,
            events,
            cancel_cutoff: Duration::minutes(cancel_cutoff_minutes),
        }
    }

    /// Book one seat on a ride for the given passenger.
    ///
    /// Among N concurrent calls on a ride with K < N seats left, exactly K
    /// succeed; the losers get `Conflict` and must re-search, there is no
    /// retry or queueing here.
    pub async fn book_ride(&self, ride_id: Uuid, passenger_username: &str) -> Result<Booking> {
        let passenger = self
            .users
            .find_by_username(passenger_username)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user {passenger_username}")))?;

        let ride = self
            .rides
            .get_ride(ride_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("ride {ride_id}")))?;

        if ride.driver_username == passenger.username {
            return Err(Error::Forbidden(
                "drivers cannot book their own ride".to_string(),
            ));
        }

        if self
            .bookings
            .has_active_booking(ride_id, &passenger.username)
            .await?
        {
            return Err(Error::Conflict(
                "you have already booked this ride".to_string(),
            ));
        }

        // The authoritative step. If another caller claimed the last seat
        // between our read and this write, the guarded decrement refuses.
        if !self.rides.try_decrement_seats(ride_id).await? {
            return Err(Error::Conflict("ride is fully booked".to_string()));
        }

        let booking = Booking {
            id: Uuid::new_v4(),
            ride_id,
            passenger_username: passenger.username.clone(),
            status: BookingStatus::Confirmed,
            reminder_sent: false,
            booked_at: Utc::now(),
        };
        self.bookings.create_booking(&booking).await?;

        info!(booking_id = %booking.id, ride_id = %ride_id, passenger = %passenger.username, "booking confirmed");
        self.events.publish(BookingEvent::BookingConfirmed {
            booking_id: booking.id,
            ride_id,
            passenger: passenger.username,
        });

        Ok(booking)
    }

    /// Cancel a booking and release its seat.
    ///
    /// The status flip commits before the capacity release. If the release
    /// then fails the seat count under-counts until reconciled by an
    /// operator; that window is accepted rather than paying for a
    /// two-phase commit against a single store.
    pub async fn cancel_booking(&self, booking_id: Uuid, passenger_username: &str) -> Result<()> {
        let booking = self
            .bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("booking {booking_id}")))?;

        if booking.passenger_username != passenger_username {
            return Err(Error::Forbidden(
                "you are not authorized to cancel this booking".to_string(),
            ));
        }

        if booking.status == BookingStatus::Cancelled {
            return Err(Error::Conflict("booking is already cancelled".to_string()));
        }

        let ride = self
            .rides
            .get_ride(booking.ride_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("ride {}", booking.ride_id)))?;

        let now = Utc::now();
        if ride.departure_time - now < self.cancel_cutoff {
            return Err(Error::Forbidden(format!(
                "cannot cancel within {} minutes of departure",
                self.cancel_cutoff.num_minutes()
            )));
        }

        // The authoritative step, mirroring the seat claim on booking. If
        // a concurrent cancellation won between our read and this write,
        // the guarded flip refuses and no second seat is released.
        if !self.bookings.cancel_if_confirmed(booking_id).await? {
            return Err(Error::Conflict("booking is already cancelled".to_string()));
        }

        if let Err(e) = self.rides.increment_seats(booking.ride_id).await {
            // The booking is already cancelled; the seat was not returned.
            // Operator attention required, do not swallow.
            error!(
                booking_id = %booking_id,
                ride_id = %booking.ride_id,
                error = %e,
                "seat release failed after cancellation; capacity under-counts until reconciled"
            );
            return Err(e);
        }

        info!(booking_id = %booking_id, ride_id = %booking.ride_id, "booking cancelled");
        self.events.publish(BookingEvent::BookingCancelled {
            booking_id,
            ride_id: booking.ride_id,
            passenger: booking.passenger_username,
        });

        Ok(())
    }

    pub async fn my_bookings(&self, passenger_username: &str) -> Result<Vec<Booking>> {
        if self.users.find_by_username(passenger_username).await?.is_none() {
            warn!(passenger = %passenger_username, "booking listing for unknown user");
            return Err(Error::NotFound(format!("user {passenger_username}")));
        }
        self.bookings
            .list_bookings_by_passenger(passenger_username)
            .await
    }
}
