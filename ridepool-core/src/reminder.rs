use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::notify::SmsNotifier;
use crate::repository::{BookingRepository, RideRepository, UserRepository};
use crate::Result;

/// Periodic sweep over active bookings that sends each one at most one
/// departure reminder.
///
/// Idempotency rests entirely on the `reminder_sent` flag: the flag is
/// flipped only after the dispatch attempt returns, and the write is
/// persisted per booking so an overlapping or crashed sweep cannot starve
/// the remaining bookings.
pub struct ReminderSweeper {
    bookings: Arc<dyn BookingRepository>,
    rides: Arc<dyn RideRepository>,
    users: Arc<dyn UserRepository>,
    notifier: Arc<dyn SmsNotifier>,
    window: Duration,
}

impl ReminderSweeper {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        rides: Arc<dyn RideRepository>,
        users: Arc<dyn UserRepository>,
        notifier: Arc<dyn SmsNotifier>,
        window_minutes: i64,
    ) -> Self {
        Self {
            bookings,
            rides,
            users,
            notifier,
            window: Duration::minutes(window_minutes),
        }
    }

    /// One sweep pass. Returns how many reminders were dispatched.
    ///
    /// A booking is due when its ride departs strictly after `now` and
    /// strictly before `now + window`. Per-booking failures are logged and
    /// skipped; they must not abort the rest of the sweep.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<usize> {
        let horizon = now + self.window;
        let bookings = self.bookings.list_active_bookings().await?;

        let mut dispatched = 0;
        for booking in bookings {
            if booking.reminder_sent {
                continue;
            }

            let ride = match self.rides.get_ride(booking.ride_id).await {
                Ok(Some(ride)) => ride,
                Ok(None) => {
                    warn!(booking_id = %booking.id, ride_id = %booking.ride_id, "active booking references missing ride");
                    continue;
                }
                Err(e) => {
                    warn!(booking_id = %booking.id, error = %e, "skipping booking in sweep");
                    continue;
                }
            };

            if ride.departure_time <= now || ride.departure_time >= horizon {
                continue;
            }

            let phone = match self.users.find_by_username(&booking.passenger_username).await {
                Ok(Some(user)) => user.phone_number,
                Ok(None) => {
                    warn!(booking_id = %booking.id, passenger = %booking.passenger_username, "booking for unknown passenger");
                    continue;
                }
                Err(e) => {
                    warn!(booking_id = %booking.id, error = %e, "skipping booking in sweep");
                    continue;
                }
            };

            let body = format!(
                "Reminder: your ride to {} leaves in less than an hour!",
                ride.destination
            );
            // Fire-and-forget dispatch; the flag flips only after the
            // attempt so a failed flag write retries next sweep rather
            // than silently swallowing the send.
            self.notifier.send_message(&phone, &body).await;

            if let Err(e) = self.bookings.mark_reminder_sent(booking.id).await {
                warn!(booking_id = %booking.id, error = %e, "reminder sent but flag write failed; may re-send next sweep");
                continue;
            }

            info!(booking_id = %booking.id, passenger = %booking.passenger_username, "departure reminder sent");
            dispatched += 1;
        }

        Ok(dispatched)
    }

    /// Run the sweep on a fixed period until the task is dropped.
    pub async fn run(self, period: std::time::Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            match self.run_once(Utc::now()).await {
                Ok(0) => {}
                Ok(n) => info!(dispatched = n, "reminder sweep finished"),
                Err(e) => warn!(error = %e, "reminder sweep failed"),
            }
        }
    }
}
