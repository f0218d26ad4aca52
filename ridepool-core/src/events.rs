use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Fire-and-forget telemetry events fanned out to SSE subscribers.
/// No delivery or consistency guarantee; lagging receivers drop messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BookingEvent {
    RideCreated {
        ride_id: Uuid,
        driver: String,
        destination: String,
    },
    BookingConfirmed {
        booking_id: Uuid,
        ride_id: Uuid,
        passenger: String,
    },
    BookingCancelled {
        booking_id: Uuid,
        ride_id: Uuid,
        passenger: String,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BookingEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: BookingEvent) {
        // send only fails when there are no receivers, which is fine for a
        // best-effort side-channel.
        if self.tx.send(event).is_err() {
            tracing::trace!("no event subscribers, dropping event");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
