mod common;

use std::sync::Arc;

use ridepool_core::booking::BookingStatus;
use ridepool_core::events::EventBus;
use ridepool_core::repository::{BookingRepository, RideRepository};
use ridepool_core::ride::CreateRideRequest;
use ridepool_core::ride_service::RideService;
use ridepool_core::Error;
use ridepool_store::MemoryStore;

use common::{booking_service, in_minutes, seed_ride, seed_user};

#[tokio::test]
async fn contended_booking_claims_exactly_the_capacity() {
    let store = Arc::new(MemoryStore::new());
    let svc = Arc::new(booking_service(&store, 10));

    seed_user(&store, "driver").await;
    let ride = seed_ride(&store, "driver", 2, in_minutes(120)).await;

    let mut handles = Vec::new();
    for i in 0..6 {
        let name = format!("passenger-{i}");
        seed_user(&store, &name).await;
        let svc = svc.clone();
        handles.push(tokio::spawn(
            async move { svc.book_ride(ride.id, &name).await },
        ));
    }

    let mut successes = 0;
    let mut full = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => successes += 1,
            Err(Error::Conflict(msg)) => {
                assert_eq!(msg, "ride is fully booked");
                full += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(successes, 2);
    assert_eq!(full, 4);
    let ride = store.get_ride(ride.id).await.unwrap().unwrap();
    assert_eq!(ride.available_seats, 0);
}

#[tokio::test]
async fn driver_cannot_book_own_ride() {
    let store = Arc::new(MemoryStore::new());
    let svc = booking_service(&store, 10);

    seed_user(&store, "driver").await;
    let ride = seed_ride(&store, "driver", 3, in_minutes(120)).await;

    let err = svc.book_ride(ride.id, "driver").await.unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    // Capacity untouched by the rejected attempt.
    let ride = store.get_ride(ride.id).await.unwrap().unwrap();
    assert_eq!(ride.available_seats, 3);
}

#[tokio::test]
async fn double_booking_rejected_before_any_capacity_mutation() {
    let store = Arc::new(MemoryStore::new());
    let svc = booking_service(&store, 10);

    seed_user(&store, "driver").await;
    seed_user(&store, "maria").await;
    let ride = seed_ride(&store, "driver", 5, in_minutes(120)).await;

    svc.book_ride(ride.id, "maria").await.unwrap();
    let err = svc.book_ride(ride.id, "maria").await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    let ride = store.get_ride(ride.id).await.unwrap().unwrap();
    assert_eq!(ride.available_seats, 4);
}

#[tokio::test]
async fn booking_unknown_ride_or_user_is_not_found() {
    let store = Arc::new(MemoryStore::new());
    let svc = booking_service(&store, 10);

    seed_user(&store, "driver").await;
    let ride = seed_ride(&store, "driver", 1, in_minutes(120)).await;

    let err = svc.book_ride(ride.id, "ghost").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    seed_user(&store, "maria").await;
    let err = svc.book_ride(uuid::Uuid::new_v4(), "maria").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn cancellation_releases_one_seat_and_is_terminal() {
    let store = Arc::new(MemoryStore::new());
    let svc = booking_service(&store, 10);

    seed_user(&store, "driver").await;
    seed_user(&store, "maria").await;
    let ride = seed_ride(&store, "driver", 2, in_minutes(120)).await;

    let booking = svc.book_ride(ride.id, "maria").await.unwrap();
    assert_eq!(
        store.get_ride(ride.id).await.unwrap().unwrap().available_seats,
        1
    );

    svc.cancel_booking(booking.id, "maria").await.unwrap();
    assert_eq!(
        store.get_ride(ride.id).await.unwrap().unwrap().available_seats,
        2
    );
    let stored = store
        .get_booking(booking.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, BookingStatus::Cancelled);

    // Second cancellation refuses and must not release a second seat.
    let err = svc.cancel_booking(booking.id, "maria").await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
    assert_eq!(
        store.get_ride(ride.id).await.unwrap().unwrap().available_seats,
        2
    );
}

#[tokio::test]
async fn cancelling_someone_elses_booking_is_forbidden() {
    let store = Arc::new(MemoryStore::new());
    let svc = booking_service(&store, 10);

    seed_user(&store, "driver").await;
    seed_user(&store, "maria").await;
    seed_user(&store, "nikos").await;
    let ride = seed_ride(&store, "driver", 2, in_minutes(120)).await;

    let booking = svc.book_ride(ride.id, "maria").await.unwrap();
    let err = svc.cancel_booking(booking.id, "nikos").await.unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    let stored = store.get_booking(booking.id).await.unwrap().unwrap();
    assert_eq!(stored.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn cancellation_cutoff_is_enforced() {
    let store = Arc::new(MemoryStore::new());
    let svc = booking_service(&store, 10);

    seed_user(&store, "driver").await;
    seed_user(&store, "maria").await;

    // Departs in 5 minutes: inside the 10-minute cutoff.
    let soon = seed_ride(&store, "driver", 2, in_minutes(5)).await;
    let booking = svc.book_ride(soon.id, "maria").await.unwrap();
    let err = svc.cancel_booking(booking.id, "maria").await.unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    // Departs in 15 minutes: outside the cutoff, cancel succeeds.
    let later = seed_ride(&store, "driver", 2, in_minutes(15)).await;
    let booking = svc.book_ride(later.id, "maria").await.unwrap();
    svc.cancel_booking(booking.id, "maria").await.unwrap();
}

#[tokio::test]
async fn rebooking_after_cancellation_is_allowed() {
    let store = Arc::new(MemoryStore::new());
    let svc = booking_service(&store, 10);

    seed_user(&store, "driver").await;
    seed_user(&store, "maria").await;
    let ride = seed_ride(&store, "driver", 1, in_minutes(120)).await;

    let first = svc.book_ride(ride.id, "maria").await.unwrap();
    svc.cancel_booking(first.id, "maria").await.unwrap();

    // The cancelled booking no longer counts as a double-booking and the
    // released seat can be claimed again.
    let second = svc.book_ride(ride.id, "maria").await.unwrap();
    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn driver_active_ride_cap_is_enforced() {
    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "driver").await;

    let svc = RideService::new(store.clone(), store.clone(), EventBus::default(), 5);

    for _ in 0..5 {
        svc.create_ride(
            CreateRideRequest {
                start_location: "Athens".to_string(),
                destination: "Patras".to_string(),
                departure_time: in_minutes(120),
                available_seats: 3,
            },
            "driver",
        )
        .await
        .unwrap();
    }

    let err = svc
        .create_ride(
            CreateRideRequest {
                start_location: "Athens".to_string(),
                destination: "Larissa".to_string(),
                departure_time: in_minutes(120),
                available_seats: 3,
            },
            "driver",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
}

#[tokio::test]
async fn ride_validation_rejects_bad_input() {
    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "driver").await;
    let svc = RideService::new(store.clone(), store.clone(), EventBus::default(), 5);

    let err = svc
        .create_ride(
            CreateRideRequest {
                start_location: "Athens".to_string(),
                destination: "Patras".to_string(),
                departure_time: in_minutes(120),
                available_seats: 0,
            },
            "driver",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = svc
        .create_ride(
            CreateRideRequest {
                start_location: "Athens".to_string(),
                destination: "Patras".to_string(),
                departure_time: in_minutes(-5),
                available_seats: 2,
            },
            "driver",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}
