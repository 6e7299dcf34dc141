use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use railbook_core::{
    Actor, BookingRepository, BookingStatus, BusinessRules, NewTrain, ReservationError,
    ReservationService, Train, TrainPatch, TrainRepository,
};
use railbook_store::MemoryStore;

fn customer() -> Actor {
    Actor {
        id: Uuid::new_v4(),
        is_admin: false,
    }
}

async fn setup(total_seats: i32, price: i32) -> (Arc<ReservationService>, Arc<MemoryStore>, Train) {
    let store = Arc::new(MemoryStore::new());
    let train = Train::new(
        Uuid::new_v4(),
        NewTrain {
            name: "Deccan Queen".to_string(),
            origin: "Pune".to_string(),
            destination: "Mumbai".to_string(),
            departure_time: Utc::now(),
            arrival_time: Utc::now(),
            total_seats,
            available_seats: None,
            price,
        },
        Utc::now(),
    )
    .unwrap();
    let train = store.create_train(train).await.unwrap();

    let service = Arc::new(ReservationService::new(
        store.clone(),
        store.clone(),
        BusinessRules::default(),
    ));
    (service, store, train)
}

async fn available_seats(store: &MemoryStore, train_id: Uuid) -> i32 {
    store
        .get_train(train_id)
        .await
        .unwrap()
        .unwrap()
        .available_seats
}

// Confirmed-seat ledger check: total - available == sum of confirmed seat counts.
async fn assert_ledger_consistent(store: &MemoryStore, train_id: Uuid) {
    let train = store.get_train(train_id).await.unwrap().unwrap();
    let confirmed: i32 = store
        .list_all()
        .await
        .unwrap()
        .iter()
        .filter(|b| b.train_id == train_id && b.status == BookingStatus::Confirmed)
        .map(|b| b.seat_count)
        .sum();
    assert!(train.available_seats >= 0 && train.available_seats <= train.total_seats);
    assert_eq!(train.total_seats - train.available_seats, confirmed);
}

#[tokio::test]
async fn test_booking_decrements_seats_and_prices() {
    let (service, store, train) = setup(10, 100).await;

    let booking = service
        .create_booking(customer(), train.id, 3)
        .await
        .unwrap();

    assert_eq!(booking.seat_count, 3);
    assert_eq!(booking.total_price, 300);
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(available_seats(&store, train.id).await, 7);
    assert_ledger_consistent(&store, train.id).await;
}

#[tokio::test]
async fn test_overbooking_rejected_without_side_effects() {
    let (service, store, train) = setup(10, 100).await;
    service
        .create_booking(customer(), train.id, 3)
        .await
        .unwrap();

    let result = service.create_booking(customer(), train.id, 8).await;
    assert!(matches!(
        result,
        Err(ReservationError::InsufficientSeats { requested: 8, available: 7 })
    ));
    assert_eq!(available_seats(&store, train.id).await, 7);
    assert_ledger_consistent(&store, train.id).await;
}

#[tokio::test]
async fn test_cancel_restores_seats() {
    let (service, store, train) = setup(10, 100).await;
    let actor = customer();
    let booking = service.create_booking(actor, train.id, 3).await.unwrap();

    let cancelled = service.cancel_booking(actor, booking.id).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(available_seats(&store, train.id).await, 10);
    assert_ledger_consistent(&store, train.id).await;
}

#[tokio::test]
async fn test_double_cancel_is_rejected_and_restores_nothing() {
    let (service, store, train) = setup(10, 100).await;
    let actor = customer();
    let booking = service.create_booking(actor, train.id, 3).await.unwrap();

    service.cancel_booking(actor, booking.id).await.unwrap();
    let result = service.cancel_booking(actor, booking.id).await;
    assert!(matches!(result, Err(ReservationError::InvalidState { .. })));
    assert_eq!(available_seats(&store, train.id).await, 10);
}

#[tokio::test]
async fn test_cancel_requires_owner_or_admin() {
    let (service, store, train) = setup(10, 100).await;
    let owner = customer();
    let booking = service.create_booking(owner, train.id, 3).await.unwrap();

    let stranger = customer();
    let result = service.cancel_booking(stranger, booking.id).await;
    assert!(matches!(result, Err(ReservationError::Forbidden(_))));
    assert_eq!(available_seats(&store, train.id).await, 7);

    let admin = Actor {
        id: Uuid::new_v4(),
        is_admin: true,
    };
    service.cancel_booking(admin, booking.id).await.unwrap();
    assert_eq!(available_seats(&store, train.id).await, 10);
}

#[tokio::test]
async fn test_seat_count_bounds_enforced() {
    let (service, _store, train) = setup(100, 100).await;

    for bad in [0, -1, 11] {
        let result = service.create_booking(customer(), train.id, bad).await;
        assert!(matches!(result, Err(ReservationError::Validation(_))), "seat_count {bad}");
    }
}

#[tokio::test]
async fn test_unknown_train_rejected() {
    let (service, _store, _train) = setup(10, 100).await;
    let result = service.create_booking(customer(), Uuid::new_v4(), 1).await;
    assert!(matches!(result, Err(ReservationError::TrainNotFound(_))));
}

#[tokio::test]
async fn test_admin_sees_all_bookings_users_see_own() {
    let (service, _store, train) = setup(10, 100).await;
    let alice = customer();
    let bob = customer();
    service.create_booking(alice, train.id, 1).await.unwrap();
    service.create_booking(bob, train.id, 2).await.unwrap();

    assert_eq!(service.list_bookings(alice).await.unwrap().len(), 1);
    assert_eq!(service.list_bookings(bob).await.unwrap().len(), 1);

    let admin = Actor {
        id: Uuid::new_v4(),
        is_admin: true,
    };
    assert_eq!(service.list_bookings(admin).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_two_concurrent_bookings_only_one_wins() {
    let (service, store, train) = setup(10, 100).await;

    let a = tokio::spawn({
        let service = service.clone();
        let train_id = train.id;
        async move { service.create_booking(customer(), train_id, 6).await }
    });
    let b = tokio::spawn({
        let service = service.clone();
        let train_id = train.id;
        async move { service.create_booking(customer(), train_id, 6).await }
    });

    let results = [a.await.unwrap(), b.await.unwrap()];
    let wins = results.iter().filter(|r| r.is_ok()).count();
    let losses = results
        .iter()
        .filter(|r| matches!(r, Err(ReservationError::InsufficientSeats { .. })))
        .count();

    assert_eq!(wins, 1);
    assert_eq!(losses, 1);
    assert_eq!(available_seats(&store, train.id).await, 4);
    assert_ledger_consistent(&store, train.id).await;
}

#[tokio::test]
async fn test_concurrent_fan_out_never_oversells() {
    let (service, store, train) = setup(10, 100).await;

    let mut handles = Vec::new();
    for _ in 0..40 {
        let service = service.clone();
        let train_id = train.id;
        handles.push(tokio::spawn(async move {
            service.create_booking(customer(), train_id, 1).await
        }));
    }

    let mut wins = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => wins += 1,
            Err(ReservationError::InsufficientSeats { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(wins, 10);
    assert_eq!(available_seats(&store, train.id).await, 0);
    assert_ledger_consistent(&store, train.id).await;
}

#[tokio::test]
async fn test_concurrent_bookings_and_cancellations_stay_consistent() {
    let (service, store, train) = setup(10, 100).await;
    let actor = customer();

    let seed = service.create_booking(actor, train.id, 5).await.unwrap();

    let cancel = tokio::spawn({
        let service = service.clone();
        async move { service.cancel_booking(actor, seed.id).await }
    });
    let mut bookers = Vec::new();
    for _ in 0..10 {
        let service = service.clone();
        let train_id = train.id;
        bookers.push(tokio::spawn(async move {
            service.create_booking(customer(), train_id, 2).await
        }));
    }

    cancel.await.unwrap().unwrap();
    for handle in bookers {
        // Individual outcomes depend on interleaving; the ledger must not.
        let _ = handle.await.unwrap();
    }
    assert_ledger_consistent(&store, train.id).await;
}

#[tokio::test]
async fn test_capacity_shrink_below_booked_fails() {
    let (service, store, train) = setup(10, 100).await;
    service
        .create_booking(customer(), train.id, 3)
        .await
        .unwrap();

    let result = store
        .update_train(
            train.id,
            TrainPatch {
                total_seats: Some(2),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(
        result,
        Err(ReservationError::InvalidCapacity { booked: 3, requested_total: 2 })
    ));

    let updated = store
        .update_train(
            train.id,
            TrainPatch {
                total_seats: Some(5),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.total_seats, 5);
    assert_eq!(updated.available_seats, 2);
    assert_ledger_consistent(&store, train.id).await;
}

#[tokio::test]
async fn test_search_trains_filters_route_and_day() {
    let (service, store, train) = setup(10, 100).await;

    let mut other = train.clone();
    other.id = Uuid::new_v4();
    other.origin = "Delhi".to_string();
    store.create_train(other).await.unwrap();

    let found = service
        .search_trains("pune", "MUMBAI", train.departure_time.date_naive())
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, train.id);
}
