use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

use railbook_core::{
    Booking, BookingRepository, BookingStatus, ReservationError, ReservationResult, Train,
    TrainPatch, TrainRepository, User, UserRepository,
};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    trains: HashMap<Uuid, Train>,
    bookings: HashMap<Uuid, Booking>,
}

/// In-memory storage backend. One lock guards all three maps, so the
/// check-and-decrement on a train's availability and the booking insert are
/// a single critical section. Used by tests and as a standalone dev backend.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the default admin account the way the original deployment did.
    /// The caller supplies the hash; plaintext never reaches the store.
    pub fn seed_admin(&self, username: &str, password_hash: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            is_admin: true,
            created_at: Utc::now(),
        };
        self.inner.lock().users.insert(user.id, user.clone());
        user
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: User) -> ReservationResult<User> {
        let mut inner = self.inner.lock();
        if inner.users.values().any(|u| u.username == user.username) {
            return Err(ReservationError::UsernameTaken(user.username));
        }
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> ReservationResult<Option<User>> {
        Ok(self.inner.lock().users.get(&id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> ReservationResult<Option<User>> {
        Ok(self
            .inner
            .lock()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }
}

#[async_trait]
impl TrainRepository for MemoryStore {
    async fn create_train(&self, train: Train) -> ReservationResult<Train> {
        self.inner.lock().trains.insert(train.id, train.clone());
        Ok(train)
    }

    async fn get_train(&self, id: Uuid) -> ReservationResult<Option<Train>> {
        Ok(self.inner.lock().trains.get(&id).cloned())
    }

    async fn list_trains(&self) -> ReservationResult<Vec<Train>> {
        let mut trains: Vec<Train> = self.inner.lock().trains.values().cloned().collect();
        trains.sort_by_key(|t| t.departure_time);
        Ok(trains)
    }

    async fn search_trains(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
    ) -> ReservationResult<Vec<Train>> {
        let mut trains: Vec<Train> = self
            .inner
            .lock()
            .trains
            .values()
            .filter(|t| {
                t.origin.eq_ignore_ascii_case(origin)
                    && t.destination.eq_ignore_ascii_case(destination)
                    && t.departure_time.date_naive() == date
            })
            .cloned()
            .collect();
        trains.sort_by_key(|t| t.departure_time);
        Ok(trains)
    }

    async fn update_train(&self, id: Uuid, patch: TrainPatch) -> ReservationResult<Train> {
        let mut inner = self.inner.lock();
        let train = inner
            .trains
            .get_mut(&id)
            .ok_or(ReservationError::TrainNotFound(id))?;
        train.apply_patch(patch)?;
        Ok(train.clone())
    }

    async fn delete_train(&self, id: Uuid) -> ReservationResult<()> {
        match self.inner.lock().trains.remove(&id) {
            Some(_) => Ok(()),
            None => Err(ReservationError::TrainNotFound(id)),
        }
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn create_confirmed(&self, booking: Booking) -> ReservationResult<Booking> {
        let mut inner = self.inner.lock();

        let train = inner
            .trains
            .get_mut(&booking.train_id)
            .ok_or(ReservationError::TrainNotFound(booking.train_id))?;

        if train.available_seats < booking.seat_count {
            return Err(ReservationError::InsufficientSeats {
                requested: booking.seat_count,
                available: train.available_seats,
            });
        }
        train.available_seats -= booking.seat_count;

        inner.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn cancel(&self, booking_id: Uuid) -> ReservationResult<Booking> {
        let mut inner = self.inner.lock();

        let booking = inner
            .bookings
            .get_mut(&booking_id)
            .ok_or(ReservationError::BookingNotFound(booking_id))?;

        if booking.status != BookingStatus::Confirmed {
            return Err(ReservationError::InvalidState {
                from: booking.status.to_string(),
                to: BookingStatus::Cancelled.to_string(),
            });
        }
        booking.status = BookingStatus::Cancelled;
        let booking = booking.clone();

        match inner.trains.get_mut(&booking.train_id) {
            Some(train) if train.available_seats + booking.seat_count <= train.total_seats => {
                train.available_seats += booking.seat_count;
            }
            Some(_) | None => {
                // Train deleted since booking, or capacity shrunk underneath
                // it. The cancellation still stands.
                warn!(
                    booking_id = %booking.id,
                    train_id = %booking.train_id,
                    "Cancelled booking could not restore seats"
                );
            }
        }

        Ok(booking)
    }

    async fn get_booking(&self, id: Uuid) -> ReservationResult<Option<Booking>> {
        Ok(self.inner.lock().bookings.get(&id).cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> ReservationResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .inner
            .lock()
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.created_at);
        Ok(bookings)
    }

    async fn list_all(&self) -> ReservationResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self.inner.lock().bookings.values().cloned().collect();
        bookings.sort_by_key(|b| b.created_at);
        Ok(bookings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use railbook_core::NewTrain;

    fn train(total_seats: i32, price: i32) -> Train {
        Train::new(
            Uuid::new_v4(),
            NewTrain {
                name: "Coastal Express".to_string(),
                origin: "Chennai".to_string(),
                destination: "Bangalore".to_string(),
                departure_time: Utc::now(),
                arrival_time: Utc::now(),
                total_seats,
                available_seats: None,
                price,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn booking(train_id: Uuid, seat_count: i32) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            train_id,
            seat_count,
            total_price: 0,
            status: BookingStatus::Confirmed,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = MemoryStore::new();
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            password_hash: "hash".to_string(),
            is_admin: false,
            created_at: Utc::now(),
        };
        store.create_user(user.clone()).await.unwrap();

        let mut dup = user.clone();
        dup.id = Uuid::new_v4();
        let result = store.create_user(dup).await;
        assert!(matches!(result, Err(ReservationError::UsernameTaken(_))));
    }

    #[tokio::test]
    async fn test_reserve_decrements_and_checks() {
        let store = MemoryStore::new();
        let t = store.create_train(train(10, 100)).await.unwrap();

        store.create_confirmed(booking(t.id, 4)).await.unwrap();
        assert_eq!(store.get_train(t.id).await.unwrap().unwrap().available_seats, 6);

        let result = store.create_confirmed(booking(t.id, 7)).await;
        assert!(matches!(
            result,
            Err(ReservationError::InsufficientSeats { requested: 7, available: 6 })
        ));
        assert_eq!(store.get_train(t.id).await.unwrap().unwrap().available_seats, 6);
    }

    #[tokio::test]
    async fn test_cancel_restores_once() {
        let store = MemoryStore::new();
        let t = store.create_train(train(10, 100)).await.unwrap();
        let b = store.create_confirmed(booking(t.id, 4)).await.unwrap();

        let cancelled = store.cancel(b.id).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(store.get_train(t.id).await.unwrap().unwrap().available_seats, 10);

        let result = store.cancel(b.id).await;
        assert!(matches!(result, Err(ReservationError::InvalidState { .. })));
        assert_eq!(store.get_train(t.id).await.unwrap().unwrap().available_seats, 10);
    }

    #[tokio::test]
    async fn test_cancel_survives_deleted_train() {
        let store = MemoryStore::new();
        let t = store.create_train(train(10, 100)).await.unwrap();
        let b = store.create_confirmed(booking(t.id, 4)).await.unwrap();
        store.delete_train(t.id).await.unwrap();

        let cancelled = store.cancel(b.id).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_same_day() {
        let store = MemoryStore::new();
        let t = store.create_train(train(10, 100)).await.unwrap();

        let found = store
            .search_trains("CHENNAI", "bangalore", t.departure_time.date_naive())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        let other_day = t.departure_time.date_naive().succ_opt().unwrap();
        let found = store
            .search_trains("Chennai", "Bangalore", other_day)
            .await
            .unwrap();
        assert!(found.is_empty());
    }
}
