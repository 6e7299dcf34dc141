use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::booking::Booking;
use crate::error::ReservationResult;
use crate::train::{Train, TrainPatch};
use crate::user::User;

/// Repository trait for train inventory access.
#[async_trait]
pub trait TrainRepository: Send + Sync {
    async fn create_train(&self, train: Train) -> ReservationResult<Train>;

    async fn get_train(&self, id: Uuid) -> ReservationResult<Option<Train>>;

    async fn list_trains(&self) -> ReservationResult<Vec<Train>>;

    /// Case-insensitive origin/destination match, same calendar day (UTC) as
    /// the departure time.
    async fn search_trains(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
    ) -> ReservationResult<Vec<Train>>;

    /// Partial update. Must apply `Train::apply_patch` atomically with respect
    /// to concurrent seat reservations, so capacity checks see the live
    /// booked count.
    async fn update_train(&self, id: Uuid, patch: TrainPatch) -> ReservationResult<Train>;

    async fn delete_train(&self, id: Uuid) -> ReservationResult<()>;
}

/// Repository trait for the booking ledger.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Persist a confirmed booking, decrementing the train's availability by
    /// `booking.seat_count` in the same atomic unit. The check-and-decrement
    /// must be serialized per train: concurrent calls may never oversell.
    ///
    /// Fails with `TrainNotFound` or `InsufficientSeats`.
    async fn create_confirmed(&self, booking: Booking) -> ReservationResult<Booking>;

    /// Flip a confirmed booking to cancelled and restore its seats to the
    /// train, atomically. Fails with `BookingNotFound`, or `InvalidState`
    /// when the booking is not currently confirmed — seats are never
    /// restored twice.
    async fn cancel(&self, booking_id: Uuid) -> ReservationResult<Booking>;

    async fn get_booking(&self, id: Uuid) -> ReservationResult<Option<Booking>>;

    async fn list_for_user(&self, user_id: Uuid) -> ReservationResult<Vec<Booking>>;

    async fn list_all(&self) -> ReservationResult<Vec<Booking>>;
}

/// Repository trait for the identity store.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `UsernameTaken` on a duplicate username.
    async fn create_user(&self, user: User) -> ReservationResult<User>;

    async fn get_user(&self, id: Uuid) -> ReservationResult<Option<User>>;

    async fn get_by_username(&self, username: &str) -> ReservationResult<Option<User>>;
}
