use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::access::{may_manage_booking, Actor};
use crate::booking::{Booking, BookingStatus};
use crate::error::{ReservationError, ReservationResult};
use crate::repository::{BookingRepository, TrainRepository};
use crate::train::Train;

#[derive(Debug, Clone, Deserialize)]
pub struct BusinessRules {
    #[serde(default = "default_max_seats")]
    pub max_seats_per_booking: i32,
}

fn default_max_seats() -> i32 {
    10
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            max_seats_per_booking: default_max_seats(),
        }
    }
}

/// Orchestrates booking creation and cancellation against the train
/// inventory, keeping seat counts consistent. The atomic check-and-decrement
/// itself lives in the `BookingRepository` implementation; this service owns
/// validation, pricing and the authorization rules around it.
pub struct ReservationService {
    trains: Arc<dyn TrainRepository>,
    bookings: Arc<dyn BookingRepository>,
    rules: BusinessRules,
}

impl ReservationService {
    pub fn new(
        trains: Arc<dyn TrainRepository>,
        bookings: Arc<dyn BookingRepository>,
        rules: BusinessRules,
    ) -> Self {
        Self {
            trains,
            bookings,
            rules,
        }
    }

    /// Create a confirmed booking for `seat_count` seats on `train_id`.
    ///
    /// `total_price = seat_count * train.price`. Concurrent calls against the
    /// same train may never oversell it; a lost race surfaces as
    /// `InsufficientSeats` and is not retried here.
    pub async fn create_booking(
        &self,
        actor: Actor,
        train_id: Uuid,
        seat_count: i32,
    ) -> ReservationResult<Booking> {
        if seat_count < 1 || seat_count > self.rules.max_seats_per_booking {
            return Err(ReservationError::Validation(format!(
                "seat_count must be between 1 and {}",
                self.rules.max_seats_per_booking
            )));
        }

        let train = self
            .trains
            .get_train(train_id)
            .await?
            .ok_or(ReservationError::TrainNotFound(train_id))?;

        let booking = Booking {
            id: Uuid::new_v4(),
            user_id: actor.id,
            train_id,
            seat_count,
            total_price: seat_count * train.price,
            status: BookingStatus::Confirmed,
            created_at: Utc::now(),
        };

        let booking = self.bookings.create_confirmed(booking).await?;
        info!(
            booking_id = %booking.id,
            train_id = %train_id,
            seat_count,
            "Booking confirmed"
        );
        Ok(booking)
    }

    /// Cancel a confirmed booking and restore its seats to the train.
    ///
    /// The requester must own the booking or be an admin. Cancelling an
    /// already-cancelled booking fails with `InvalidState`; seats are never
    /// restored twice.
    pub async fn cancel_booking(
        &self,
        actor: Actor,
        booking_id: Uuid,
    ) -> ReservationResult<Booking> {
        let booking = self
            .bookings
            .get_booking(booking_id)
            .await?
            .ok_or(ReservationError::BookingNotFound(booking_id))?;

        if !may_manage_booking(&actor, booking.user_id) {
            return Err(ReservationError::Forbidden(
                "booking belongs to another user".to_string(),
            ));
        }

        // The repository re-checks the status inside its atomic unit; this
        // early check only produces the friendlier error outside a race.
        if booking.status != BookingStatus::Confirmed {
            return Err(ReservationError::InvalidState {
                from: booking.status.to_string(),
                to: BookingStatus::Cancelled.to_string(),
            });
        }

        let booking = self.bookings.cancel(booking_id).await?;
        info!(booking_id = %booking.id, train_id = %booking.train_id, "Booking cancelled");
        Ok(booking)
    }

    /// Own bookings, or every booking when the actor is an admin.
    pub async fn list_bookings(&self, actor: Actor) -> ReservationResult<Vec<Booking>> {
        if actor.is_admin {
            self.bookings.list_all().await
        } else {
            self.bookings.list_for_user(actor.id).await
        }
    }

    pub async fn get_booking(&self, id: Uuid) -> ReservationResult<Option<Booking>> {
        self.bookings.get_booking(id).await
    }

    /// Pure read filter over the inventory; snapshot consistency only.
    pub async fn search_trains(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
    ) -> ReservationResult<Vec<Train>> {
        self.trains.search_trains(origin, destination, date).await
    }
}
