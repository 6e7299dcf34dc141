use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ReservationError;

/// A scheduled service with fixed seat capacity and price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Train {
    pub id: Uuid,
    pub name: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub total_seats: i32,
    pub available_seats: i32,
    /// Price per seat in minor currency units.
    pub price: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTrain {
    pub name: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub total_seats: i32,
    pub available_seats: Option<i32>,
    pub price: i32,
}

/// Partial update applied by an admin. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrainPatch {
    pub name: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub total_seats: Option<i32>,
    pub available_seats: Option<i32>,
    pub price: Option<i32>,
}

impl Train {
    pub fn new(id: Uuid, input: NewTrain, now: DateTime<Utc>) -> Result<Self, ReservationError> {
        if input.name.trim().is_empty()
            || input.origin.trim().is_empty()
            || input.destination.trim().is_empty()
        {
            return Err(ReservationError::Validation(
                "name, origin and destination must be non-empty".to_string(),
            ));
        }
        if input.total_seats <= 0 {
            return Err(ReservationError::Validation(
                "total_seats must be positive".to_string(),
            ));
        }
        if input.price < 0 {
            return Err(ReservationError::Validation(
                "price must not be negative".to_string(),
            ));
        }

        let available_seats = input.available_seats.unwrap_or(input.total_seats);
        if available_seats < 0 || available_seats > input.total_seats {
            return Err(ReservationError::InvalidCapacity {
                booked: input.total_seats - available_seats,
                requested_total: input.total_seats,
            });
        }

        Ok(Self {
            id,
            name: input.name,
            origin: input.origin,
            destination: input.destination,
            departure_time: input.departure_time,
            arrival_time: input.arrival_time,
            total_seats: input.total_seats,
            available_seats,
            price: input.price,
            created_at: now,
        })
    }

    /// Seats currently claimed by confirmed bookings.
    pub fn booked_seats(&self) -> i32 {
        self.total_seats - self.available_seats
    }

    /// Apply an admin patch while preserving `0 <= available_seats <= total_seats`.
    ///
    /// When `total_seats` changes without an explicit `available_seats`,
    /// availability is re-derived as `new_total - booked`. Shrinking capacity
    /// below the booked count fails with `InvalidCapacity`.
    pub fn apply_patch(&mut self, patch: TrainPatch) -> Result<(), ReservationError> {
        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(ReservationError::Validation(
                    "name must be non-empty".to_string(),
                ));
            }
            self.name = name;
        }
        if let Some(origin) = patch.origin {
            self.origin = origin;
        }
        if let Some(destination) = patch.destination {
            self.destination = destination;
        }
        if let Some(departure_time) = patch.departure_time {
            self.departure_time = departure_time;
        }
        if let Some(arrival_time) = patch.arrival_time {
            self.arrival_time = arrival_time;
        }
        if let Some(price) = patch.price {
            if price < 0 {
                return Err(ReservationError::Validation(
                    "price must not be negative".to_string(),
                ));
            }
            self.price = price;
        }

        let booked = self.booked_seats();

        if let Some(total) = patch.total_seats {
            if total <= 0 {
                return Err(ReservationError::Validation(
                    "total_seats must be positive".to_string(),
                ));
            }
            if booked > total {
                return Err(ReservationError::InvalidCapacity {
                    booked,
                    requested_total: total,
                });
            }
            self.total_seats = total;
            self.available_seats = total - booked;
        }

        if let Some(available) = patch.available_seats {
            if available < 0 || available > self.total_seats {
                return Err(ReservationError::InvalidCapacity {
                    booked: self.total_seats - available,
                    requested_total: self.total_seats,
                });
            }
            self.available_seats = available;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Train {
        Train::new(
            Uuid::new_v4(),
            NewTrain {
                name: "Night Express".to_string(),
                origin: "Delhi".to_string(),
                destination: "Mumbai".to_string(),
                departure_time: Utc::now(),
                arrival_time: Utc::now(),
                total_seats: 10,
                available_seats: None,
                price: 100,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_train_defaults_availability_to_capacity() {
        let train = sample();
        assert_eq!(train.available_seats, 10);
        assert_eq!(train.booked_seats(), 0);
    }

    #[test]
    fn test_shrinking_capacity_below_booked_fails() {
        let mut train = sample();
        train.available_seats = 7; // 3 seats booked

        let result = train.apply_patch(TrainPatch {
            total_seats: Some(2),
            ..Default::default()
        });
        assert!(matches!(
            result,
            Err(ReservationError::InvalidCapacity { booked: 3, requested_total: 2 })
        ));
        // Failed patch leaves seat fields untouched
        assert_eq!(train.total_seats, 10);
        assert_eq!(train.available_seats, 7);
    }

    #[test]
    fn test_capacity_change_rederives_availability() {
        let mut train = sample();
        train.available_seats = 7; // 3 seats booked

        train
            .apply_patch(TrainPatch {
                total_seats: Some(5),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(train.total_seats, 5);
        assert_eq!(train.available_seats, 2);
        assert_eq!(train.booked_seats(), 3);
    }

    #[test]
    fn test_explicit_availability_out_of_range_fails() {
        let mut train = sample();
        let result = train.apply_patch(TrainPatch {
            available_seats: Some(11),
            ..Default::default()
        });
        assert!(matches!(result, Err(ReservationError::InvalidCapacity { .. })));

        let result = train.apply_patch(TrainPatch {
            available_seats: Some(-1),
            ..Default::default()
        });
        assert!(matches!(result, Err(ReservationError::InvalidCapacity { .. })));
    }

    #[test]
    fn test_empty_name_rejected() {
        let result = Train::new(
            Uuid::new_v4(),
            NewTrain {
                name: "  ".to_string(),
                origin: "Delhi".to_string(),
                destination: "Mumbai".to_string(),
                departure_time: Utc::now(),
                arrival_time: Utc::now(),
                total_seats: 10,
                available_seats: None,
                price: 100,
            },
            Utc::now(),
        );
        assert!(matches!(result, Err(ReservationError::Validation(_))));
    }
}
