use uuid::Uuid;

/// Business error taxonomy shared by the workflow and the storage backends.
#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("Train not found: {0}")]
    TrainNotFound(Uuid),

    #[error("Booking not found: {0}")]
    BookingNotFound(Uuid),

    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("Insufficient seats: requested {requested}, available {available}")]
    InsufficientSeats { requested: i32, available: i32 },

    #[error("Invalid capacity: {booked} seats booked, cannot hold total of {requested_total}")]
    InvalidCapacity { booked: i32, requested_total: i32 },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidState { from: String, to: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type ReservationResult<T> = Result<T, ReservationError>;
