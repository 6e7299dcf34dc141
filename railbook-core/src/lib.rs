pub mod access;
pub mod booking;
pub mod error;
pub mod repository;
pub mod reservation;
pub mod train;
pub mod user;

pub use access::Actor;
pub use booking::{Booking, BookingStatus};
pub use error::{ReservationError, ReservationResult};
pub use repository::{BookingRepository, TrainRepository, UserRepository};
pub use reservation::{BusinessRules, ReservationService};
pub use train::{NewTrain, Train, TrainPatch};
pub use user::{User, UserProfile};
