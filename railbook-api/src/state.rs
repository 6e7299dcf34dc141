use std::sync::Arc;

use railbook_core::{ReservationService, TrainRepository, UserRepository};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub trains: Arc<dyn TrainRepository>,
    pub reservations: Arc<ReservationService>,
    pub auth: AuthConfig,
}
