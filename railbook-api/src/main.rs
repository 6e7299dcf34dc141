use std::net::SocketAddr;
use std::sync::Arc;

use railbook_api::{app, AppState, AuthConfig};
use railbook_core::{
    BookingRepository, ReservationService, TrainRepository, UserRepository,
};
use railbook_store::{DbClient, PgBookingRepository, PgTrainRepository, PgUserRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "railbook_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = railbook_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Railbook API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to database");
    db.migrate().await.expect("Failed to run migrations");

    let trains: Arc<dyn TrainRepository> = Arc::new(PgTrainRepository::new(db.pool.clone()));
    let bookings: Arc<dyn BookingRepository> = Arc::new(PgBookingRepository::new(db.pool.clone()));
    let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(db.pool.clone()));

    let reservations = Arc::new(ReservationService::new(
        trains.clone(),
        bookings.clone(),
        config.business_rules.clone(),
    ));

    let app_state = AppState {
        users,
        trains,
        reservations,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
