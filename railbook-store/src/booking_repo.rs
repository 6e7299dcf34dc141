use async_trait::async_trait;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use railbook_core::{
    Booking, BookingRepository, BookingStatus, ReservationError, ReservationResult,
};

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Uuid,
    train_id: Uuid,
    seat_count: i32,
    total_price: i32,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = ReservationError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = BookingStatus::parse(&row.status).ok_or_else(|| {
            ReservationError::Storage(format!("Unknown booking status: {}", row.status))
        })?;
        Ok(Booking {
            id: row.id,
            user_id: row.user_id,
            train_id: row.train_id,
            seat_count: row.seat_count,
            total_price: row.total_price,
            status,
            created_at: row.created_at,
        })
    }
}

const BOOKING_COLUMNS: &str =
    "id, user_id, train_id, seat_count, total_price, status, created_at";

fn storage_err(e: sqlx::Error) -> ReservationError {
    ReservationError::Storage(e.to_string())
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn create_confirmed(&self, booking: Booking) -> ReservationResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        // Conditional decrement is the serialization point: zero affected
        // rows means the train is gone or the seats are.
        let decremented = sqlx::query(
            r#"
            UPDATE trains
            SET available_seats = available_seats - $1
            WHERE id = $2 AND available_seats >= $1
            "#,
        )
        .bind(booking.seat_count)
        .bind(booking.train_id)
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;

        if decremented.rows_affected() == 0 {
            let available: Option<(i32,)> =
                sqlx::query_as("SELECT available_seats FROM trains WHERE id = $1")
                    .bind(booking.train_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(storage_err)?;

            return Err(match available {
                None => ReservationError::TrainNotFound(booking.train_id),
                Some((available,)) => ReservationError::InsufficientSeats {
                    requested: booking.seat_count,
                    available,
                },
            });
        }

        sqlx::query(
            r#"
            INSERT INTO bookings (id, user_id, train_id, seat_count, total_price, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.train_id)
        .bind(booking.seat_count)
        .bind(booking.total_price)
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;

        tx.commit().await.map_err(storage_err)?;

        Ok(booking)
    }

    async fn cancel(&self, booking_id: Uuid) -> ReservationResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        // Status flip and seat restoration commit together; the status guard
        // makes a double cancel lose cleanly instead of restoring twice.
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            UPDATE bookings SET status = $1
            WHERE id = $2 AND status = $3
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(BookingStatus::Cancelled.as_str())
        .bind(booking_id)
        .bind(BookingStatus::Confirmed.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_err)?;

        let booking = match row {
            Some(row) => Booking::try_from(row)?,
            None => {
                let existing = sqlx::query_as::<_, BookingRow>(&format!(
                    "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
                ))
                .bind(booking_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(storage_err)?;

                return Err(match existing {
                    None => ReservationError::BookingNotFound(booking_id),
                    Some(row) => ReservationError::InvalidState {
                        from: row.status,
                        to: BookingStatus::Cancelled.as_str().to_string(),
                    },
                });
            }
        };

        let restored = sqlx::query(
            r#"
            UPDATE trains
            SET available_seats = available_seats + $1
            WHERE id = $2 AND available_seats + $1 <= total_seats
            "#,
        )
        .bind(booking.seat_count)
        .bind(booking.train_id)
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;

        if restored.rows_affected() == 0 {
            // Train deleted since booking, or capacity shrunk underneath it.
            // The cancellation still stands.
            warn!(
                booking_id = %booking.id,
                train_id = %booking.train_id,
                "Cancelled booking could not restore seats"
            );
        }

        tx.commit().await.map_err(storage_err)?;

        Ok(booking)
    }

    async fn get_booking(&self, id: Uuid) -> ReservationResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.map(Booking::try_from).transpose()
    }

    async fn list_for_user(&self, user_id: Uuid) -> ReservationResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn list_all(&self) -> ReservationResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.into_iter().map(Booking::try_from).collect()
    }
}
