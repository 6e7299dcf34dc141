use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use railbook_core::{
    ReservationError, ReservationResult, Train, TrainPatch, TrainRepository,
};

pub struct PgTrainRepository {
    pool: PgPool,
}

impl PgTrainRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct TrainRow {
    id: Uuid,
    name: String,
    origin: String,
    destination: String,
    departure_time: chrono::DateTime<chrono::Utc>,
    arrival_time: chrono::DateTime<chrono::Utc>,
    total_seats: i32,
    available_seats: i32,
    price: i32,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<TrainRow> for Train {
    fn from(row: TrainRow) -> Self {
        Train {
            id: row.id,
            name: row.name,
            origin: row.origin,
            destination: row.destination,
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            total_seats: row.total_seats,
            available_seats: row.available_seats,
            price: row.price,
            created_at: row.created_at,
        }
    }
}

const TRAIN_COLUMNS: &str =
    "id, name, origin, destination, departure_time, arrival_time, total_seats, available_seats, price, created_at";

fn storage_err(e: sqlx::Error) -> ReservationError {
    ReservationError::Storage(e.to_string())
}

#[async_trait]
impl TrainRepository for PgTrainRepository {
    async fn create_train(&self, train: Train) -> ReservationResult<Train> {
        sqlx::query(
            r#"
            INSERT INTO trains (id, name, origin, destination, departure_time, arrival_time, total_seats, available_seats, price, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(train.id)
        .bind(&train.name)
        .bind(&train.origin)
        .bind(&train.destination)
        .bind(train.departure_time)
        .bind(train.arrival_time)
        .bind(train.total_seats)
        .bind(train.available_seats)
        .bind(train.price)
        .bind(train.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(train)
    }

    async fn get_train(&self, id: Uuid) -> ReservationResult<Option<Train>> {
        let row = sqlx::query_as::<_, TrainRow>(&format!(
            "SELECT {TRAIN_COLUMNS} FROM trains WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(row.map(Train::from))
    }

    async fn list_trains(&self) -> ReservationResult<Vec<Train>> {
        let rows = sqlx::query_as::<_, TrainRow>(&format!(
            "SELECT {TRAIN_COLUMNS} FROM trains ORDER BY departure_time"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(rows.into_iter().map(Train::from).collect())
    }

    async fn search_trains(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
    ) -> ReservationResult<Vec<Train>> {
        let rows = sqlx::query_as::<_, TrainRow>(&format!(
            r#"
            SELECT {TRAIN_COLUMNS} FROM trains
            WHERE LOWER(origin) = LOWER($1)
              AND LOWER(destination) = LOWER($2)
              AND DATE(departure_time) = $3
            ORDER BY departure_time
            "#
        ))
        .bind(origin)
        .bind(destination)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(rows.into_iter().map(Train::from).collect())
    }

    async fn update_train(&self, id: Uuid, patch: TrainPatch) -> ReservationResult<Train> {
        // Row lock so the capacity check sees the live booked count; a
        // concurrent reservation waits on the same row.
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        let row = sqlx::query_as::<_, TrainRow>(&format!(
            "SELECT {TRAIN_COLUMNS} FROM trains WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_err)?;

        let mut train = Train::from(row.ok_or(ReservationError::TrainNotFound(id))?);
        train.apply_patch(patch)?;

        sqlx::query(
            r#"
            UPDATE trains
            SET name = $1, origin = $2, destination = $3, departure_time = $4,
                arrival_time = $5, total_seats = $6, available_seats = $7, price = $8
            WHERE id = $9
            "#,
        )
        .bind(&train.name)
        .bind(&train.origin)
        .bind(&train.destination)
        .bind(train.departure_time)
        .bind(train.arrival_time)
        .bind(train.total_seats)
        .bind(train.available_seats)
        .bind(train.price)
        .bind(train.id)
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;

        tx.commit().await.map_err(storage_err)?;

        Ok(train)
    }

    async fn delete_train(&self, id: Uuid) -> ReservationResult<()> {
        let result = sqlx::query("DELETE FROM trains WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(ReservationError::TrainNotFound(id));
        }
        Ok(())
    }
}
