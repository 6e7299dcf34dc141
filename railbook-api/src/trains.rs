use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use railbook_core::{NewTrain, Train, TrainPatch, TrainRepository as _};

use crate::error::AppError;
use crate::middleware::admin_middleware;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TrainSearchQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub date: Option<String>,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/api/trains", post(create_train))
        .route("/api/trains/{id}", put(update_train).delete(delete_train))
        .route_layer(middleware::from_fn_with_state(state, admin_middleware));

    Router::new()
        .route("/api/trains", get(list_trains))
        .route("/api/trains/{id}", get(get_train))
        .merge(admin)
}

/// GET /api/trains[?from=&to=&date=]
async fn list_trains(
    State(state): State<AppState>,
    Query(query): Query<TrainSearchQuery>,
) -> Result<Json<Vec<Train>>, AppError> {
    let trains = match (&query.from, &query.to, &query.date) {
        (Some(from), Some(to), Some(date)) => {
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
                AppError::ValidationError("date must be formatted YYYY-MM-DD".to_string())
            })?;
            state.reservations.search_trains(from, to, date).await?
        }
        _ => state.trains.list_trains().await?,
    };

    Ok(Json(trains))
}

/// GET /api/trains/:id
async fn get_train(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Train>, AppError> {
    let train = state
        .trains
        .get_train(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("Train not found: {id}")))?;
    Ok(Json(train))
}

/// POST /api/trains (admin)
async fn create_train(
    State(state): State<AppState>,
    Json(req): Json<NewTrain>,
) -> Result<(StatusCode, Json<Train>), AppError> {
    let train = Train::new(Uuid::new_v4(), req, Utc::now())?;
    let train = state.trains.create_train(train).await?;

    info!(train_id = %train.id, name = %train.name, "Train created");

    Ok((StatusCode::CREATED, Json(train)))
}

/// PUT /api/trains/:id (admin)
async fn update_train(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<TrainPatch>,
) -> Result<Json<Train>, AppError> {
    let train = state.trains.update_train(id, patch).await?;

    info!(train_id = %train.id, "Train updated");

    Ok(Json(train))
}

/// DELETE /api/trains/:id (admin)
async fn delete_train(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.trains.delete_train(id).await?;

    info!(train_id = %id, "Train deleted");

    Ok(StatusCode::NO_CONTENT)
}
