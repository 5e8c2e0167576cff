use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::booking::{
    Booking, BookingDraft, BookingError, BookingId, BookingRepository, BookingState,
    SqliteBookingRepository,
};
use crate::error::{AppError, AppResult};
use crate::extractors::SharerId;
use crate::item::{ItemRepository, SqliteItemRepository};
use crate::pagination::Page;
use crate::routes::{now, require_user};
use crate::state::AppState;

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            // Strangers are not told the booking exists
            BookingError::NotVisible { .. } | BookingError::OwnItem(_) => {
                AppError::NotFound(err.to_string())
            }
            BookingError::NotItemOwner { .. } => AppError::Forbidden(err.to_string()),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}

#[derive(Deserialize)]
pub struct StateParams {
    pub state: Option<String>,
}

#[derive(Deserialize)]
pub struct DecisionParams {
    pub approved: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(list_for_booker).post(create_booking))
        .route("/bookings/owner", get(list_for_owner))
        .route("/bookings/{id}", get(get_booking).patch(decide_booking))
}

fn booking_not_found(id: BookingId) -> AppError {
    AppError::NotFound(format!("Booking {} not found", id))
}

fn parse_state(params: Result<Query<StateParams>, QueryRejection>) -> AppResult<BookingState> {
    let Query(params) = params?;
    match params.state {
        Some(raw) => Ok(raw.parse::<BookingState>()?),
        None => Ok(BookingState::default()),
    }
}

/// POST /bookings
async fn create_booking(
    State(state): State<AppState>,
    SharerId(booker): SharerId,
    payload: Result<Json<BookingDraft>, JsonRejection>,
) -> AppResult<Json<Booking>> {
    let Json(draft) = payload?;
    let new_booking = draft.validate(now())?;
    require_user(&state, booker).await?;

    let item = SqliteItemRepository::new(state.db.clone())
        .find(new_booking.item_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item {} not found", new_booking.item_id)))?;
    new_booking.check_item(&item, booker).inspect_err(|e| {
        tracing::warn!("Rejected booking: {}", e);
    })?;

    let booking = SqliteBookingRepository::new(state.db.clone())
        .create(booker, &new_booking)
        .await?;

    tracing::info!(
        booking_id = booking.id,
        item_id = item.id,
        booker_id = booker,
        "Created booking"
    );
    Ok(Json(booking))
}

/// PATCH /bookings/{id}?approved=
async fn decide_booking(
    State(state): State<AppState>,
    SharerId(user): SharerId,
    id: Result<Path<BookingId>, PathRejection>,
    params: Result<Query<DecisionParams>, QueryRejection>,
) -> AppResult<Json<Booking>> {
    let Path(id) = id?;
    let Query(DecisionParams { approved }) = params?;
    let repo = SqliteBookingRepository::new(state.db.clone());

    let mut booking = repo.find(id).await?.ok_or_else(|| booking_not_found(id))?;
    booking.decide(user, approved).inspect_err(|e| {
        tracing::warn!("Rejected booking decision: {}", e);
    })?;

    if !repo.update_status(id, booking.status).await? {
        return Err(booking_not_found(id));
    }

    tracing::info!(booking_id = id, status = %booking.status, "Decided booking");
    Ok(Json(booking))
}

/// GET /bookings/{id}
async fn get_booking(
    State(state): State<AppState>,
    SharerId(user): SharerId,
    id: Result<Path<BookingId>, PathRejection>,
) -> AppResult<Json<Booking>> {
    let Path(id) = id?;
    let booking = SqliteBookingRepository::new(state.db.clone())
        .find(id)
        .await?
        .ok_or_else(|| booking_not_found(id))?;
    booking.ensure_visible_to(user)?;
    Ok(Json(booking))
}

/// GET /bookings?state=
async fn list_for_booker(
    State(state): State<AppState>,
    SharerId(user): SharerId,
    params: Result<Query<StateParams>, QueryRejection>,
    page: Page,
) -> AppResult<Json<Vec<Booking>>> {
    let filter = parse_state(params)?;
    require_user(&state, user).await?;

    let bookings = SqliteBookingRepository::new(state.db.clone())
        .find_by_booker(user, filter, now(), page)
        .await?;
    Ok(Json(bookings))
}

/// GET /bookings/owner?state=
async fn list_for_owner(
    State(state): State<AppState>,
    SharerId(user): SharerId,
    params: Result<Query<StateParams>, QueryRejection>,
    page: Page,
) -> AppResult<Json<Vec<Booking>>> {
    let filter = parse_state(params)?;
    require_user(&state, user).await?;

    let bookings = SqliteBookingRepository::new(state.db.clone())
        .find_by_owner(user, filter, now(), page)
        .await?;
    Ok(Json(bookings))
}
