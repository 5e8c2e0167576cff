pub mod bookings;
pub mod items;
pub mod requests;
pub mod users;

use axum::Router;
use chrono::{NaiveDateTime, Utc};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::user::{SqliteUserRepository, User, UserId, UserRepository};

/// Full REST surface with tracing and CORS applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(users::router())
        .merge(items::router())
        .merge(bookings::router())
        .merge(requests::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Loads the acting user, or 404 if the header names nobody.
pub(crate) async fn require_user(state: &AppState, id: UserId) -> AppResult<User> {
    SqliteUserRepository::new(state.db.clone())
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
}

/// Wall clock used for every time-window decision, in naive UTC.
pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}
