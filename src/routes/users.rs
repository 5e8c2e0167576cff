use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::user::{SqliteUserRepository, User, UserDraft, UserError, UserId, UserPatch, UserRepository};

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
}

/// GET /users
async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    let repo = SqliteUserRepository::new(state.db.clone());
    Ok(Json(repo.find_all().await?))
}

/// GET /users/{id}
async fn get_user(
    State(state): State<AppState>,
    id: Result<Path<UserId>, PathRejection>,
) -> AppResult<Json<User>> {
    let Path(id) = id?;
    let repo = SqliteUserRepository::new(state.db.clone());
    let user = repo
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;
    Ok(Json(user))
}

/// POST /users
async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<UserDraft>, JsonRejection>,
) -> AppResult<Json<User>> {
    let Json(draft) = payload?;
    let new_user = draft.validate()?;

    let repo = SqliteUserRepository::new(state.db.clone());
    let user = repo.create(&new_user).await?;

    tracing::info!(user_id = user.id, "Created user");
    Ok(Json(user))
}

/// PATCH /users/{id}
async fn update_user(
    State(state): State<AppState>,
    id: Result<Path<UserId>, PathRejection>,
    payload: Result<Json<UserPatch>, JsonRejection>,
) -> AppResult<Json<User>> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    let repo = SqliteUserRepository::new(state.db.clone());

    let mut user = repo
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;
    user.apply(patch)?;

    if !repo.update(&user).await? {
        return Err(AppError::NotFound(format!("User {} not found", id)));
    }

    tracing::info!(user_id = id, "Updated user");
    Ok(Json(user))
}

/// DELETE /users/{id}
///
/// Idempotent: removing an unknown user still succeeds.
async fn delete_user(
    State(state): State<AppState>,
    id: Result<Path<UserId>, PathRejection>,
) -> AppResult<StatusCode> {
    let Path(id) = id?;
    let repo = SqliteUserRepository::new(state.db.clone());
    if repo.delete(id).await? {
        tracing::info!(user_id = id, "Deleted user");
    } else {
        tracing::debug!(user_id = id, "Delete of unknown user");
    }
    Ok(StatusCode::OK)
}
