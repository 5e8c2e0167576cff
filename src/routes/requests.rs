use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::error::{AppError, AppResult};
use crate::extractors::SharerId;
use crate::pagination::Page;
use crate::request::{
    ItemRequest, RequestDraft, RequestError, RequestId, RequestRepository,
    SqliteRequestRepository,
};
use crate::routes::{now, require_user};
use crate::state::AppState;

impl From<RequestError> for AppError {
    fn from(err: RequestError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/requests", get(list_own).post(create_request))
        .route("/requests/all", get(list_others))
        .route("/requests/{id}", get(get_request))
}

/// POST /requests
async fn create_request(
    State(state): State<AppState>,
    SharerId(user): SharerId,
    payload: Result<Json<RequestDraft>, JsonRejection>,
) -> AppResult<Json<ItemRequest>> {
    let Json(draft) = payload?;
    let description = draft.validate()?;
    require_user(&state, user).await?;

    let request = SqliteRequestRepository::new(state.db.clone())
        .create(user, &description, now())
        .await?;

    tracing::info!(request_id = request.id, requester_id = user, "Created item request");
    Ok(Json(request))
}

/// GET /requests
async fn list_own(
    State(state): State<AppState>,
    SharerId(user): SharerId,
) -> AppResult<Json<Vec<ItemRequest>>> {
    require_user(&state, user).await?;
    let requests = SqliteRequestRepository::new(state.db.clone())
        .find_by_requester(user)
        .await?;
    Ok(Json(requests))
}

/// GET /requests/all
async fn list_others(
    State(state): State<AppState>,
    SharerId(user): SharerId,
    page: Page,
) -> AppResult<Json<Vec<ItemRequest>>> {
    require_user(&state, user).await?;
    let requests = SqliteRequestRepository::new(state.db.clone())
        .find_by_others(user, page)
        .await?;
    Ok(Json(requests))
}

/// GET /requests/{id}
async fn get_request(
    State(state): State<AppState>,
    SharerId(user): SharerId,
    id: Result<Path<RequestId>, PathRejection>,
) -> AppResult<Json<ItemRequest>> {
    let Path(id) = id?;
    require_user(&state, user).await?;
    let request = SqliteRequestRepository::new(state.db.clone())
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Request {} not found", id)))?;
    Ok(Json(request))
}
