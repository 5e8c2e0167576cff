use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::booking::{BookingRepository, SqliteBookingRepository};
use crate::comment::{Comment, CommentDraft, CommentError, CommentRepository, SqliteCommentRepository};
use crate::error::{AppError, AppResult};
use crate::extractors::SharerId;
use crate::item::{
    Item, ItemDetails, ItemDraft, ItemError, ItemId, ItemPatch, ItemRepository,
    SqliteItemRepository,
};
use crate::pagination::Page;
use crate::request::{RequestRepository, SqliteRequestRepository};
use crate::routes::{now, require_user};
use crate::state::AppState;
use crate::user::UserId;

impl From<ItemError> for AppError {
    fn from(err: ItemError) -> Self {
        match err {
            ItemError::NotOwner { .. } => AppError::Forbidden(err.to_string()),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}

impl From<CommentError> for AppError {
    fn from(err: CommentError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub text: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route("/items/search", get(search_items))
        .route("/items/{id}", get(get_item).patch(update_item))
        .route("/items/{id}/comment", post(add_comment))
}

fn item_not_found(id: ItemId) -> AppError {
    AppError::NotFound(format!("Item {} not found", id))
}

/// Attaches comments and, for the owner only, the surrounding approved bookings.
async fn details(
    state: &AppState,
    item: Item,
    viewer: UserId,
    now: NaiveDateTime,
) -> AppResult<ItemDetails> {
    let (last_booking, next_booking) = if item.owner_id == viewer {
        let bookings = SqliteBookingRepository::new(state.db.clone());
        (
            bookings.last_for_item(item.id, now).await?,
            bookings.next_for_item(item.id, now).await?,
        )
    } else {
        (None, None)
    };

    let comments = SqliteCommentRepository::new(state.db.clone())
        .find_by_item(item.id)
        .await?;

    Ok(ItemDetails {
        item,
        last_booking,
        next_booking,
        comments,
    })
}

/// GET /items
async fn list_items(
    State(state): State<AppState>,
    SharerId(owner): SharerId,
    page: Page,
) -> AppResult<Json<Vec<ItemDetails>>> {
    let items = SqliteItemRepository::new(state.db.clone())
        .find_by_owner(owner, page)
        .await?;

    let now = now();
    let mut result = Vec::with_capacity(items.len());
    for item in items {
        result.push(details(&state, item, owner, now).await?);
    }
    Ok(Json(result))
}

/// GET /items/{id}
async fn get_item(
    State(state): State<AppState>,
    SharerId(viewer): SharerId,
    id: Result<Path<ItemId>, PathRejection>,
) -> AppResult<Json<ItemDetails>> {
    let Path(id) = id?;
    let item = SqliteItemRepository::new(state.db.clone())
        .find(id)
        .await?
        .ok_or_else(|| item_not_found(id))?;

    Ok(Json(details(&state, item, viewer, now()).await?))
}

/// POST /items
async fn create_item(
    State(state): State<AppState>,
    SharerId(owner): SharerId,
    payload: Result<Json<ItemDraft>, JsonRejection>,
) -> AppResult<Json<Item>> {
    let Json(draft) = payload?;
    let mut new_item = draft.validate()?;
    require_user(&state, owner).await?;

    if let Some(request_id) = new_item.request_id {
        let exists = SqliteRequestRepository::new(state.db.clone())
            .find(request_id)
            .await?
            .is_some();
        if !exists {
            tracing::debug!(request_id, "Ignoring unknown request on new item");
            new_item.request_id = None;
        }
    }

    let item = SqliteItemRepository::new(state.db.clone())
        .create(owner, &new_item)
        .await?;

    tracing::info!(item_id = item.id, owner_id = owner, "Created item");
    Ok(Json(item))
}

/// PATCH /items/{id}
async fn update_item(
    State(state): State<AppState>,
    SharerId(user): SharerId,
    id: Result<Path<ItemId>, PathRejection>,
    payload: Result<Json<ItemPatch>, JsonRejection>,
) -> AppResult<Json<Item>> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    let repo = SqliteItemRepository::new(state.db.clone());

    let mut item = repo.find(id).await?.ok_or_else(|| item_not_found(id))?;
    item.ensure_owned_by(user).inspect_err(|e| {
        tracing::warn!("Rejected item update: {}", e);
    })?;
    item.apply(patch)?;

    if !repo.update(&item).await? {
        return Err(item_not_found(id));
    }

    tracing::info!(item_id = id, "Updated item");
    Ok(Json(item))
}

/// GET /items/search?text=
async fn search_items(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
    page: Page,
) -> AppResult<Json<Vec<Item>>> {
    let Query(params) = params?;
    let text = params.text.unwrap_or_default();
    let text = text.trim();
    if text.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let items = SqliteItemRepository::new(state.db.clone())
        .search(text, page)
        .await?;
    Ok(Json(items))
}

/// POST /items/{id}/comment
async fn add_comment(
    State(state): State<AppState>,
    SharerId(author): SharerId,
    id: Result<Path<ItemId>, PathRejection>,
    payload: Result<Json<CommentDraft>, JsonRejection>,
) -> AppResult<Json<Comment>> {
    let Path(id) = id?;
    let Json(draft) = payload?;
    let text = draft.validate()?;

    let item = SqliteItemRepository::new(state.db.clone())
        .find(id)
        .await?
        .ok_or_else(|| item_not_found(id))?;
    require_user(&state, author).await?;

    let now = now();
    let rented = SqliteBookingRepository::new(state.db.clone())
        .has_completed_booking(item.id, author, now)
        .await?;
    if !rented {
        let err = CommentError::NoCompletedBooking {
            author,
            item: item.id,
        };
        tracing::warn!("Rejected comment: {}", err);
        return Err(err.into());
    }

    let comment = SqliteCommentRepository::new(state.db.clone())
        .create(item.id, author, &text, now)
        .await?;

    tracing::info!(comment_id = comment.id, item_id = item.id, "Added comment");
    Ok(Json(comment))
}
