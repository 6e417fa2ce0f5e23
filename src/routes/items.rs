//! Item routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use super::error::ApiError;
use super::{Pagination, double_option};
use crate::services::item::{self, Item, ItemPatch};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateItemBody {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateItemBody {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

/// `GET /items`: list a page of items.
pub async fn list_items(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let items = item::list_items(&state.pool, page.skip(), page.limit()).await?;
    Ok(Json(items))
}

/// `POST /items`: create an item.
pub async fn create_item(
    State(state): State<AppState>,
    Json(body): Json<CreateItemBody>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let item = item::create_item(&state.pool, &body.title, body.description.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// `GET /items/{id}`: fetch one item.
pub async fn get_item(State(state): State<AppState>, Path(item_id): Path<i64>) -> Result<Json<Item>, ApiError> {
    Ok(Json(item::get_item(&state.pool, item_id).await?))
}

/// `PUT|PATCH /items/{id}`: update only the supplied fields.
pub async fn update_item(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
    Json(body): Json<UpdateItemBody>,
) -> Result<Json<Item>, ApiError> {
    let patch = ItemPatch { title: body.title, description: body.description };
    Ok(Json(item::update_item(&state.pool, item_id, patch).await?))
}

/// `DELETE /items/{id}`: delete an item.
pub async fn delete_item(State(state): State<AppState>, Path(item_id): Path<i64>) -> Result<StatusCode, ApiError> {
    item::delete_item(&state.pool, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
