//! List and nested location routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use super::error::ApiError;
use super::{Pagination, double_option};
use crate::services::my_list::{self, Location, LocationPatch, MyListPatch, MyListWithLocations, NewLocation};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateMyListBody {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateMyListBody {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateLocationBody {
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub place_id: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateLocationBody {
    pub name: Option<String>,
    pub address: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(default, deserialize_with = "double_option")]
    pub place_id: Option<Option<String>>,
}

#[derive(Deserialize)]
pub struct ReorderBody {
    pub location_ids: Vec<i64>,
}

// =============================================================================
// LISTS
// =============================================================================

/// `GET /my-lists`: lists with locations, most recently updated first.
pub async fn list_my_lists(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<MyListWithLocations>>, ApiError> {
    let lists = my_list::list_my_lists(&state.pool, page.skip(), page.limit()).await?;
    Ok(Json(lists))
}

/// `POST /my-lists`: create an empty list.
pub async fn create_my_list(
    State(state): State<AppState>,
    Json(body): Json<CreateMyListBody>,
) -> Result<(StatusCode, Json<MyListWithLocations>), ApiError> {
    let list = my_list::create_my_list(&state.pool, &body.name, body.description.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(list)))
}

/// `GET /my-lists/{id}`: fetch one list with its locations.
pub async fn get_my_list(
    State(state): State<AppState>,
    Path(list_id): Path<i64>,
) -> Result<Json<MyListWithLocations>, ApiError> {
    Ok(Json(my_list::get_my_list(&state.pool, list_id).await?))
}

/// `PUT|PATCH /my-lists/{id}`: update name and/or description.
pub async fn update_my_list(
    State(state): State<AppState>,
    Path(list_id): Path<i64>,
    Json(body): Json<UpdateMyListBody>,
) -> Result<Json<MyListWithLocations>, ApiError> {
    let patch = MyListPatch { name: body.name, description: body.description };
    Ok(Json(my_list::update_my_list(&state.pool, list_id, patch).await?))
}

/// `DELETE /my-lists/{id}`: delete a list and all its locations.
pub async fn delete_my_list(State(state): State<AppState>, Path(list_id): Path<i64>) -> Result<StatusCode, ApiError> {
    my_list::delete_my_list(&state.pool, list_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// LOCATIONS
// =============================================================================

/// `GET /my-lists/{id}/locations`: a list's locations in order.
pub async fn list_locations(
    State(state): State<AppState>,
    Path(list_id): Path<i64>,
) -> Result<Json<Vec<Location>>, ApiError> {
    Ok(Json(my_list::list_locations(&state.pool, list_id).await?))
}

/// `POST /my-lists/{id}/locations`: append a location.
pub async fn add_location(
    State(state): State<AppState>,
    Path(list_id): Path<i64>,
    Json(body): Json<CreateLocationBody>,
) -> Result<(StatusCode, Json<Location>), ApiError> {
    let new = NewLocation {
        name: body.name,
        address: body.address,
        lat: body.lat,
        lng: body.lng,
        place_id: body.place_id,
    };
    let location = my_list::add_location(&state.pool, list_id, new).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

/// `PATCH /my-lists/{id}/locations/{location_id}`: update location fields.
pub async fn update_location(
    State(state): State<AppState>,
    Path((list_id, location_id)): Path<(i64, i64)>,
    Json(body): Json<UpdateLocationBody>,
) -> Result<Json<Location>, ApiError> {
    let patch = LocationPatch {
        name: body.name,
        address: body.address,
        lat: body.lat,
        lng: body.lng,
        place_id: body.place_id,
    };
    Ok(Json(my_list::update_location(&state.pool, list_id, location_id, patch).await?))
}

/// `DELETE /my-lists/{id}/locations/{location_id}`: remove a location.
pub async fn remove_location(
    State(state): State<AppState>,
    Path((list_id, location_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    my_list::remove_location(&state.pool, list_id, location_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /my-lists/{id}/locations/reorder`: set the order of locations.
pub async fn reorder_locations(
    State(state): State<AppState>,
    Path(list_id): Path<i64>,
    Json(body): Json<ReorderBody>,
) -> Result<Json<Vec<Location>>, ApiError> {
    Ok(Json(my_list::reorder_locations(&state.pool, list_id, &body.location_ids).await?))
}

#[cfg(test)]
#[path = "my_lists_test.rs"]
mod tests;
