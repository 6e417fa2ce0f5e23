//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the item and list endpoints under the configured API
//! prefix, adds the health checks outside it, and wraps everything in CORS,
//! compression and request tracing layers.

pub mod error;
pub mod items;
pub mod my_lists;

use axum::Router;
use axum::http::{HeaderValue, StatusCode};
use axum::response::Json;
use axum::routing::{get, patch, put};
use serde::{Deserialize, Deserializer};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::{CorsOrigins, Settings};
use crate::state::AppState;

const DEFAULT_PAGE_LIMIT: u32 = 100;

/// `?skip=&limit=` query parameters. Negative values are rejected by the
/// extractor; there is no upper bound on `limit`.
#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

impl Pagination {
    #[must_use]
    pub fn skip(&self) -> i64 {
        i64::from(self.skip)
    }

    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }
}

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
/// Use with `#[serde(default, deserialize_with = "double_option")]`.
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Item and list API routes, relative to the API prefix.
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/items", get(items::list_items).post(items::create_item))
        .route(
            "/items/{id}",
            get(items::get_item)
                .put(items::update_item)
                .patch(items::update_item)
                .delete(items::delete_item),
        )
        .route("/my-lists", get(my_lists::list_my_lists).post(my_lists::create_my_list))
        .route(
            "/my-lists/{id}",
            get(my_lists::get_my_list)
                .put(my_lists::update_my_list)
                .patch(my_lists::update_my_list)
                .delete(my_lists::delete_my_list),
        )
        .route(
            "/my-lists/{id}/locations",
            get(my_lists::list_locations).post(my_lists::add_location),
        )
        .route("/my-lists/{id}/locations/reorder", put(my_lists::reorder_locations))
        .route(
            "/my-lists/{id}/locations/{location_id}",
            patch(my_lists::update_location).delete(my_lists::remove_location),
        )
}

/// Build the full application router.
pub fn app(state: AppState, settings: &Settings) -> Router {
    let api = if settings.api_prefix.is_empty() {
        api_routes()
    } else {
        Router::new().nest(&settings.api_prefix, api_routes())
    };

    api.route("/api/health", get(health))
        .route("/healthz", get(healthz))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&settings.cors_origins))
        .with_state(state)
}

/// CORS for the configured origins. Credentials are only allowed with an
/// explicit origin list.
fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    match origins {
        CorsOrigins::Any => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        CorsOrigins::List(list) => {
            let values: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(%origin, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(values))
                .allow_methods(AllowMethods::mirror_request())
                .allow_headers(AllowHeaders::mirror_request())
                .allow_credentials(true)
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "message": "API is running" }))
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
