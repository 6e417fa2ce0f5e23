//! Item service: flat CRUD over the `items` table.
//!
//! Items have no relationships. Each operation is one SQL statement, so no
//! explicit transaction is needed.

use serde::Serialize;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::info;

use super::{FieldError, short_text};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("item not found: {0}")]
    NotFound(i64),
    #[error(transparent)]
    Validation(#[from] FieldError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Row of the `items` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Item {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Partial update. `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
}

const ITEM_COLUMNS: &str = "id, title, description, created_at, updated_at";

// =============================================================================
// CRUD
// =============================================================================

/// List a page of items in id order.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_items(pool: &PgPool, skip: i64, limit: i64) -> Result<Vec<Item>, ItemError> {
    let items = sqlx::query_as::<_, Item>(&format!(
        "SELECT {ITEM_COLUMNS} FROM items ORDER BY id ASC OFFSET $1 LIMIT $2"
    ))
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

/// Create a new item.
///
/// # Errors
///
/// Returns a validation error for an empty or overlong title, or a database
/// error.
pub async fn create_item(pool: &PgPool, title: &str, description: Option<&str>) -> Result<Item, ItemError> {
    let title = short_text("title", title)?;

    let item = sqlx::query_as::<_, Item>(&format!(
        "INSERT INTO items (title, description) VALUES ($1, $2) RETURNING {ITEM_COLUMNS}"
    ))
    .bind(&title)
    .bind(description)
    .fetch_one(pool)
    .await?;

    info!(item_id = item.id, "item created");
    Ok(item)
}

/// Fetch one item.
///
/// # Errors
///
/// Returns `NotFound` if absent, or a database error.
pub async fn get_item(pool: &PgPool, item_id: i64) -> Result<Item, ItemError> {
    sqlx::query_as::<_, Item>(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"))
        .bind(item_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ItemError::NotFound(item_id))
}

/// Overwrite only the supplied fields and refresh `updated_at`.
///
/// # Errors
///
/// Returns `NotFound` if absent, a validation error for an empty or overlong
/// title, or a database error.
pub async fn update_item(pool: &PgPool, item_id: i64, patch: ItemPatch) -> Result<Item, ItemError> {
    let title = patch.title.as_deref().map(|t| short_text("title", t)).transpose()?;
    let (set_description, description) = match patch.description {
        Some(value) => (true, value),
        None => (false, None),
    };

    sqlx::query_as::<_, Item>(&format!(
        "UPDATE items SET \
             title = COALESCE($2, title), \
             description = CASE WHEN $3 THEN $4 ELSE description END, \
             updated_at = now() \
         WHERE id = $1 \
         RETURNING {ITEM_COLUMNS}"
    ))
    .bind(item_id)
    .bind(title)
    .bind(set_description)
    .bind(description)
    .fetch_optional(pool)
    .await?
    .ok_or(ItemError::NotFound(item_id))
}

/// Delete one item.
///
/// # Errors
///
/// Returns `NotFound` if absent, or a database error.
pub async fn delete_item(pool: &PgPool, item_id: i64) -> Result<(), ItemError> {
    let result = sqlx::query("DELETE FROM items WHERE id = $1")
        .bind(item_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ItemError::NotFound(item_id));
    }
    info!(item_id, "item deleted");
    Ok(())
}

#[cfg(test)]
#[path = "item_test.rs"]
mod tests;
