//! List service: lists, their ordered locations, cascade delete, reorder.
//!
//! DESIGN
//! ======
//! A list and its locations form one consistency boundary. Every operation
//! that changes the set or order of a list's locations (append, remove,
//! reorder, delete) runs inside one transaction that first takes a row lock
//! on the parent list, so writers to the same list serialize in Postgres. Nothing is held in memory between requests; several server
//! processes may share the database.
//!
//! ORDERING
//! ========
//! A new location gets `order_index` = number of locations already in the
//! list. Removal never renumbers. Reorder assigns `order_index = position`
//! to each id it is given and leaves ids it is not given untouched, so only
//! a reorder that names every location restores a dense `0..n-1` sequence.
//! Both rules are kept for compatibility with existing clients even though
//! they can produce duplicate indices after interleaved edits.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use sqlx::{PgConnection, PgPool, QueryBuilder};
use time::OffsetDateTime;
use tracing::info;

use super::{FieldError, MAX_SHORT_TEXT, check_length, required_text, short_text};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum MyListError {
    #[error("list not found: {0}")]
    ListNotFound(i64),
    #[error("location {location_id} not found in list {list_id}")]
    LocationNotFound { list_id: i64, location_id: i64 },
    #[error(transparent)]
    Validation(#[from] FieldError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Row of the `my_lists` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MyList {
    pub id: i64,
    pub name: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Row of the `locations` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Location {
    pub id: i64,
    pub my_list_id: i64,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub place_id: Option<String>,
    pub order_index: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A list together with its locations in `order_index` order.
#[derive(Debug, Clone, Serialize)]
pub struct MyListWithLocations {
    #[serde(flatten)]
    pub list: MyList,
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, Default)]
pub struct MyListPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewLocation {
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub place_id: Option<String>,
}

/// Partial location update. `place_id: Some(None)` clears the reference.
#[derive(Debug, Clone, Default)]
pub struct LocationPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub place_id: Option<Option<String>>,
}

const LIST_COLUMNS: &str = "id, name, description, created_at, updated_at";
const LOCATION_COLUMNS: &str = "id, my_list_id, name, address, lat, lng, place_id, order_index, created_at";

// =============================================================================
// ORDERING RULES
// =============================================================================

/// `order_index` for a location appended to a list that already holds
/// `existing_count` locations.
pub fn append_index(existing_count: i64) -> Result<i32, FieldError> {
    i32::try_from(existing_count).map_err(|_| FieldError::new("order_index", "list holds too many locations"))
}

/// Validate a reorder request against the list's current location ids and
/// return `(location_id, order_index)` pairs in request order.
///
/// Every requested id must belong to the list and appear once. Ids of the
/// list that are not requested are left out of the plan.
///
/// # Errors
///
/// Returns a `location_ids` field error naming the first offending id.
pub fn plan_reorder(list_id: i64, current_ids: &[i64], requested: &[i64]) -> Result<Vec<(i64, i32)>, FieldError> {
    let current: HashSet<i64> = current_ids.iter().copied().collect();
    let mut seen = HashSet::with_capacity(requested.len());
    let mut plan = Vec::with_capacity(requested.len());

    for (position, &location_id) in requested.iter().enumerate() {
        if !current.contains(&location_id) {
            return Err(FieldError::new(
                "location_ids",
                format!("location {location_id} not found in list {list_id}"),
            ));
        }
        if !seen.insert(location_id) {
            return Err(FieldError::new(
                "location_ids",
                format!("location {location_id} appears more than once"),
            ));
        }
        let order_index = i32::try_from(position)
            .map_err(|_| FieldError::new("location_ids", "too many locations in one reorder"))?;
        plan.push((location_id, order_index));
    }
    Ok(plan)
}

/// Sort locations by `order_index`, breaking ties by id.
pub fn sort_locations(locations: &mut [Location]) {
    locations.sort_by_key(|loc| (loc.order_index, loc.id));
}

/// Group loaded locations under their lists, keeping list order.
#[must_use]
pub fn attach_locations(lists: Vec<MyList>, locations: Vec<Location>) -> Vec<MyListWithLocations> {
    let mut by_list: HashMap<i64, Vec<Location>> = HashMap::new();
    for location in locations {
        by_list.entry(location.my_list_id).or_default().push(location);
    }

    lists
        .into_iter()
        .map(|list| {
            let mut locations = by_list.remove(&list.id).unwrap_or_default();
            sort_locations(&mut locations);
            MyListWithLocations { list, locations }
        })
        .collect()
}

// =============================================================================
// VALIDATION
// =============================================================================

fn validate_coordinates(lat: f64, lng: f64) -> Result<(), FieldError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(FieldError::new("lat", "must be between -90 and 90"));
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(FieldError::new("lng", "must be between -180 and 180"));
    }
    Ok(())
}

fn normalize_place_id(place_id: Option<&str>) -> Option<String> {
    place_id.map(str::trim).filter(|p| !p.is_empty()).map(str::to_owned)
}

/// Normalize a new location: trimmed required name and address,
/// coordinates in range, blank `place_id` dropped.
///
/// # Errors
///
/// Returns a field error for the first invalid field.
pub fn validate_new_location(location: NewLocation) -> Result<NewLocation, FieldError> {
    let name = short_text("name", &location.name)?;
    let address = required_text("address", &location.address)?;
    validate_coordinates(location.lat, location.lng)?;
    let place_id = normalize_place_id(location.place_id.as_deref());
    if let Some(place_id) = &place_id {
        check_length("place_id", place_id, MAX_SHORT_TEXT)?;
    }
    Ok(NewLocation { name, address, lat: location.lat, lng: location.lng, place_id })
}

/// Merge a patch into an existing location and validate the result.
///
/// # Errors
///
/// Returns a field error for the first invalid field.
pub fn apply_location_patch(current: &Location, patch: LocationPatch) -> Result<NewLocation, FieldError> {
    validate_new_location(NewLocation {
        name: patch.name.unwrap_or_else(|| current.name.clone()),
        address: patch.address.unwrap_or_else(|| current.address.clone()),
        lat: patch.lat.unwrap_or(current.lat),
        lng: patch.lng.unwrap_or(current.lng),
        place_id: patch.place_id.unwrap_or_else(|| current.place_id.clone()),
    })
}

// =============================================================================
// LISTS
// =============================================================================

/// List a page of lists, most recently updated first, each with its
/// locations. Locations for the whole page load in one extra query.
///
/// # Errors
///
/// Returns a database error if a query fails.
pub async fn list_my_lists(pool: &PgPool, skip: i64, limit: i64) -> Result<Vec<MyListWithLocations>, MyListError> {
    let lists = sqlx::query_as::<_, MyList>(&format!(
        "SELECT {LIST_COLUMNS} FROM my_lists ORDER BY updated_at DESC, id DESC OFFSET $1 LIMIT $2"
    ))
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    if lists.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = QueryBuilder::new(format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE my_list_id IN ("));
    {
        let mut separated = builder.separated(", ");
        for list in &lists {
            separated.push_bind(list.id);
        }
    }
    builder.push(") ORDER BY my_list_id ASC, order_index ASC, id ASC");

    let locations = builder.build_query_as::<Location>().fetch_all(pool).await?;
    Ok(attach_locations(lists, locations))
}

/// Create an empty list.
///
/// # Errors
///
/// Returns a validation error for an empty name, or a database error.
pub async fn create_my_list(
    pool: &PgPool,
    name: &str,
    description: Option<&str>,
) -> Result<MyListWithLocations, MyListError> {
    let name = short_text("name", name)?;

    let list = sqlx::query_as::<_, MyList>(&format!(
        "INSERT INTO my_lists (name, description) VALUES ($1, $2) RETURNING {LIST_COLUMNS}"
    ))
    .bind(&name)
    .bind(description.unwrap_or_default())
    .fetch_one(pool)
    .await?;

    info!(list_id = list.id, "list created");
    Ok(MyListWithLocations { list, locations: Vec::new() })
}

/// Fetch one list with its locations.
///
/// # Errors
///
/// Returns `ListNotFound` if absent, or a database error.
pub async fn get_my_list(pool: &PgPool, list_id: i64) -> Result<MyListWithLocations, MyListError> {
    let list = sqlx::query_as::<_, MyList>(&format!("SELECT {LIST_COLUMNS} FROM my_lists WHERE id = $1"))
        .bind(list_id)
        .fetch_optional(pool)
        .await?
        .ok_or(MyListError::ListNotFound(list_id))?;

    let locations = fetch_locations(pool, list_id).await?;
    Ok(MyListWithLocations { list, locations })
}

/// Overwrite `name` and/or `description` when supplied; refresh `updated_at`.
///
/// # Errors
///
/// Returns `ListNotFound` if absent, a validation error for an empty name,
/// or a database error.
pub async fn update_my_list(
    pool: &PgPool,
    list_id: i64,
    patch: MyListPatch,
) -> Result<MyListWithLocations, MyListError> {
    let name = patch.name.as_deref().map(|n| short_text("name", n)).transpose()?;

    let list = sqlx::query_as::<_, MyList>(&format!(
        "UPDATE my_lists SET \
             name = COALESCE($2, name), \
             description = COALESCE($3, description), \
             updated_at = now() \
         WHERE id = $1 \
         RETURNING {LIST_COLUMNS}"
    ))
    .bind(list_id)
    .bind(name)
    .bind(patch.description)
    .fetch_optional(pool)
    .await?
    .ok_or(MyListError::ListNotFound(list_id))?;

    let locations = fetch_locations(pool, list_id).await?;
    Ok(MyListWithLocations { list, locations })
}

/// Delete a list and every location it owns in one transaction.
///
/// # Errors
///
/// Returns `ListNotFound` if absent, or a database error.
pub async fn delete_my_list(pool: &PgPool, list_id: i64) -> Result<(), MyListError> {
    let mut tx = pool.begin().await?;
    if !lock_list(&mut tx, list_id).await? {
        return Err(MyListError::ListNotFound(list_id));
    }

    // The FK cascades too; deleting explicitly keeps the count for the log.
    let removed = sqlx::query("DELETE FROM locations WHERE my_list_id = $1")
        .bind(list_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    sqlx::query("DELETE FROM my_lists WHERE id = $1")
        .bind(list_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(list_id, locations = removed, "list deleted");
    Ok(())
}

// =============================================================================
// LOCATIONS
// =============================================================================

/// Fetch a list's locations in order.
///
/// # Errors
///
/// Returns `ListNotFound` if the list is absent, or a database error.
pub async fn list_locations(pool: &PgPool, list_id: i64) -> Result<Vec<Location>, MyListError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM my_lists WHERE id = $1)")
        .bind(list_id)
        .fetch_one(pool)
        .await?;
    if !exists {
        return Err(MyListError::ListNotFound(list_id));
    }
    Ok(fetch_locations(pool, list_id).await?)
}

/// Append a location to the end of a list.
///
/// # Errors
///
/// Returns `ListNotFound` if the list is absent, a validation error for bad
/// fields, or a database error.
pub async fn add_location(pool: &PgPool, list_id: i64, location: NewLocation) -> Result<Location, MyListError> {
    let location = validate_new_location(location)?;

    let mut tx = pool.begin().await?;
    if !lock_list(&mut tx, list_id).await? {
        return Err(MyListError::ListNotFound(list_id));
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM locations WHERE my_list_id = $1")
        .bind(list_id)
        .fetch_one(&mut *tx)
        .await?;
    let order_index = append_index(count)?;

    let created = sqlx::query_as::<_, Location>(&format!(
        "INSERT INTO locations (my_list_id, name, address, lat, lng, place_id, order_index) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {LOCATION_COLUMNS}"
    ))
    .bind(list_id)
    .bind(&location.name)
    .bind(&location.address)
    .bind(location.lat)
    .bind(location.lng)
    .bind(&location.place_id)
    .bind(order_index)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(list_id, location_id = created.id, order_index, "location added");
    Ok(created)
}

/// Update the descriptive fields of a location. `order_index` is only
/// changed by [`reorder_locations`].
///
/// # Errors
///
/// Returns `LocationNotFound` unless the location belongs to the list, a
/// validation error for bad fields, or a database error.
pub async fn update_location(
    pool: &PgPool,
    list_id: i64,
    location_id: i64,
    patch: LocationPatch,
) -> Result<Location, MyListError> {
    let mut tx = pool.begin().await?;
    let current = sqlx::query_as::<_, Location>(&format!(
        "SELECT {LOCATION_COLUMNS} FROM locations WHERE id = $1 AND my_list_id = $2 FOR UPDATE"
    ))
    .bind(location_id)
    .bind(list_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(MyListError::LocationNotFound { list_id, location_id })?;

    let merged = apply_location_patch(&current, patch)?;

    let updated = sqlx::query_as::<_, Location>(&format!(
        "UPDATE locations SET name = $3, address = $4, lat = $5, lng = $6, place_id = $7 \
         WHERE id = $1 AND my_list_id = $2 \
         RETURNING {LOCATION_COLUMNS}"
    ))
    .bind(location_id)
    .bind(list_id)
    .bind(&merged.name)
    .bind(&merged.address)
    .bind(merged.lat)
    .bind(merged.lng)
    .bind(&merged.place_id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(updated)
}

/// Remove one location from a list. Remaining indices are not renumbered.
///
/// # Errors
///
/// Returns `LocationNotFound` unless the location belongs to the list, or a
/// database error.
pub async fn remove_location(pool: &PgPool, list_id: i64, location_id: i64) -> Result<(), MyListError> {
    let mut tx = pool.begin().await?;
    if !lock_list(&mut tx, list_id).await? {
        return Err(MyListError::LocationNotFound { list_id, location_id });
    }

    let result = sqlx::query("DELETE FROM locations WHERE id = $1 AND my_list_id = $2")
        .bind(location_id)
        .bind(list_id)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(MyListError::LocationNotFound { list_id, location_id });
    }
    tx.commit().await?;

    info!(list_id, location_id, "location removed");
    Ok(())
}

/// Assign `order_index = position` to each requested location and return
/// all of the list's locations in the new order.
///
/// The request is validated against the locked child set before any write;
/// on a validation error the transaction is rolled back untouched.
///
/// # Errors
///
/// Returns `ListNotFound` if the list is absent, a `location_ids` validation
/// error for foreign or repeated ids, or a database error.
pub async fn reorder_locations(
    pool: &PgPool,
    list_id: i64,
    location_ids: &[i64],
) -> Result<Vec<Location>, MyListError> {
    let mut tx = pool.begin().await?;
    if !lock_list(&mut tx, list_id).await? {
        return Err(MyListError::ListNotFound(list_id));
    }

    let current_ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM locations WHERE my_list_id = $1")
        .bind(list_id)
        .fetch_all(&mut *tx)
        .await?;
    let plan = plan_reorder(list_id, &current_ids, location_ids)?;

    if !plan.is_empty() {
        let (ids, indices): (Vec<i64>, Vec<i32>) = plan.into_iter().unzip();
        sqlx::query(
            "UPDATE locations AS l SET order_index = v.order_index \
             FROM UNNEST($1::bigint[], $2::int[]) AS v(id, order_index) \
             WHERE l.id = v.id AND l.my_list_id = $3",
        )
        .bind(ids)
        .bind(indices)
        .bind(list_id)
        .execute(&mut *tx)
        .await?;
    }

    let locations = fetch_locations(&mut *tx, list_id).await?;
    tx.commit().await?;

    info!(
        list_id,
        reordered = location_ids.len(),
        total = locations.len(),
        "locations reordered"
    );
    Ok(locations)
}

// =============================================================================
// HELPERS
// =============================================================================

/// Lock the parent list row for the rest of the transaction. Returns false
/// if the list does not exist.
async fn lock_list(conn: &mut PgConnection, list_id: i64) -> Result<bool, sqlx::Error> {
    let row: Option<i64> = sqlx::query_scalar("SELECT id FROM my_lists WHERE id = $1 FOR UPDATE")
        .bind(list_id)
        .fetch_optional(conn)
        .await?;
    Ok(row.is_some())
}

async fn fetch_locations<'e, E>(executor: E, list_id: i64) -> Result<Vec<Location>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Location>(&format!(
        "SELECT {LOCATION_COLUMNS} FROM locations WHERE my_list_id = $1 ORDER BY order_index ASC, id ASC"
    ))
    .bind(list_id)
    .fetch_all(executor)
    .await
}

#[cfg(test)]
#[path = "my_list_test.rs"]
mod tests;
