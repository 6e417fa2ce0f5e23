//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business rules and SQL so route handlers can stay
//! focused on protocol translation. Every mutating operation runs as a
//! single statement or inside one transaction.

pub mod item;
pub mod my_list;

/// A rejected input field. Shared by the item and list services.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}

/// Trim a required text field, rejecting empty or whitespace-only input.
pub(crate) fn required_text(field: &'static str, value: &str) -> Result<String, FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FieldError::new(field, "must not be empty"));
    }
    Ok(trimmed.to_owned())
}

/// Width of the `VARCHAR(255)` columns (titles, names, place ids).
pub(crate) const MAX_SHORT_TEXT: usize = 255;

/// Reject text longer than `max` characters.
pub(crate) fn check_length(field: &'static str, value: &str, max: usize) -> Result<(), FieldError> {
    if value.chars().count() > max {
        return Err(FieldError::new(field, format!("must be at most {max} characters")));
    }
    Ok(())
}

/// [`required_text`] for a `VARCHAR(255)` column.
pub(crate) fn short_text(field: &'static str, value: &str) -> Result<String, FieldError> {
    let text = required_text(field, value)?;
    check_length(field, &text, MAX_SHORT_TEXT)?;
    Ok(text)
}
