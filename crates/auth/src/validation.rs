//! Input normalisation shared by role and permission constructors.

use warden_core::{DomainError, DomainResult};

pub(crate) const ROLE_NAME_MAX: usize = 50;
pub(crate) const PERMISSION_NAME_MAX: usize = 100;
pub(crate) const TAG_MAX: usize = 50;
pub(crate) const DESCRIPTION_MAX: usize = 255;
pub(crate) const MENU_PATH_MAX: usize = 200;
pub(crate) const BUTTON_ID_MAX: usize = 100;

/// Trim `value` and reject it when empty or longer than `max` characters.
pub(crate) fn required(field: &str, value: &str, max: usize) -> DomainResult<String> {
    let trimmed = bounded(field, value, max)?;
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed)
}

/// Trim an optional free-text field and bound it; blank text collapses to `None`.
pub(crate) fn optional(field: &str, value: Option<String>, max: usize) -> DomainResult<Option<String>> {
    Ok(value
        .map(|v| bounded(field, &v, max))
        .transpose()?
        .filter(|v| !v.is_empty()))
}

/// Free-text field of a partial update.
///
/// `None` leaves the field alone. Blank text is kept as `Some("")`, which
/// `apply` turns into clearing the field.
pub(crate) fn clearable(field: &str, value: Option<String>, max: usize) -> DomainResult<Option<String>> {
    value.map(|v| bounded(field, &v, max)).transpose()
}

/// Replace `slot` according to a validated [`clearable`] value.
pub(crate) fn apply_clearable(slot: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value {
        *slot = Some(value).filter(|v| !v.is_empty());
    }
}

fn bounded(field: &str, value: &str, max: usize) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.chars().count() > max {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}
