//! Edge validation helpers used by the services before any row is touched.

use crate::error::AppError;

/// Trim and bounds-check a free-text field. Returns the trimmed value.
pub fn validate_bounded_string(
    value: &str,
    field: &str,
    min: usize,
    max: usize,
) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.len() < min || trimmed.len() > max {
        return Err(AppError::validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Check a wire code against a closed set.
pub fn validate_enum_string(value: &str, field: &str, allowed: &[&str]) -> Result<(), AppError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(AppError::validation_with(
            format!("{field} must be one of: {}", allowed.join(", ")),
            vec![format!("got: {value}")],
        ))
    }
}

/// Validate a YYYY-MM-DD calendar date.
pub fn validate_yyyy_mm_dd(value: &str, field: &str) -> Result<(), AppError> {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| AppError::validation(format!("{field} must be a YYYY-MM-DD date")))
}

/// Validate an opaque row id: non-empty, bounded, no whitespace or slashes.
pub fn validate_id(value: &str, field: &str) -> Result<(), AppError> {
    let ok = !value.is_empty()
        && value.len() <= 64
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(AppError::validation(format!("{field} is not a valid id")))
    }
}
