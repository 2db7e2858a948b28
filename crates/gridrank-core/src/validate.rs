//! Input validation for grid rank checks.
//!
//! Every check runs before any network call. Bounds are inclusive.

use thiserror::Error;

pub const MIN_GRID_SIZE: u32 = 1;
pub const MAX_GRID_SIZE: u32 = 10;
pub const MIN_RADIUS_KM: f64 = 0.1;
pub const MAX_RADIUS_KM: f64 = 50.0;
pub const MIN_ZOOM: u8 = 1;
pub const MAX_ZOOM: u8 = 20;
pub const MAX_BUSINESS_NAME_LEN: usize = 200;
const MIN_BUSINESS_NAME_LEN: usize = 2;

pub const MIN_MAX_WAIT_SECS: u64 = 60;
pub const MAX_MAX_WAIT_SECS: u64 = 3600;
pub const MIN_POLL_INTERVAL_SECS: u64 = 30;
pub const MAX_POLL_INTERVAL_SECS: u64 = 600;

/// Language codes the provider accepts for map searches.
pub const SUPPORTED_LANGUAGE_CODES: &[&str] = &[
    "en", "es", "fr", "de", "it", "pt", "ru", "zh", "ja", "ko", "ar", "hi", "th", "vi", "id",
    "ms", "tr", "pl", "nl", "sv", "da", "no", "fi", "cs", "sk", "hu", "ro", "bg", "hr", "sl",
    "et", "lv", "lt", "el", "he", "fa", "ur", "bn", "ta", "te",
];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("latitude must be between -90 and 90, got {0}")]
    Latitude(f64),

    #[error("longitude must be between -180 and 180, got {0}")]
    Longitude(f64),

    #[error("grid size must be between 1 and 10, got {0}")]
    GridSize(u32),

    #[error("radius must be between 0.1 and 50 km, got {0}")]
    Radius(f64),

    #[error("zoom level must be between 1 and 20, got {0}")]
    Zoom(u8),

    #[error("business name {0}")]
    BusinessName(&'static str),

    #[error("invalid language code: {0}")]
    LanguageCode(String),

    #[error("invalid device type: {0} (expected desktop, mobile or tablet)")]
    Device(String),

    #[error("invalid polling parameters: {0}")]
    Polling(String),
}

/// Rejects non-finite or out-of-range coordinates.
///
/// # Errors
///
/// Returns [`ValidationError::Latitude`] or [`ValidationError::Longitude`].
pub fn validate_coordinates(lat: f64, lng: f64) -> Result<(), ValidationError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(ValidationError::Latitude(lat));
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(ValidationError::Longitude(lng));
    }
    Ok(())
}

/// # Errors
///
/// Returns [`ValidationError::GridSize`] or [`ValidationError::Radius`].
pub fn validate_grid_parameters(grid_size: u32, radius_km: f64) -> Result<(), ValidationError> {
    if !(MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&grid_size) {
        return Err(ValidationError::GridSize(grid_size));
    }
    if !radius_km.is_finite() || !(MIN_RADIUS_KM..=MAX_RADIUS_KM).contains(&radius_km) {
        return Err(ValidationError::Radius(radius_km));
    }
    Ok(())
}

/// # Errors
///
/// Returns [`ValidationError::Zoom`] when `zoom` is outside `[1, 20]`.
pub fn validate_zoom_level(zoom: u8) -> Result<(), ValidationError> {
    if (MIN_ZOOM..=MAX_ZOOM).contains(&zoom) {
        Ok(())
    } else {
        Err(ValidationError::Zoom(zoom))
    }
}

/// Length limits apply to the trimmed name.
///
/// # Errors
///
/// Returns [`ValidationError::BusinessName`] describing the violated rule.
pub fn validate_business_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BusinessName("cannot be empty"));
    }
    let len = trimmed.chars().count();
    if len < MIN_BUSINESS_NAME_LEN {
        return Err(ValidationError::BusinessName(
            "must be at least 2 characters long",
        ));
    }
    if len > MAX_BUSINESS_NAME_LEN {
        return Err(ValidationError::BusinessName(
            "cannot exceed 200 characters",
        ));
    }
    Ok(())
}

/// # Errors
///
/// Returns [`ValidationError::LanguageCode`] for codes outside
/// [`SUPPORTED_LANGUAGE_CODES`].
pub fn validate_language_code(code: &str) -> Result<(), ValidationError> {
    if SUPPORTED_LANGUAGE_CODES.contains(&code) {
        Ok(())
    } else {
        Err(ValidationError::LanguageCode(code.to_string()))
    }
}

/// Bounds for caller-supplied polling parameters at the HTTP and CLI edges.
///
/// # Errors
///
/// Returns [`ValidationError::Polling`] describing the violated rule.
pub fn validate_polling_parameters(
    max_wait_secs: u64,
    poll_interval_secs: u64,
) -> Result<(), ValidationError> {
    if !(MIN_MAX_WAIT_SECS..=MAX_MAX_WAIT_SECS).contains(&max_wait_secs) {
        return Err(ValidationError::Polling(format!(
            "max wait time must be between {MIN_MAX_WAIT_SECS} and {MAX_MAX_WAIT_SECS} seconds, got {max_wait_secs}"
        )));
    }
    if !(MIN_POLL_INTERVAL_SECS..=MAX_POLL_INTERVAL_SECS).contains(&poll_interval_secs) {
        return Err(ValidationError::Polling(format!(
            "poll interval must be between {MIN_POLL_INTERVAL_SECS} and {MAX_POLL_INTERVAL_SECS} seconds, got {poll_interval_secs}"
        )));
    }
    if poll_interval_secs >= max_wait_secs {
        return Err(ValidationError::Polling(
            "poll interval must be less than max wait time".to_string(),
        ));
    }
    Ok(())
}

/// Normalizes a business name into a search keyword.
///
/// Collapses runs of whitespace, strips quote characters and truncates to
/// [`MAX_BUSINESS_NAME_LEN`] characters.
#[must_use]
pub fn sanitize_business_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|c| *c != '"' && *c != '\'')
        .take(MAX_BUSINESS_NAME_LEN)
        .collect()
}
