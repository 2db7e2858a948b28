//! Sample-point grid around a business location.
//!
//! Points are spread evenly over a square of side `2 * radius_km` centred on
//! the business. The longitude offset widens with latitude so the square keeps
//! roughly the same physical size; this approximation degenerates near the
//! poles and is not guarded against.

use serde::{Deserialize, Serialize};

use crate::validate::{
    validate_coordinates, validate_grid_parameters, validate_zoom_level, ValidationError,
};

const KM_PER_LAT_DEGREE: f64 = 111.0;

pub const DEFAULT_ZOOM: u8 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridCoordinate {
    pub lat: f64,
    pub lng: f64,
}

impl GridCoordinate {
    /// Formats this point as a provider `location_coordinate` string.
    ///
    /// # Errors
    ///
    /// See [`format_coordinate_for_api`].
    pub fn to_api_string(self, zoom: u8) -> Result<String, ValidationError> {
        format_coordinate_for_api(self.lat, self.lng, zoom)
    }
}

/// Generates `grid_size²` points in row-major order.
///
/// The outer loop walks latitude from south to north, the inner loop
/// longitude from west to east. A 1×1 grid is the centre itself.
///
/// # Errors
///
/// Returns a [`ValidationError`] if the centre or the grid parameters are out
/// of range.
pub fn calculate_grid_coordinates(
    center_lat: f64,
    center_lng: f64,
    grid_size: u32,
    radius_km: f64,
) -> Result<Vec<GridCoordinate>, ValidationError> {
    validate_coordinates(center_lat, center_lng)?;
    validate_grid_parameters(grid_size, radius_km)?;

    let lat_offset = radius_km / KM_PER_LAT_DEGREE;
    let lng_offset = radius_km / (KM_PER_LAT_DEGREE * center_lat.to_radians().cos());

    let factor = |index: u32| -> f64 {
        if grid_size > 1 {
            let step = 2.0 / f64::from(grid_size - 1);
            -1.0 + f64::from(index) * step
        } else {
            0.0
        }
    };

    let mut points = Vec::with_capacity((grid_size * grid_size) as usize);
    for i in 0..grid_size {
        for j in 0..grid_size {
            points.push(GridCoordinate {
                lat: center_lat + factor(i) * lat_offset,
                lng: center_lng + factor(j) * lng_offset,
            });
        }
    }

    tracing::debug!(
        center_lat,
        center_lng,
        grid_size,
        radius_km,
        points = points.len(),
        "generated grid coordinates"
    );
    Ok(points)
}

/// Formats a point as `"{lat:.6},{lng:.6},{zoom}"`.
///
/// # Errors
///
/// Returns a [`ValidationError`] if the point is out of range or `zoom` is
/// outside `[1, 20]`.
pub fn format_coordinate_for_api(lat: f64, lng: f64, zoom: u8) -> Result<String, ValidationError> {
    validate_coordinates(lat, lng)?;
    validate_zoom_level(zoom)?;
    Ok(format!("{lat:.6},{lng:.6},{zoom}"))
}

/// Grid generation followed by per-point formatting, preserving order.
///
/// # Errors
///
/// Propagates errors from [`calculate_grid_coordinates`] and
/// [`format_coordinate_for_api`].
pub fn generate_task_coordinates(
    center_lat: f64,
    center_lng: f64,
    grid_size: u32,
    radius_km: f64,
    zoom: u8,
) -> Result<Vec<String>, ValidationError> {
    calculate_grid_coordinates(center_lat, center_lng, grid_size, radius_km)?
        .into_iter()
        .map(|p| p.to_api_string(zoom))
        .collect()
}

/// Parses a `"lat,lng[,zoom]"` string.
///
/// A missing or unparsable zoom becomes [`DEFAULT_ZOOM`]; only a bad
/// latitude or longitude rejects the whole string.
#[must_use]
pub fn parse_coordinate(raw: &str) -> Option<(f64, f64, u8)> {
    let mut parts = raw.split(',').map(str::trim);
    let lat = parts.next()?.parse::<f64>().ok()?;
    let lng = parts.next()?.parse::<f64>().ok()?;
    let zoom = parts
        .next()
        .and_then(|z| z.parse::<u8>().ok())
        .unwrap_or(DEFAULT_ZOOM);
    Some((lat, lng, zoom))
}
