use serde::{Deserialize, Serialize};

use crate::grid::{calculate_grid_coordinates, GridCoordinate, DEFAULT_ZOOM};
use crate::validate::{
    sanitize_business_name, validate_business_name, validate_coordinates,
    validate_grid_parameters, validate_language_code, validate_zoom_level, ValidationError,
};

pub const DEFAULT_GRID_SIZE: u32 = 3;
pub const DEFAULT_RADIUS_KM: f64 = 5.0;
pub const DEFAULT_LANGUAGE_CODE: &str = "en";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Desktop,
    Mobile,
    Tablet,
}

impl Device {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Device::Desktop => "desktop",
            Device::Mobile => "mobile",
            Device::Tablet => "tablet",
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Device {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desktop" => Ok(Device::Desktop),
            "mobile" => Ok(Device::Mobile),
            "tablet" => Ok(Device::Tablet),
            _ => Err(ValidationError::Device(s.to_string())),
        }
    }
}

/// A validated grid rank check request.
///
/// Fields are private so the only way to obtain one is through
/// [`GridRequest::builder`], which validates every field and stores the
/// sanitized business name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridRequest {
    business_name: String,
    center_lat: f64,
    center_lng: f64,
    grid_size: u32,
    radius_km: f64,
    language_code: String,
    device: Device,
    zoom: u8,
}

impl GridRequest {
    #[must_use]
    pub fn builder(business_name: impl Into<String>, lat: f64, lng: f64) -> GridRequestBuilder {
        GridRequestBuilder {
            business_name: business_name.into(),
            center_lat: lat,
            center_lng: lng,
            grid_size: DEFAULT_GRID_SIZE,
            radius_km: DEFAULT_RADIUS_KM,
            language_code: DEFAULT_LANGUAGE_CODE.to_string(),
            device: Device::default(),
            zoom: DEFAULT_ZOOM,
        }
    }

    #[must_use]
    pub fn business_name(&self) -> &str {
        &self.business_name
    }

    #[must_use]
    pub fn center_lat(&self) -> f64 {
        self.center_lat
    }

    #[must_use]
    pub fn center_lng(&self) -> f64 {
        self.center_lng
    }

    #[must_use]
    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    #[must_use]
    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    #[must_use]
    pub fn language_code(&self) -> &str {
        &self.language_code
    }

    #[must_use]
    pub fn device(&self) -> Device {
        self.device
    }

    #[must_use]
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// The request's sample points in row-major order.
    ///
    /// # Errors
    ///
    /// Cannot fail for a built request; the `Result` mirrors
    /// [`calculate_grid_coordinates`].
    pub fn grid_coordinates(&self) -> Result<Vec<GridCoordinate>, ValidationError> {
        calculate_grid_coordinates(
            self.center_lat,
            self.center_lng,
            self.grid_size,
            self.radius_km,
        )
    }
}

#[derive(Debug, Clone)]
pub struct GridRequestBuilder {
    business_name: String,
    center_lat: f64,
    center_lng: f64,
    grid_size: u32,
    radius_km: f64,
    language_code: String,
    device: Device,
    zoom: u8,
}

impl GridRequestBuilder {
    #[must_use]
    pub fn grid_size(mut self, grid_size: u32) -> Self {
        self.grid_size = grid_size;
        self
    }

    #[must_use]
    pub fn radius_km(mut self, radius_km: f64) -> Self {
        self.radius_km = radius_km;
        self
    }

    #[must_use]
    pub fn language_code(mut self, code: impl Into<String>) -> Self {
        self.language_code = code.into();
        self
    }

    #[must_use]
    pub fn device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    #[must_use]
    pub fn zoom(mut self, zoom: u8) -> Self {
        self.zoom = zoom;
        self
    }

    /// Validates every field and returns the immutable request.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn build(self) -> Result<GridRequest, ValidationError> {
        validate_business_name(&self.business_name)?;
        validate_coordinates(self.center_lat, self.center_lng)?;
        validate_grid_parameters(self.grid_size, self.radius_km)?;
        validate_language_code(&self.language_code)?;
        validate_zoom_level(self.zoom)?;

        let business_name = sanitize_business_name(&self.business_name);
        validate_business_name(&business_name)?;

        Ok(GridRequest {
            business_name,
            center_lat: self.center_lat,
            center_lng: self.center_lng,
            grid_size: self.grid_size,
            radius_km: self.radius_km,
            language_code: self.language_code,
            device: self.device,
            zoom: self.zoom,
        })
    }
}
