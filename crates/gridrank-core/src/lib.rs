pub mod app_config;
pub mod config;
pub mod credentials;
pub mod grid;
pub mod request;
pub mod validate;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use credentials::{resolve_credentials, validate_credentials, Credentials, CredentialsError};
pub use grid::{
    calculate_grid_coordinates, format_coordinate_for_api, generate_task_coordinates,
    parse_coordinate, GridCoordinate, DEFAULT_ZOOM,
};
pub use request::{Device, GridRequest, GridRequestBuilder};
pub use validate::{sanitize_business_name, ValidationError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
