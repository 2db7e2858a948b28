use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://api.dataforseo.com/";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Nothing is strictly required: provider credentials are optional here and
/// only checked when a rank checker is constructed, so `info`/`grid` style
/// calls work without them.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let env = parse_environment(&or_default("GRIDRANK_ENV", "development"))?;
    let bind_addr = parse_addr("GRIDRANK_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("GRIDRANK_LOG_LEVEL", "info");

    let provider_username = optional("DATAFORSEO_USERNAME");
    let provider_password = optional("DATAFORSEO_PASSWORD");
    let provider_credentials_b64 = optional("DATAFORSEO_CREDENTIALS_B64");
    let provider_base_url = or_default("GRIDRANK_PROVIDER_BASE_URL", DEFAULT_PROVIDER_BASE_URL);

    let provider_timeout_secs = parse_u64("GRIDRANK_PROVIDER_TIMEOUT_SECS", "30")?;
    let submit_timeout_secs = parse_u64("GRIDRANK_SUBMIT_TIMEOUT_SECS", "60")?;
    let user_agent = or_default("GRIDRANK_USER_AGENT", "gridrank/0.1 (local-rank-grid)");

    let max_concurrent_fetches = parse_usize("GRIDRANK_MAX_CONCURRENT_FETCHES", "4")?;
    if max_concurrent_fetches == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "GRIDRANK_MAX_CONCURRENT_FETCHES".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let provider_max_requests = parse_usize("GRIDRANK_PROVIDER_MAX_REQUESTS", "600")?;
    let provider_window_secs = parse_u64("GRIDRANK_PROVIDER_WINDOW_SECS", "60")?;
    let fetch_max_retries = parse_u32("GRIDRANK_FETCH_MAX_RETRIES", "2")?;
    let retry_backoff_base_ms = parse_u64("GRIDRANK_RETRY_BACKOFF_BASE_MS", "500")?;

    let max_wait_secs = parse_u64("GRIDRANK_MAX_WAIT_SECS", "1800")?;
    let poll_interval_secs = parse_u64("GRIDRANK_POLL_INTERVAL_SECS", "120")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        provider_username,
        provider_password,
        provider_credentials_b64,
        provider_base_url,
        provider_timeout_secs,
        submit_timeout_secs,
        user_agent,
        max_concurrent_fetches,
        provider_max_requests,
        provider_window_secs,
        fetch_max_retries,
        retry_backoff_base_ms,
        max_wait_secs,
        poll_interval_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "GRIDRANK_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
