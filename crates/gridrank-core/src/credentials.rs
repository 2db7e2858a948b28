//! Provider credential resolution and validation.
//!
//! Credentials are layered: explicit values passed by the caller win, then
//! `DATAFORSEO_USERNAME` / `DATAFORSEO_PASSWORD`, then a base64-encoded
//! `username:password` string from `DATAFORSEO_CREDENTIALS_B64`.

use base64::Engine;
use thiserror::Error;

use crate::app_config::AppConfig;

const PLACEHOLDER_USERNAME: &str = "your_dataforseo_username_here";
const PLACEHOLDER_PASSWORD: &str = "your_dataforseo_password_here";
const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("provider username or password is missing")]
    Missing,

    #[error("provider {field} is still the placeholder value")]
    Placeholder { field: &'static str },

    #[error("provider {field} is too short (minimum {min} characters)")]
    TooShort { field: &'static str, min: usize },

    #[error("malformed base64 credentials: {0}")]
    Malformed(String),
}

/// HTTP basic credentials for the search-data provider.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Decodes a base64 `username:password` string.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialsError::Malformed`] if the input is not valid
    /// base64, not UTF-8, or has no `:` separator.
    pub fn from_base64(encoded: &str) -> Result<Self, CredentialsError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| CredentialsError::Malformed(e.to_string()))?;
        let decoded =
            String::from_utf8(bytes).map_err(|e| CredentialsError::Malformed(e.to_string()))?;
        let (username, password) = decoded.split_once(':').ok_or_else(|| {
            CredentialsError::Malformed("expected 'username:password'".to_string())
        })?;
        Ok(Self::new(username, password))
    }
}

/// Resolves credentials from the layered sources.
///
/// Returns `None` when no layer yields a complete pair. A malformed base64
/// layer is logged and skipped rather than failing the whole lookup.
#[must_use]
pub fn resolve_credentials(
    explicit: Option<Credentials>,
    config: &AppConfig,
) -> Option<Credentials> {
    if let Some(creds) = explicit {
        tracing::debug!("using explicitly supplied provider credentials");
        return Some(creds);
    }

    if let (Some(username), Some(password)) =
        (&config.provider_username, &config.provider_password)
    {
        tracing::debug!("using provider credentials from environment");
        return Some(Credentials::new(username.clone(), password.clone()));
    }

    if let Some(encoded) = &config.provider_credentials_b64 {
        match Credentials::from_base64(encoded) {
            Ok(creds) => {
                tracing::debug!("using provider credentials from base64 string");
                return Some(creds);
            }
            Err(e) => tracing::warn!(error = %e, "ignoring malformed base64 credentials"),
        }
    }

    tracing::warn!("no provider credentials found");
    None
}

/// Checks that credentials look usable before any network call is made.
///
/// # Errors
///
/// Returns a [`CredentialsError`] describing the first failed rule.
pub fn validate_credentials(credentials: Option<&Credentials>) -> Result<(), CredentialsError> {
    let Some(creds) = credentials else {
        return Err(CredentialsError::Missing);
    };
    if creds.username.is_empty() || creds.password.is_empty() {
        return Err(CredentialsError::Missing);
    }
    if creds.username == PLACEHOLDER_USERNAME {
        return Err(CredentialsError::Placeholder { field: "username" });
    }
    if creds.password == PLACEHOLDER_PASSWORD {
        return Err(CredentialsError::Placeholder { field: "password" });
    }
    if creds.username.chars().count() < MIN_USERNAME_LEN {
        return Err(CredentialsError::TooShort {
            field: "username",
            min: MIN_USERNAME_LEN,
        });
    }
    if creds.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CredentialsError::TooShort {
            field: "password",
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::Environment;

    fn config_with(
        username: Option<&str>,
        password: Option<&str>,
        b64: Option<&str>,
    ) -> AppConfig {
        AppConfig {
            env: Environment::Test,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "info".to_string(),
            provider_username: username.map(str::to_string),
            provider_password: password.map(str::to_string),
            provider_credentials_b64: b64.map(str::to_string),
            provider_base_url: "http://localhost/".to_string(),
            provider_timeout_secs: 5,
            submit_timeout_secs: 5,
            user_agent: "test".to_string(),
            max_concurrent_fetches: 1,
            provider_max_requests: 100,
            provider_window_secs: 60,
            fetch_max_retries: 0,
            retry_backoff_base_ms: 0,
            max_wait_secs: 60,
            poll_interval_secs: 30,
        }
    }

    #[test]
    fn explicit_credentials_take_priority() {
        let cfg = config_with(Some("env-user"), Some("env-password"), None);
        let creds =
            resolve_credentials(Some(Credentials::new("mine", "my-password")), &cfg).unwrap();
        assert_eq!(creds.username, "mine");
    }

    #[test]
    fn env_credentials_beat_base64() {
        // "b64-user:b64-password"
        let cfg = config_with(
            Some("env-user"),
            Some("env-password"),
            Some("YjY0LXVzZXI6YjY0LXBhc3N3b3Jk"),
        );
        let creds = resolve_credentials(None, &cfg).unwrap();
        assert_eq!(creds.username, "env-user");
    }

    #[test]
    fn base64_layer_used_when_env_incomplete() {
        let cfg = config_with(Some("env-user"), None, Some("YjY0LXVzZXI6YjY0LXBhc3N3b3Jk"));
        let creds = resolve_credentials(None, &cfg).unwrap();
        assert_eq!(creds.username, "b64-user");
        assert_eq!(creds.password, "b64-password");
    }

    #[test]
    fn malformed_base64_resolves_to_none() {
        let cfg = config_with(None, None, Some("!!not base64!!"));
        assert!(resolve_credentials(None, &cfg).is_none());
    }

    #[test]
    fn base64_without_separator_is_malformed() {
        // "nocolon"
        let err = Credentials::from_base64("bm9jb2xvbg==").unwrap_err();
        assert!(matches!(err, CredentialsError::Malformed(_)));
    }

    #[test]
    fn base64_password_may_contain_colons() {
        // "user:pa:ss:word"
        let creds = Credentials::from_base64("dXNlcjpwYTpzczp3b3Jk").unwrap();
        assert_eq!(creds.username, "user");
        assert_eq!(creds.password, "pa:ss:word");
    }

    #[test]
    fn validate_rejects_missing() {
        assert_eq!(validate_credentials(None), Err(CredentialsError::Missing));
        let empty = Credentials::new("", "password1");
        assert_eq!(
            validate_credentials(Some(&empty)),
            Err(CredentialsError::Missing)
        );
    }

    #[test]
    fn validate_rejects_placeholders() {
        let creds = Credentials::new(PLACEHOLDER_USERNAME, "password1");
        assert_eq!(
            validate_credentials(Some(&creds)),
            Err(CredentialsError::Placeholder { field: "username" })
        );
        let creds = Credentials::new("someone", PLACEHOLDER_PASSWORD);
        assert_eq!(
            validate_credentials(Some(&creds)),
            Err(CredentialsError::Placeholder { field: "password" })
        );
    }

    #[test]
    fn validate_rejects_short_values() {
        let creds = Credentials::new("ab", "password1");
        assert!(matches!(
            validate_credentials(Some(&creds)),
            Err(CredentialsError::TooShort {
                field: "username",
                ..
            })
        ));
        let creds = Credentials::new("someone", "short");
        assert!(matches!(
            validate_credentials(Some(&creds)),
            Err(CredentialsError::TooShort {
                field: "password",
                ..
            })
        ));
    }

    #[test]
    fn validate_accepts_reasonable_credentials() {
        let creds = Credentials::new("someone@example.com", "0123456789abcdef");
        assert!(validate_credentials(Some(&creds)).is_ok());
    }

    #[test]
    fn debug_redacts_password() {
        let creds = Credentials::new("someone", "hunter2-hunter2");
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("hunter2"));
    }
}
