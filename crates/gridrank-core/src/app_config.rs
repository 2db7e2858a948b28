use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub provider_username: Option<String>,
    pub provider_password: Option<String>,
    pub provider_credentials_b64: Option<String>,
    pub provider_base_url: String,
    pub provider_timeout_secs: u64,
    pub submit_timeout_secs: u64,
    pub user_agent: String,
    pub max_concurrent_fetches: usize,
    pub provider_max_requests: usize,
    pub provider_window_secs: u64,
    pub fetch_max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub max_wait_secs: u64,
    pub poll_interval_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("provider_username", &self.provider_username)
            .field(
                "provider_password",
                &self.provider_password.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "provider_credentials_b64",
                &self.provider_credentials_b64.as_ref().map(|_| "[redacted]"),
            )
            .field("provider_base_url", &self.provider_base_url)
            .field("provider_timeout_secs", &self.provider_timeout_secs)
            .field("submit_timeout_secs", &self.submit_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_concurrent_fetches", &self.max_concurrent_fetches)
            .field("provider_max_requests", &self.provider_max_requests)
            .field("provider_window_secs", &self.provider_window_secs)
            .field("fetch_max_retries", &self.fetch_max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("max_wait_secs", &self.max_wait_secs)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .finish()
    }
}
