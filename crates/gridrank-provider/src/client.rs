//! HTTP client for the provider's map-search task API.
//!
//! Wraps `reqwest` with basic-auth credentials, the shared request budget and
//! the endpoint paths for task creation and advanced result retrieval. Task
//! creation is a single attempt; result retrieval retries transient errors.

use std::time::Duration;

use gridrank_core::{AppConfig, Credentials};
use reqwest::{Client, Url};

use crate::budget::RequestBudget;
use crate::error::ProviderError;
use crate::retry::retry_with_backoff;
use crate::types::{TaskPostEnvelope, TaskPostItem, STATUS_OK};

const TASK_POST_PATH: &str = "v3/serp/google/maps/task_post";
const TASK_GET_ADVANCED_PATH: &str = "v3/serp/google/maps/task_get/advanced";
const USER_DATA_PATH: &str = "v3/appendix/user_data";

/// Connection and retry settings for [`ProviderClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub submit_timeout: Duration,
    pub user_agent: String,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub budget: RequestBudget,
}

impl ClientSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.provider_base_url.clone(),
            timeout: Duration::from_secs(config.provider_timeout_secs),
            submit_timeout: Duration::from_secs(config.submit_timeout_secs),
            user_agent: config.user_agent.clone(),
            max_retries: config.fetch_max_retries,
            backoff_base_ms: config.retry_backoff_base_ms,
            budget: RequestBudget::new(
                config.provider_max_requests,
                Duration::from_secs(config.provider_window_secs),
            ),
        }
    }

    /// Settings for a mock server: no retries, no budget.
    #[must_use]
    pub fn for_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_owned(),
            timeout: Duration::from_secs(10),
            submit_timeout: Duration::from_secs(10),
            user_agent: "gridrank-test".to_owned(),
            max_retries: 0,
            backoff_base_ms: 0,
            budget: RequestBudget::unlimited(),
        }
    }
}

/// Client for the provider REST API.
///
/// Cheap to clone; clones share the connection pool and request budget.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    client: Client,
    credentials: Credentials,
    base_url: Url,
    submit_timeout: Duration,
    max_retries: u32,
    backoff_base_ms: u64,
    budget: RequestBudget,
}

impl ProviderClient {
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ProviderError::InvalidBaseUrl`] if the
    /// configured base URL does not parse.
    pub fn new(credentials: Credentials, settings: ClientSettings) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(settings.user_agent.as_str())
            .build()?;

        // Exactly one trailing slash so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", settings.base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ProviderError::InvalidBaseUrl {
            url: settings.base_url.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            credentials,
            base_url,
            submit_timeout: settings.submit_timeout,
            max_retries: settings.max_retries,
            backoff_base_ms: settings.backoff_base_ms,
            budget: settings.budget,
        })
    }

    /// Submits a batch of tasks in one call.
    ///
    /// No retry: the batch either yields a response or the whole call fails.
    /// Per-item acceptance is left to the caller.
    ///
    /// # Errors
    ///
    /// - [`ProviderError::Http`] on network failure.
    /// - [`ProviderError::UnexpectedStatus`] on a non-2xx status.
    /// - [`ProviderError::Api`] if the envelope reports a non-success code.
    /// - [`ProviderError::Deserialize`] if the body does not match.
    pub async fn post_tasks(
        &self,
        tasks: &[TaskPostItem],
    ) -> Result<TaskPostEnvelope, ProviderError> {
        let url = self.endpoint(TASK_POST_PATH)?;
        self.budget.acquire().await;

        tracing::debug!(count = tasks.len(), %url, "posting task batch");
        let response = self
            .client
            .post(url.clone())
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .timeout(self.submit_timeout)
            .json(tasks)
            .send()
            .await?;
        let body = Self::read_json(response, &url).await?;
        Self::check_api_error(&body)?;

        serde_json::from_value(body).map_err(|e| ProviderError::Deserialize {
            context: format!("task_post({} items)", tasks.len()),
            source: e,
        })
    }

    /// Fetches the advanced result payload for one task.
    ///
    /// The payload is returned raw; classification is up to the caller.
    ///
    /// # Errors
    ///
    /// Returns the last error after transient failures exhaust the retry budget.
    pub async fn get_task(&self, task_id: &str) -> Result<serde_json::Value, ProviderError> {
        let url = self.endpoint(&format!("{TASK_GET_ADVANCED_PATH}/{task_id}"))?;
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            async move {
                self.budget.acquire().await;
                let response = self
                    .client
                    .get(url.clone())
                    .basic_auth(&self.credentials.username, Some(&self.credentials.password))
                    .send()
                    .await?;
                Self::read_json(response, &url).await
            }
        })
        .await
    }

    /// Checks that the credentials are accepted by the provider.
    ///
    /// # Errors
    ///
    /// Returns the transport or API error that prevented a successful call.
    pub async fn check_connection(&self) -> Result<(), ProviderError> {
        let url = self.endpoint(USER_DATA_PATH)?;
        self.budget.acquire().await;
        let response = self
            .client
            .get(url.clone())
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await?;
        let body = Self::read_json(response, &url).await?;
        Self::check_api_error(&body)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(path)
            .map_err(|e| ProviderError::InvalidBaseUrl {
                url: format!("{}{path}", self.base_url),
                reason: e.to_string(),
            })
    }

    async fn read_json(
        response: reqwest::Response,
        url: &Url,
    ) -> Result<serde_json::Value, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ProviderError::Deserialize {
            context: url.path().to_owned(),
            source: e,
        })
    }

    /// Checks the top-level `status_code` of the envelope.
    fn check_api_error(body: &serde_json::Value) -> Result<(), ProviderError> {
        match body.get("status_code").and_then(serde_json::Value::as_i64) {
            Some(code) if code != STATUS_OK => {
                let message = body
                    .get("status_message")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("unknown error")
                    .to_owned();
                Err(ProviderError::Api { code, message })
            }
            _ => Ok(()),
        }
    }
}
