//! Grid rank workflow: submission followed by polling.

use std::time::Duration;

use chrono::{DateTime, Utc};
use gridrank_core::{
    resolve_credentials, validate_credentials, AppConfig, Credentials, CredentialsError,
    GridRequest,
};
use gridrank_provider::{ClientSettings, ProviderClient};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::batcher::{GridTask, TaskBatch, TaskBatcher};
use crate::error::RankError;
use crate::fetcher::{PollConfig, QuickStatus, ResultsFetcher, ResultsReport};
use crate::rank::RankMapEntry;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Center {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridParameters {
    pub size: u32,
    pub radius_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_duration_seconds: f64,
    pub success: bool,
}

/// Everything produced by one full grid check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCheckReport {
    pub business_name: String,
    pub center: Center,
    pub grid: GridParameters,
    pub grid_coordinates: Vec<String>,
    pub task_ids: Vec<String>,
    pub tasks: Vec<GridTask>,
    pub results: ResultsReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_map: Option<Vec<RankMapEntry>>,
    pub metadata: ReportMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GridCheckReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.metadata.success
    }

    /// The paired submission records as a batch.
    #[must_use]
    pub fn batch(&self) -> TaskBatch {
        TaskBatch {
            tasks: self.tasks.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Success,
    NoTasks,
    Error,
}

/// Uniform envelope around a quick status sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEnvelope {
    pub status: StatusKind,
    pub task_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_status: Option<QuickStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Runs the create-then-poll workflow for one business.
///
/// Credentials are validated once, at construction.
#[derive(Debug, Clone)]
pub struct GridRankChecker {
    batcher: TaskBatcher,
    fetcher: ResultsFetcher,
    client: ProviderClient,
}

impl GridRankChecker {
    /// # Errors
    ///
    /// - [`RankError::InvalidCredentials`] if credentials are absent, too
    ///   short or placeholders.
    /// - [`RankError::Client`] if the HTTP client cannot be built.
    pub fn new(
        credentials: Option<Credentials>,
        settings: ClientSettings,
        poll: PollConfig,
    ) -> Result<Self, RankError> {
        validate_credentials(credentials.as_ref())?;
        let credentials = credentials.ok_or(CredentialsError::Missing)?;
        tracing::info!(username = %credentials.username, "initializing grid rank checker");

        let client = ProviderClient::new(credentials, settings).map_err(RankError::Client)?;
        Ok(Self {
            batcher: TaskBatcher::new(client.clone()),
            fetcher: ResultsFetcher::new(client.clone(), poll),
            client,
        })
    }

    /// Resolves credentials (explicit, then environment) and builds a checker
    /// from application config.
    ///
    /// # Errors
    ///
    /// See [`GridRankChecker::new`].
    pub fn from_app_config(
        config: &AppConfig,
        explicit: Option<Credentials>,
    ) -> Result<Self, RankError> {
        Self::new(
            resolve_credentials(explicit, config),
            ClientSettings::from_app_config(config),
            PollConfig::from_app_config(config),
        )
    }

    #[must_use]
    pub fn client(&self) -> &ProviderClient {
        &self.client
    }

    #[must_use]
    pub fn poll_config(&self) -> &PollConfig {
        self.fetcher.config()
    }

    /// Submits tasks without waiting for results.
    ///
    /// The returned batch yields both the task ids and the coordinate strings.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::InvalidParameter`] if a grid point cannot be
    /// formatted, or [`RankError::Submission`] if the batch call fails.
    pub async fn create_tasks_only(&self, request: &GridRequest) -> Result<TaskBatch, RankError> {
        tracing::info!(
            business = request.business_name(),
            lat = request.center_lat(),
            lng = request.center_lng(),
            grid_size = request.grid_size(),
            radius_km = request.radius_km(),
            "creating grid rank check tasks"
        );
        let batch = self.batcher.submit(request).await?;
        tracing::info!(created = batch.created_count(), "created tasks");
        Ok(batch)
    }

    /// Polls existing tasks. An empty id list makes no provider call.
    pub async fn get_results_only(
        &self,
        task_ids: &[String],
        max_wait: Duration,
        poll_interval: Duration,
        cancel: &CancellationToken,
    ) -> ResultsReport {
        self.fetcher
            .get_all_results(task_ids, max_wait, poll_interval, cancel)
            .await
    }

    /// Full workflow with timing metadata.
    ///
    /// Submission failures and an all-rejected grid are folded into the
    /// report with `success = false`; polling is skipped in both cases.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::InvalidParameter`] when the grid cannot be turned
    /// into valid task coordinates, before any provider call.
    pub async fn run_grid_check(
        &self,
        request: &GridRequest,
        max_wait: Duration,
        poll_interval: Duration,
        cancel: &CancellationToken,
    ) -> Result<GridCheckReport, RankError> {
        let start_time = Utc::now();
        let clock = std::time::Instant::now();
        tracing::info!(business = request.business_name(), "starting grid rank check");

        let mut report = GridCheckReport {
            business_name: request.business_name().to_owned(),
            center: Center {
                lat: request.center_lat(),
                lng: request.center_lng(),
            },
            grid: GridParameters {
                size: request.grid_size(),
                radius_km: request.radius_km(),
            },
            grid_coordinates: Vec::new(),
            task_ids: Vec::new(),
            tasks: Vec::new(),
            results: ResultsReport::default(),
            rank_map: None,
            metadata: ReportMetadata {
                start_time,
                end_time: start_time,
                total_duration_seconds: 0.0,
                success: false,
            },
            error: None,
        };

        match self.create_tasks_only(request).await {
            Ok(batch) => {
                report.grid_coordinates = batch.coordinate_strings();
                report.task_ids = batch.task_ids();
                report.tasks = batch.tasks;
                if report.task_ids.is_empty() {
                    tracing::error!("no tasks were created");
                    report.error = Some("Failed to create tasks".to_owned());
                } else {
                    report.results = self
                        .get_results_only(&report.task_ids, max_wait, poll_interval, cancel)
                        .await;
                    if report.results.summary.cancelled {
                        report.error = Some(RankError::Cancelled.to_string());
                    } else {
                        report.metadata.success = true;
                    }
                }
            }
            Err(e @ RankError::InvalidParameter(_)) => return Err(e),
            Err(e) => {
                tracing::error!(error = %e, "grid rank check failed");
                report.error = Some(e.to_string());
            }
        }

        report.metadata.end_time = Utc::now();
        report.metadata.total_duration_seconds = clock.elapsed().as_secs_f64();
        tracing::info!(
            success = report.metadata.success,
            duration_secs = report.metadata.total_duration_seconds,
            "grid rank check finished"
        );
        Ok(report)
    }

    /// [`GridRankChecker::run_grid_check`] on a 3×3 grid with a 5 km radius
    /// and the configured polling bounds.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::InvalidParameter`] for a bad name or centre, or
    /// a grid that cannot be formatted.
    pub async fn quick_check(
        &self,
        business_name: &str,
        lat: f64,
        lng: f64,
        cancel: &CancellationToken,
    ) -> Result<GridCheckReport, RankError> {
        let request = GridRequest::builder(business_name, lat, lng)
            .grid_size(3)
            .radius_km(5.0)
            .build()?;
        let poll = *self.poll_config();
        self.run_grid_check(&request, poll.max_wait, poll.poll_interval, cancel)
            .await
    }

    /// One non-blocking status sweep wrapped in an envelope.
    pub async fn get_status(&self, task_ids: &[String]) -> StatusEnvelope {
        if task_ids.is_empty() {
            return StatusEnvelope {
                status: StatusKind::NoTasks,
                task_count: 0,
                task_status: None,
                message: Some("No task IDs provided".to_owned()),
                timestamp: Utc::now(),
            };
        }
        tracing::info!(tasks = task_ids.len(), "getting task status");
        let status = self.fetcher.get_quick_status(task_ids).await;
        let (kind, message) = if status.unknown == status.total {
            (
                StatusKind::Error,
                Some("status could not be fetched for any task".to_owned()),
            )
        } else {
            (StatusKind::Success, None)
        };
        StatusEnvelope {
            status: kind,
            task_count: task_ids.len(),
            task_status: Some(status),
            message,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ClientSettings {
        ClientSettings::for_base_url("http://127.0.0.1:9")
    }

    #[test]
    fn missing_credentials_fail_fast() {
        let err = GridRankChecker::new(None, settings(), PollConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            RankError::InvalidCredentials(CredentialsError::Missing)
        ));
    }

    #[test]
    fn placeholder_credentials_fail_fast() {
        let creds = Credentials::new(
            "your_dataforseo_username_here",
            "your_dataforseo_password_here",
        );
        let err = GridRankChecker::new(Some(creds), settings(), PollConfig::default()).unwrap_err();
        assert!(matches!(err, RankError::InvalidCredentials(_)));
    }

    #[test]
    fn short_password_fails_fast() {
        let creds = Credentials::new("grid-user", "short");
        let err = GridRankChecker::new(Some(creds), settings(), PollConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            RankError::InvalidCredentials(CredentialsError::TooShort { .. })
        ));
    }

    #[test]
    fn valid_credentials_build_a_checker() {
        let creds = Credentials::new("grid-user", "grid-password");
        let checker = GridRankChecker::new(Some(creds), settings(), PollConfig::default()).unwrap();
        assert_eq!(checker.poll_config().max_concurrent, 4);
    }

    #[tokio::test]
    async fn empty_status_request_reports_no_tasks() {
        let creds = Credentials::new("grid-user", "grid-password");
        let checker = GridRankChecker::new(Some(creds), settings(), PollConfig::default()).unwrap();
        let envelope = checker.get_status(&[]).await;
        assert_eq!(envelope.status, StatusKind::NoTasks);
        assert_eq!(envelope.task_count, 0);
        assert!(envelope.task_status.is_none());
    }

    #[tokio::test]
    async fn empty_results_request_makes_no_call() {
        let creds = Credentials::new("grid-user", "grid-password");
        let checker = GridRankChecker::new(Some(creds), settings(), PollConfig::default()).unwrap();
        let report = checker
            .get_results_only(
                &[],
                Duration::from_secs(60),
                Duration::from_secs(30),
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(report, ResultsReport::default());
    }
}
