//! Service facade used by the CLI and HTTP entry points.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use gridrank_core::{
    calculate_grid_coordinates, AppConfig, Credentials, GridCoordinate, GridRequest,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::batcher::TaskBatch;
use crate::checker::{GridCheckReport, GridRankChecker, StatusEnvelope};
use crate::error::RankError;
use crate::fetcher::ResultsReport;
use crate::rank::build_rank_map_from_tasks;

pub const SERVICE_NAME: &str = "Local Ranking Grid Service";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiConnection {
    Working,
    NotWorking,
    Unchecked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub status: String,
    pub credentials_configured: bool,
    pub api_connection: ApiConnection,
    pub features: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl ServiceInfo {
    fn build(credentials_configured: bool, api_connection: ApiConnection) -> Self {
        let features = [
            ("quick_check", "3x3 grid, 5km radius"),
            ("advanced_check", "Custom grid and radius"),
            ("split_workflow", "Separate task creation and result fetching"),
            ("grid_calculation", "Coordinate grid generation"),
            ("rank_map", "Per-coordinate rank for a target domain"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();

        Self {
            service: SERVICE_NAME.to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            status: "active".to_owned(),
            credentials_configured,
            api_connection,
            features,
            timestamp: Utc::now(),
        }
    }

    /// Info for a deployment without usable provider credentials.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self::build(false, ApiConnection::Unchecked)
    }
}

/// Validated entry points over [`GridRankChecker`] plus rank extraction.
#[derive(Debug, Clone)]
pub struct RankingService {
    checker: GridRankChecker,
}

impl RankingService {
    #[must_use]
    pub fn new(checker: GridRankChecker) -> Self {
        tracing::info!("ranking service initialized");
        Self { checker }
    }

    /// # Errors
    ///
    /// See [`GridRankChecker::from_app_config`].
    pub fn from_app_config(
        config: &AppConfig,
        explicit: Option<Credentials>,
    ) -> Result<Self, RankError> {
        Ok(Self::new(GridRankChecker::from_app_config(config, explicit)?))
    }

    #[must_use]
    pub fn checker(&self) -> &GridRankChecker {
        &self.checker
    }

    /// 3×3 grid, 5 km radius, configured polling bounds.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::InvalidParameter`] for a bad name or centre.
    pub async fn quick_check(
        &self,
        business_name: &str,
        lat: f64,
        lng: f64,
        cancel: &CancellationToken,
    ) -> Result<GridCheckReport, RankError> {
        tracing::info!(business = business_name, lat, lng, "quick check requested");
        let report = self.checker.quick_check(business_name, lat, lng, cancel).await?;
        log_report(&report);
        Ok(report)
    }

    /// Full workflow for a fully specified request.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::InvalidParameter`] when the grid cannot be
    /// formatted into task coordinates.
    pub async fn advanced_check(
        &self,
        request: &GridRequest,
        max_wait: Duration,
        poll_interval: Duration,
        cancel: &CancellationToken,
    ) -> Result<GridCheckReport, RankError> {
        tracing::info!(
            business = request.business_name(),
            grid_size = request.grid_size(),
            radius_km = request.radius_km(),
            device = %request.device(),
            "advanced check requested"
        );
        let report = self
            .checker
            .run_grid_check(request, max_wait, poll_interval, cancel)
            .await?;
        log_report(&report);
        Ok(report)
    }

    /// # Errors
    ///
    /// Returns [`RankError::Submission`] if the batch call fails.
    pub async fn create_tasks(&self, request: &GridRequest) -> Result<TaskBatch, RankError> {
        self.checker.create_tasks_only(request).await
    }

    /// Polls existing tasks with explicit bounds.
    pub async fn get_results(
        &self,
        task_ids: &[String],
        max_wait: Duration,
        poll_interval: Duration,
        cancel: &CancellationToken,
    ) -> ResultsReport {
        tracing::info!(tasks = task_ids.len(), "getting results");
        self.checker
            .get_results_only(task_ids, max_wait, poll_interval, cancel)
            .await
    }

    pub async fn get_task_status(&self, task_ids: &[String]) -> StatusEnvelope {
        tracing::info!(tasks = task_ids.len(), "checking task status");
        self.checker.get_status(task_ids).await
    }

    /// Grid points without creating tasks.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::InvalidParameter`] for out-of-range input.
    pub fn calculate_grid_coordinates(
        lat: f64,
        lng: f64,
        grid_size: u32,
        radius_km: f64,
    ) -> Result<Vec<GridCoordinate>, RankError> {
        let points = calculate_grid_coordinates(lat, lng, grid_size, radius_km)?;
        tracing::info!(points = points.len(), grid_size, radius_km, "calculated grid");
        Ok(points)
    }

    /// Service metadata, including a live credential check against the
    /// provider.
    pub async fn service_info(&self) -> ServiceInfo {
        let api_connection = match self.checker.client().check_connection().await {
            Ok(()) => ApiConnection::Working,
            Err(e) => {
                tracing::warn!(error = %e, "provider connection check failed");
                ApiConnection::NotWorking
            }
        };
        ServiceInfo::build(true, api_connection)
    }

    /// Fills `report.rank_map` from its paired task records.
    pub fn attach_rank_map(report: &mut GridCheckReport, target_domain: &str) {
        let map = build_rank_map_from_tasks(&report.batch(), &report.results, Some(target_domain));
        tracing::info!(
            entries = map.len(),
            ranked = map.iter().filter(|e| e.rank.is_some()).count(),
            target_domain,
            "attached rank map"
        );
        report.rank_map = Some(map);
    }
}

fn log_report(report: &GridCheckReport) {
    let summary = &report.results.summary;
    if let Some(error) = &report.error {
        tracing::error!(error = %error, "grid check did not succeed");
    }
    tracing::info!(
        total = summary.total_tasks,
        completed = summary.completed_count,
        failed = summary.failed_count,
        pending = summary.pending_count,
        "grid check summary"
    );
}
