//! Rank grid command handlers for the CLI.
//!
//! Every handler prints its result as pretty JSON on stdout; logs go to
//! stderr so the output can be piped.

use std::time::Duration;

use anyhow::Context as _;
use gridrank_core::validate::validate_polling_parameters;
use gridrank_core::{AppConfig, Credentials, GridRequest};
use gridrank_engine::{build_rank_map, CancellationToken, RankingService, ServiceInfo};
use serde::Serialize;

use crate::{GridOptions, Location, PollOptions};

/// Shared state handed to each handler.
pub(crate) struct Context<'a> {
    pub config: &'a AppConfig,
    pub credentials: Option<Credentials>,
    pub cancel: &'a CancellationToken,
}

impl Context<'_> {
    fn service(&self) -> anyhow::Result<RankingService> {
        RankingService::from_app_config(self.config, self.credentials.clone())
            .context("failed to initialize ranking service")
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn poll_bounds(poll: &PollOptions) -> anyhow::Result<(Duration, Duration)> {
    validate_polling_parameters(poll.max_wait, poll.poll_interval)?;
    Ok((
        Duration::from_secs(poll.max_wait),
        Duration::from_secs(poll.poll_interval),
    ))
}

fn build_request(location: &Location, grid: &GridOptions) -> anyhow::Result<GridRequest> {
    let request = GridRequest::builder(&location.business, location.lat, location.lng)
        .grid_size(grid.grid_size)
        .radius_km(grid.radius_km)
        .language_code(&grid.language)
        .device(grid.device)
        .zoom(grid.zoom)
        .build()?;
    Ok(request)
}

pub(crate) async fn run_quick(
    ctx: &Context<'_>,
    location: &Location,
    target_domain: Option<&str>,
) -> anyhow::Result<()> {
    let service = ctx.service()?;
    let mut report = service
        .quick_check(&location.business, location.lat, location.lng, ctx.cancel)
        .await?;
    if let Some(domain) = target_domain {
        RankingService::attach_rank_map(&mut report, domain);
    }
    print_json(&report)
}

pub(crate) async fn run_advanced(
    ctx: &Context<'_>,
    location: &Location,
    grid: &GridOptions,
    poll: &PollOptions,
    target_domain: Option<&str>,
) -> anyhow::Result<()> {
    let request = build_request(location, grid)?;
    let (max_wait, poll_interval) = poll_bounds(poll)?;
    let service = ctx.service()?;

    let mut report = service
        .advanced_check(&request, max_wait, poll_interval, ctx.cancel)
        .await?;
    if let Some(domain) = target_domain {
        RankingService::attach_rank_map(&mut report, domain);
    }
    print_json(&report)?;

    if !report.is_success() {
        anyhow::bail!(
            "grid check failed: {}",
            report.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct CreatedTasks {
    task_ids: Vec<String>,
    grid_coordinates: Vec<String>,
    tasks: Vec<gridrank_engine::GridTask>,
}

pub(crate) async fn run_create(
    ctx: &Context<'_>,
    location: &Location,
    grid: &GridOptions,
) -> anyhow::Result<()> {
    let request = build_request(location, grid)?;
    let service = ctx.service()?;
    let batch = service.create_tasks(&request).await?;

    let rejected = batch.rejected().len();
    if rejected > 0 {
        eprintln!("warning: {rejected} grid point(s) were rejected by the provider");
    }
    print_json(&CreatedTasks {
        task_ids: batch.task_ids(),
        grid_coordinates: batch.coordinate_strings(),
        tasks: batch.tasks,
    })
}

#[derive(Debug, Serialize)]
struct ResultsOutput {
    #[serde(flatten)]
    report: gridrank_engine::ResultsReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    rank_map: Option<Vec<gridrank_engine::RankMapEntry>>,
}

pub(crate) async fn run_results(
    ctx: &Context<'_>,
    task_ids: &[String],
    coordinates: &[String],
    target_domain: Option<&str>,
    poll: &PollOptions,
) -> anyhow::Result<()> {
    let (max_wait, poll_interval) = poll_bounds(poll)?;
    let service = ctx.service()?;
    let report = service
        .get_results(task_ids, max_wait, poll_interval, ctx.cancel)
        .await;

    let rank_map = target_domain.map(|domain| {
        if coordinates.len() != task_ids.len() {
            tracing::warn!(
                tasks = task_ids.len(),
                coordinates = coordinates.len(),
                "coordinate count differs from task count; the rank map covers only paired entries"
            );
        }
        build_rank_map(task_ids, coordinates, &report, Some(domain))
    });
    print_json(&ResultsOutput { report, rank_map })
}

pub(crate) async fn run_status(ctx: &Context<'_>, task_ids: &[String]) -> anyhow::Result<()> {
    let service = ctx.service()?;
    let envelope = service.get_task_status(task_ids).await;
    print_json(&envelope)
}

pub(crate) fn run_grid(lat: f64, lng: f64, grid_size: u32, radius_km: f64) -> anyhow::Result<()> {
    let points = RankingService::calculate_grid_coordinates(lat, lng, grid_size, radius_km)?;
    print_json(&points)
}

pub(crate) async fn run_info(ctx: &Context<'_>) -> anyhow::Result<()> {
    let info = match ctx.service() {
        Ok(service) => service.service_info().await,
        Err(e) => {
            tracing::warn!(error = %e, "provider credentials unavailable");
            ServiceInfo::unconfigured()
        }
    };
    print_json(&info)
}
