//! Rank extraction over completed task payloads.

use std::collections::BTreeMap;

use gridrank_core::{grid::parse_coordinate, DEFAULT_ZOOM};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::batcher::TaskBatch;
use crate::fetcher::ResultsReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Completed,
    Failed,
    Pending,
}

impl TaskStatus {
    #[must_use]
    pub fn of(task_id: &str, results: &ResultsReport) -> Self {
        if results.completed.contains_key(task_id) {
            TaskStatus::Completed
        } else if results.failed.contains_key(task_id) {
            TaskStatus::Failed
        } else {
            TaskStatus::Pending
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Pending => "pending",
        }
    }
}

/// One grid cell with its task, final status and rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankMapEntry {
    pub index: usize,
    pub task_id: String,
    pub lat: f64,
    pub lng: f64,
    pub zoom: u8,
    pub status: TaskStatus,
    pub rank: Option<usize>,
}

/// Host part of a URL, lowercased. Empty when the string is not an absolute URL.
fn host_of(raw: &str) -> String {
    Url::parse(raw)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .unwrap_or_default()
}

fn item_domain(item: &Value) -> String {
    let field = |name: &str| item.get(name).and_then(Value::as_str).unwrap_or_default();
    let domain = field("domain");
    if !domain.is_empty() {
        return domain.to_ascii_lowercase();
    }
    let from_url = host_of(field("url"));
    if !from_url.is_empty() {
        return from_url;
    }
    host_of(field("source_url"))
}

/// 1-based position of the first item whose domain contains `target_domain`.
///
/// Looks at the first result set of the first task only. The item's domain
/// is its `domain` field, else the host of `url`, else the host of
/// `source_url`; matching is a case-insensitive substring test. Returns
/// `None` when nothing matches or the payload is not shaped as expected.
#[must_use]
pub fn compute_rank_for_domain(payload: &Value, target_domain: &str) -> Option<usize> {
    let target = target_domain.trim().to_ascii_lowercase();
    if target.is_empty() {
        return None;
    }
    let items = payload
        .get("tasks")?
        .get(0)?
        .get("result")?
        .get(0)?
        .get("items")?
        .as_array()?;

    items
        .iter()
        .position(|item| {
            let domain = item_domain(item);
            !domain.is_empty() && domain.contains(&target)
        })
        .map(|i| i + 1)
}

#[must_use]
pub fn compute_ranks_for_results(
    completed: &BTreeMap<String, Value>,
    target_domain: &str,
) -> BTreeMap<String, Option<usize>> {
    completed
        .iter()
        .map(|(id, payload)| (id.clone(), compute_rank_for_domain(payload, target_domain)))
        .collect()
}

fn parse_or_origin(raw: &str) -> (f64, f64, u8) {
    parse_coordinate(raw).unwrap_or((0.0, 0.0, DEFAULT_ZOOM))
}

fn rank_for(
    task_id: &str,
    status: TaskStatus,
    ranks: Option<&BTreeMap<String, Option<usize>>>,
) -> Option<usize> {
    if status != TaskStatus::Completed {
        return None;
    }
    ranks.and_then(|r| r.get(task_id).copied().flatten())
}

/// Zips task ids with coordinate strings by position.
///
/// Index `i` of one sequence must describe the same grid point as index `i`
/// of the other. Coordinates with an unparseable position fall back to `(0.0, 0.0, 15)`.
/// Ranks are filled only when `target_domain` is given.
#[must_use]
pub fn build_rank_map(
    task_ids: &[String],
    coordinate_strings: &[String],
    results: &ResultsReport,
    target_domain: Option<&str>,
) -> Vec<RankMapEntry> {
    let ranks = target_domain.map(|d| compute_ranks_for_results(&results.completed, d));

    task_ids
        .iter()
        .zip(coordinate_strings)
        .enumerate()
        .map(|(index, (task_id, coordinate))| {
            let (lat, lng, zoom) = parse_or_origin(coordinate);
            let status = TaskStatus::of(task_id, results);
            RankMapEntry {
                index,
                task_id: task_id.clone(),
                lat,
                lng,
                zoom,
                status,
                rank: rank_for(task_id, status, ranks.as_ref()),
            }
        })
        .collect()
}

/// Rank map built from paired submission records.
///
/// Only created tasks appear; `index` is the grid position, so gaps mark
/// rejected grid points.
#[must_use]
pub fn build_rank_map_from_tasks(
    batch: &TaskBatch,
    results: &ResultsReport,
    target_domain: Option<&str>,
) -> Vec<RankMapEntry> {
    let ranks = target_domain.map(|d| compute_ranks_for_results(&results.completed, d));

    batch
        .tasks
        .iter()
        .filter_map(|task| {
            let task_id = task.task_id()?;
            let (_, _, zoom) = parse_or_origin(&task.location);
            let status = TaskStatus::of(task_id, results);
            Some(RankMapEntry {
                index: task.index,
                task_id: task_id.to_owned(),
                lat: task.coordinate.lat,
                lng: task.coordinate.lng,
                zoom,
                status,
                rank: rank_for(task_id, status, ranks.as_ref()),
            })
        })
        .collect()
}
