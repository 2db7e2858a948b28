//! Plain records for a persistence collaborator.
//!
//! Nothing here touches storage; the structs are what a storage layer would
//! write for a job and its per-coordinate tasks.

use chrono::{DateTime, Utc};
use gridrank_core::GridRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::fetcher::ResultsReport;
use crate::rank::{RankMapEntry, TaskStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingJob {
    pub id: Uuid,
    pub business_name: String,
    pub center_lat: f64,
    pub center_lng: f64,
    pub grid_size: u32,
    pub radius_km: f64,
    pub created_at: DateTime<Utc>,
}

impl RankingJob {
    #[must_use]
    pub fn from_request(request: &GridRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            business_name: request.business_name().to_owned(),
            center_lat: request.center_lat(),
            center_lng: request.center_lng(),
            grid_size: request.grid_size(),
            radius_km: request.radius_km(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingTask {
    pub job_id: Uuid,
    pub task_id: String,
    pub coord_lat: f64,
    pub coord_lng: f64,
    pub coord_zoom: u8,
    pub status: TaskStatus,
    pub target_domain: Option<String>,
    pub rank_position: Option<usize>,
    pub completed_at: Option<DateTime<Utc>>,
    pub raw_result: Option<Value>,
}

impl RankingTask {
    /// One record per rank-map entry. Completed and failed tasks carry
    /// their raw payload and a completion timestamp.
    #[must_use]
    pub fn from_rank_map(
        job: &RankingJob,
        entries: &[RankMapEntry],
        results: &ResultsReport,
        target_domain: Option<&str>,
    ) -> Vec<Self> {
        let now = Utc::now();
        entries
            .iter()
            .map(|entry| {
                let raw_result = results
                    .completed
                    .get(&entry.task_id)
                    .or_else(|| results.failed.get(&entry.task_id))
                    .cloned();
                Self {
                    job_id: job.id,
                    task_id: entry.task_id.clone(),
                    coord_lat: entry.lat,
                    coord_lng: entry.lng,
                    coord_zoom: entry.zoom,
                    status: entry.status,
                    target_domain: target_domain.map(str::to_owned),
                    rank_position: entry.rank,
                    completed_at: (entry.status != TaskStatus::Pending).then_some(now),
                    raw_result,
                }
            })
            .collect()
    }
}
