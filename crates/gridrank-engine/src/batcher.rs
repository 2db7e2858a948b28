//! Batch task creation for a grid request.
//!
//! One provider task is built per grid point and the whole grid is posted in
//! a single call. Each grid point comes back as a [`GridTask`] that keeps its
//! coordinate and the provider's verdict together, so rejected points are
//! reported instead of silently disappearing.

use gridrank_core::{GridCoordinate, GridRequest, ValidationError};
use gridrank_provider::{ProviderClient, TaskPostItem, TaskPostResult};
use serde::{Deserialize, Serialize};

use crate::error::RankError;

/// Outcome of submitting one grid point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Submission {
    Created { task_id: String },
    Rejected { status_code: i64, status_message: String },
}

/// One grid point paired with its submission outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridTask {
    /// Zero-based row-major position in the grid.
    pub index: usize,
    pub coordinate: GridCoordinate,
    /// The `lat,lng,zoom` string sent to the provider.
    pub location: String,
    pub submission: Submission,
}

impl GridTask {
    #[must_use]
    pub fn task_id(&self) -> Option<&str> {
        match &self.submission {
            Submission::Created { task_id } => Some(task_id),
            Submission::Rejected { .. } => None,
        }
    }
}

/// A created task and the grid point it was submitted for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskHandle {
    pub task_id: String,
    pub coordinate: GridCoordinate,
    pub location: String,
}

/// All grid points of one submission, in row-major order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskBatch {
    pub tasks: Vec<GridTask>,
}

impl TaskBatch {
    /// Accepted task ids in grid order.
    #[must_use]
    pub fn task_ids(&self) -> Vec<String> {
        self.tasks
            .iter()
            .filter_map(|t| t.task_id().map(str::to_owned))
            .collect()
    }

    /// Formatted coordinates of every grid point, accepted or not.
    #[must_use]
    pub fn coordinate_strings(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.location.clone()).collect()
    }

    #[must_use]
    pub fn handles(&self) -> Vec<TaskHandle> {
        self.tasks
            .iter()
            .filter_map(|t| {
                t.task_id().map(|id| TaskHandle {
                    task_id: id.to_owned(),
                    coordinate: t.coordinate,
                    location: t.location.clone(),
                })
            })
            .collect()
    }

    #[must_use]
    pub fn rejected(&self) -> Vec<&GridTask> {
        self.tasks.iter().filter(|t| t.task_id().is_none()).collect()
    }

    #[must_use]
    pub fn created_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.task_id().is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Builds and submits provider tasks for a grid request.
#[derive(Debug, Clone)]
pub struct TaskBatcher {
    client: ProviderClient,
}

impl TaskBatcher {
    #[must_use]
    pub fn new(client: ProviderClient) -> Self {
        Self { client }
    }

    /// Builds one task payload per grid point, in row-major order.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if a grid point cannot be formatted.
    pub fn build_payloads(
        request: &GridRequest,
    ) -> Result<Vec<(GridCoordinate, TaskPostItem)>, ValidationError> {
        let points = request.grid_coordinates()?;
        let total = points.len();
        let payloads = points
            .into_iter()
            .enumerate()
            .map(|(i, point)| {
                let item = TaskPostItem {
                    keyword: request.business_name().to_owned(),
                    location_coordinate: point.to_api_string(request.zoom())?,
                    language_code: request.language_code().to_owned(),
                    device: request.device().as_str().to_owned(),
                    tag: grid_tag(i + 1, total),
                };
                Ok((point, item))
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        tracing::info!(
            business = request.business_name(),
            count = payloads.len(),
            "built task payloads"
        );
        Ok(payloads)
    }

    /// Submits the whole grid in one call and pairs every grid point with
    /// its outcome.
    ///
    /// # Errors
    ///
    /// - [`RankError::InvalidParameter`] if payload construction fails.
    /// - [`RankError::Submission`] if the batch call fails as a whole.
    pub async fn submit(&self, request: &GridRequest) -> Result<TaskBatch, RankError> {
        let payloads = Self::build_payloads(request)?;
        if payloads.is_empty() {
            tracing::warn!("no task payloads to submit");
            return Ok(TaskBatch::default());
        }

        let items: Vec<TaskPostItem> = payloads.iter().map(|(_, item)| item.clone()).collect();
        tracing::info!(count = items.len(), "submitting task batch");
        let envelope = self
            .client
            .post_tasks(&items)
            .await
            .map_err(RankError::Submission)?;

        let submissions = match_submissions(items.len(), envelope.tasks);
        let tasks: Vec<GridTask> = payloads
            .into_iter()
            .zip(submissions)
            .enumerate()
            .map(|(index, ((coordinate, item), submission))| {
                if let Submission::Rejected {
                    status_code,
                    status_message,
                } = &submission
                {
                    tracing::warn!(
                        index,
                        location = %item.location_coordinate,
                        status_code,
                        status_message = %status_message,
                        "task creation rejected"
                    );
                }
                GridTask {
                    index,
                    coordinate,
                    location: item.location_coordinate,
                    submission,
                }
            })
            .collect();

        let batch = TaskBatch { tasks };
        tracing::info!(
            created = batch.created_count(),
            rejected = batch.tasks.len() - batch.created_count(),
            "task batch submitted"
        );
        Ok(batch)
    }

    /// Submits the grid and returns the accepted task ids in grid order.
    ///
    /// The list is shorter than the grid when the provider rejects points;
    /// use [`TaskBatcher::submit`] to learn which ones.
    ///
    /// # Errors
    ///
    /// See [`TaskBatcher::submit`].
    pub async fn create_and_submit_tasks(
        &self,
        request: &GridRequest,
    ) -> Result<Vec<String>, RankError> {
        Ok(self.submit(request).await?.task_ids())
    }
}

fn grid_tag(position: usize, total: usize) -> String {
    format!("grid_point_{position}_{total}")
}

/// Parses `grid_point_{i}_{total}` into a zero-based slot.
fn slot_from_tag(tag: &str, total: usize) -> Option<usize> {
    let rest = tag.strip_prefix("grid_point_")?;
    let (position, tag_total) = rest.split_once('_')?;
    let position: usize = position.parse().ok()?;
    let tag_total: usize = tag_total.parse().ok()?;
    if tag_total == total && (1..=total).contains(&position) {
        Some(position - 1)
    } else {
        None
    }
}

/// Assigns response items to payload slots.
///
/// Items are matched by their echoed tag first; items without a usable tag
/// fall back to their position in the response. Slots left without an item
/// are reported as rejected.
fn match_submissions(total: usize, items: Vec<TaskPostResult>) -> Vec<Submission> {
    let mut slots: Vec<Option<Submission>> = vec![None; total];
    let mut untagged = Vec::new();

    for (position, item) in items.into_iter().enumerate() {
        match item.tag().and_then(|tag| slot_from_tag(tag, total)) {
            Some(slot) if slots[slot].is_none() => slots[slot] = Some(to_submission(&item)),
            _ => untagged.push((position, item)),
        }
    }
    for (position, item) in untagged {
        if let Some(slot) = slots.get_mut(position).filter(|s| s.is_none()) {
            *slot = Some(to_submission(&item));
        } else {
            tracing::warn!(
                position,
                status_message = %item.status_message,
                "unmatched task creation response item"
            );
        }
    }

    slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| Submission::Rejected {
                status_code: 0,
                status_message: "no response item for this grid point".to_owned(),
            })
        })
        .collect()
}

fn to_submission(item: &TaskPostResult) -> Submission {
    match item.created_id() {
        Some(id) => Submission::Created {
            task_id: id.to_owned(),
        },
        None => Submission::Rejected {
            status_code: item.status_code,
            status_message: if item.status_message.is_empty() {
                "unknown error".to_owned()
            } else {
                item.status_message.clone()
            },
        },
    }
}
