//! Result polling for submitted tasks.
//!
//! The fetcher itself is stateless. Everything a poll run learns lives in a
//! caller-owned [`PollSession`], so a session can be driven again later and
//! tasks that already reached a terminal state are never fetched twice.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use gridrank_core::AppConfig;
use gridrank_provider::{ProviderClient, TaskGetEnvelope, STATUS_OK, TERMINAL_FAILURE_CODES};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(1800);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(120);
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Classification of one task's latest provider payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "payload", rename_all = "snake_case")]
pub enum TaskState {
    Completed(Value),
    Failed(Value),
    Pending,
}

/// Classifies a raw `task_get` payload.
///
/// - **Completed:** some task entry has status `20000` and a positive
///   `result_count`.
/// - **Failed:** the payload has no `tasks` array, or some entry carries a
///   terminal failure code.
/// - **Pending:** anything else, including an empty `tasks` array.
///
/// Callers screen out empty bodies with [`is_empty_body`] first; those mean
/// the fetch produced nothing, not that the task failed.
#[must_use]
pub fn classify(payload: &Value) -> TaskState {
    let Some(envelope) = TaskGetEnvelope::from_payload(payload) else {
        return TaskState::Failed(payload.clone());
    };
    if envelope
        .tasks
        .iter()
        .any(|t| t.status_code == STATUS_OK && t.result_count > 0)
    {
        return TaskState::Completed(payload.clone());
    }
    if envelope
        .tasks
        .iter()
        .any(|t| TERMINAL_FAILURE_CODES.contains(&t.status_code))
    {
        return TaskState::Failed(payload.clone());
    }
    TaskState::Pending
}

/// True for `null`, `{}`, `[]` and any other body that is not a non-empty
/// JSON object.
#[must_use]
pub fn is_empty_body(payload: &Value) -> bool {
    !payload.as_object().is_some_and(|map| !map.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub max_wait: Duration,
    pub poll_interval: Duration,
    /// Fetches in flight at once within a round.
    pub max_concurrent: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_wait: DEFAULT_MAX_WAIT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

impl PollConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_wait: Duration::from_secs(config.max_wait_secs),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            max_concurrent: config.max_concurrent_fetches.max(1),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollSummary {
    pub total_tasks: usize,
    pub completed_count: usize,
    pub failed_count: usize,
    pub pending_count: usize,
    pub polls_performed: u32,
    pub elapsed_time_seconds: f64,
    #[serde(default)]
    pub cancelled: bool,
}

/// Final partition of a poll run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsReport {
    pub completed: BTreeMap<String, Value>,
    pub failed: BTreeMap<String, Value>,
    pub pending: Vec<String>,
    pub summary: PollSummary,
}

/// Mutable state of one polling run, owned by the caller.
///
/// Each [`ResultsFetcher::poll_session`] call restarts the clock from its
/// own start; the terminal partitions and the round counter carry over.
#[derive(Debug, Clone)]
pub struct PollSession {
    pending: Vec<String>,
    completed: BTreeMap<String, Value>,
    failed: BTreeMap<String, Value>,
    max_wait: Duration,
    poll_interval: Duration,
    started_at: Instant,
    deadline: Instant,
    poll_count: u32,
    cancelled: bool,
}

impl PollSession {
    /// Duplicate ids are polled once.
    #[must_use]
    pub fn new<I, S>(task_ids: I, max_wait: Duration, poll_interval: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let now = Instant::now();
        let mut session = Self {
            pending: Vec::new(),
            completed: BTreeMap::new(),
            failed: BTreeMap::new(),
            max_wait,
            poll_interval,
            started_at: now,
            deadline: now + max_wait,
            poll_count: 0,
            cancelled: false,
        };
        session.add_tasks(task_ids);
        session
    }

    /// Adds ids to the pending set unless they are already known.
    pub fn add_tasks<I, S>(&mut self, task_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen: HashSet<String> = self.pending.iter().cloned().collect();
        for id in task_ids {
            let id = id.into();
            if self.is_terminal(&id) || !seen.insert(id.clone()) {
                continue;
            }
            self.pending.push(id);
        }
    }

    #[must_use]
    pub fn is_terminal(&self, task_id: &str) -> bool {
        self.completed.contains_key(task_id) || self.failed.contains_key(task_id)
    }

    #[must_use]
    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    #[must_use]
    pub fn completed(&self) -> &BTreeMap<String, Value> {
        &self.completed
    }

    #[must_use]
    pub fn failed(&self) -> &BTreeMap<String, Value> {
        &self.failed
    }

    #[must_use]
    pub fn poll_count(&self) -> u32 {
        self.poll_count
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.pending.len() + self.completed.len() + self.failed.len()
    }

    fn restart_clock(&mut self) {
        self.started_at = Instant::now();
        self.deadline = self.started_at + self.max_wait;
        self.cancelled = false;
    }

    /// Applies a classification. Terminal states are final.
    fn record(&mut self, task_id: &str, state: TaskState) {
        if self.is_terminal(task_id) {
            return;
        }
        match state {
            TaskState::Completed(payload) => {
                tracing::info!(task_id, "task completed");
                self.pending.retain(|id| id != task_id);
                self.completed.insert(task_id.to_owned(), payload);
            }
            TaskState::Failed(payload) => {
                tracing::warn!(task_id, "task failed");
                self.pending.retain(|id| id != task_id);
                self.failed.insert(task_id.to_owned(), payload);
            }
            TaskState::Pending => tracing::debug!(task_id, "task still processing"),
        }
    }

    /// Snapshot of the session as a report. `total_tasks` counts distinct
    /// ids.
    #[must_use]
    pub fn report(&self) -> ResultsReport {
        ResultsReport {
            completed: self.completed.clone(),
            failed: self.failed.clone(),
            pending: self.pending.clone(),
            summary: PollSummary {
                total_tasks: self.total(),
                completed_count: self.completed.len(),
                failed_count: self.failed.len(),
                pending_count: self.pending.len(),
                polls_performed: self.poll_count,
                elapsed_time_seconds: self.started_at.elapsed().as_secs_f64(),
                cancelled: self.cancelled,
            },
        }
    }
}

/// Counts from a single non-blocking status sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickStatus {
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
    /// Tasks whose fetch failed or returned an empty body.
    pub unknown: usize,
    pub total: usize,
}

/// Polls the provider for task results.
#[derive(Debug, Clone)]
pub struct ResultsFetcher {
    client: ProviderClient,
    config: PollConfig,
}

impl ResultsFetcher {
    #[must_use]
    pub fn new(client: ProviderClient, config: PollConfig) -> Self {
        Self { client, config }
    }

    #[must_use]
    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Polls `task_ids` until all resolve, the deadline passes or `cancel`
    /// fires.
    ///
    /// An empty id list returns an empty report without any provider call.
    /// Duplicate ids are polled once, but `total_tasks` reports the number
    /// of ids passed in.
    pub async fn get_all_results(
        &self,
        task_ids: &[String],
        max_wait: Duration,
        poll_interval: Duration,
        cancel: &CancellationToken,
    ) -> ResultsReport {
        if task_ids.is_empty() {
            tracing::warn!("no task ids provided");
            return ResultsReport::default();
        }
        tracing::info!(tasks = task_ids.len(), "getting all results");
        let mut session = PollSession::new(task_ids.iter().cloned(), max_wait, poll_interval);
        self.poll_session(&mut session, cancel).await;
        let mut report = session.report();
        report.summary.total_tasks = task_ids.len();
        report
    }

    /// Drives a caller-owned session through poll rounds.
    ///
    /// Each round fetches every pending task once. After a round the loop
    /// sleeps for the poll interval only if tasks remain pending and more
    /// than one interval is left before the deadline; otherwise it stops.
    pub async fn poll_session(&self, session: &mut PollSession, cancel: &CancellationToken) {
        session.restart_clock();
        tracing::info!(
            pending = session.pending.len(),
            poll_interval_secs = session.poll_interval.as_secs(),
            max_wait_secs = session.max_wait.as_secs(),
            "starting to poll tasks"
        );

        while !session.pending.is_empty() && Instant::now() < session.deadline {
            if cancel.is_cancelled() {
                session.cancelled = true;
                break;
            }
            session.poll_count += 1;
            tracing::info!(
                round = session.poll_count,
                pending = session.pending.len(),
                "poll round"
            );

            let ids = session.pending.clone();
            for (task_id, state) in self.fetch_round(&ids, cancel).await {
                session.record(&task_id, state);
            }
            if cancel.is_cancelled() {
                session.cancelled = true;
                break;
            }
            if session.pending.is_empty() {
                break;
            }

            let remaining = session.deadline.saturating_duration_since(Instant::now());
            if remaining <= session.poll_interval {
                tracing::info!(
                    remaining_secs = remaining.as_secs(),
                    "not enough time remaining for another poll round"
                );
                break;
            }
            tracing::info!(
                wait_secs = session.poll_interval.as_secs(),
                pending = session.pending.len(),
                remaining_secs = remaining.as_secs(),
                "waiting before next poll round"
            );
            tokio::select! {
                () = cancel.cancelled() => {
                    session.cancelled = true;
                    break;
                }
                () = tokio::time::sleep(session.poll_interval) => {}
            }
        }

        tracing::info!(
            completed = session.completed.len(),
            failed = session.failed.len(),
            pending = session.pending.len(),
            rounds = session.poll_count,
            cancelled = session.cancelled,
            "polling finished"
        );
    }

    /// One fetch per id, `max_concurrent` at a time.
    ///
    /// Transport and parse failures and empty bodies leave the task pending.
    /// Fetches that have not finished when `cancel` fires are dropped.
    async fn fetch_round(
        &self,
        task_ids: &[String],
        cancel: &CancellationToken,
    ) -> Vec<(String, TaskState)> {
        stream::iter(task_ids.iter().cloned())
            .map(|task_id| async move {
                let state = match self.client.get_task(&task_id).await {
                    Ok(payload) if is_empty_body(&payload) => {
                        tracing::warn!(task_id = %task_id, "task result body was empty");
                        TaskState::Pending
                    }
                    Ok(payload) => classify(&payload),
                    Err(e) => {
                        tracing::warn!(task_id = %task_id, error = %e, "could not fetch task result");
                        TaskState::Pending
                    }
                };
                (task_id, state)
            })
            .buffer_unordered(self.config.max_concurrent.max(1))
            .take_until(cancel.cancelled())
            .collect()
            .await
    }

    /// Fetches every task once and counts the outcomes. No retries across
    /// rounds and no sleeping.
    pub async fn get_quick_status(&self, task_ids: &[String]) -> QuickStatus {
        let mut status = QuickStatus {
            total: task_ids.len(),
            ..QuickStatus::default()
        };
        if task_ids.is_empty() {
            return status;
        }
        tracing::info!(tasks = task_ids.len(), "performing quick status check");

        let outcomes: Vec<Option<TaskState>> = stream::iter(task_ids.iter().cloned())
            .map(|task_id| async move {
                match self.client.get_task(&task_id).await {
                    Ok(payload) if is_empty_body(&payload) => {
                        tracing::warn!(task_id = %task_id, "status body was empty");
                        None
                    }
                    Ok(payload) => Some(classify(&payload)),
                    Err(e) => {
                        tracing::warn!(task_id = %task_id, error = %e, "status fetch failed");
                        None
                    }
                }
            })
            .buffer_unordered(self.config.max_concurrent.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                Some(TaskState::Completed(_)) => status.completed += 1,
                Some(TaskState::Failed(_)) => status.failed += 1,
                Some(TaskState::Pending) => status.pending += 1,
                None => status.unknown += 1,
            }
        }
        status
    }
}

#[cfg(test)]
#[path = "fetcher_test.rs"]
mod tests;
