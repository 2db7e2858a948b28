//! Wire types for the provider's map-search task endpoints.
//!
//! Only the fields needed to drive task creation and polling are modelled;
//! result payloads are kept as raw [`serde_json::Value`] and inspected by
//! callers.

use serde::{Deserialize, Serialize};

/// Envelope and task-level code for a finished task with results.
pub const STATUS_OK: i64 = 20_000;
/// Task-level code for a successfully created task.
pub const STATUS_TASK_CREATED: i64 = 20_100;
/// Task-level codes that end a task without results.
pub const TERMINAL_FAILURE_CODES: &[i64] = &[40_000, 40_100, 40_200, 40_300, 50_000];

/// One entry of the `task_post` request array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskPostItem {
    pub keyword: String,
    pub location_coordinate: String,
    pub language_code: String,
    pub device: String,
    pub tag: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskPostEnvelope {
    #[serde(default)]
    pub status_code: Option<i64>,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub tasks: Vec<TaskPostResult>,
}

/// Per-item result of a `task_post` call.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskPostResult {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status_code: i64,
    #[serde(default)]
    pub status_message: String,
    /// Echo of the submitted item; the provider includes the `tag` here.
    #[serde(default)]
    pub data: Option<TaskPostEcho>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskPostEcho {
    #[serde(default)]
    pub tag: Option<String>,
}

impl TaskPostResult {
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.tag.as_deref())
    }

    /// The provider-assigned id, if this item was created.
    #[must_use]
    pub fn created_id(&self) -> Option<&str> {
        if self.status_code == STATUS_TASK_CREATED {
            self.id.as_deref().filter(|id| !id.is_empty())
        } else {
            None
        }
    }
}

/// Typed view over the status fields of a `task_get` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskGetEnvelope {
    #[serde(default)]
    pub tasks: Vec<TaskGetStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskGetStatus {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status_code: i64,
    #[serde(default)]
    pub status_message: String,
    #[serde(default)]
    pub result_count: i64,
}

impl TaskGetEnvelope {
    /// Reads the status fields out of a raw payload.
    ///
    /// Returns `None` when the payload has no `tasks` array. Entries are read
    /// field by field, so a `null` or mistyped field falls back to its default
    /// instead of discarding the whole payload.
    #[must_use]
    pub fn from_payload(payload: &serde_json::Value) -> Option<Self> {
        let tasks = payload.get("tasks")?.as_array()?;
        Some(Self {
            tasks: tasks.iter().map(TaskGetStatus::from_entry).collect(),
        })
    }
}

impl TaskGetStatus {
    fn from_entry(entry: &serde_json::Value) -> Self {
        let int = |key: &str| entry.get(key).and_then(serde_json::Value::as_i64);
        let text = |key: &str| entry.get(key).and_then(serde_json::Value::as_str);
        Self {
            id: text("id").map(str::to_owned),
            status_code: int("status_code").unwrap_or(0),
            status_message: text("status_message").unwrap_or_default().to_owned(),
            result_count: int("result_count").unwrap_or(0),
        }
    }
}
