pub mod budget;
pub mod client;
pub mod error;
mod retry;
pub mod types;

pub use budget::RequestBudget;
pub use client::{ClientSettings, ProviderClient};
pub use error::ProviderError;
pub use types::{
    TaskGetEnvelope, TaskGetStatus, TaskPostEnvelope, TaskPostItem, TaskPostResult,
    STATUS_OK, STATUS_TASK_CREATED, TERMINAL_FAILURE_CODES,
};
