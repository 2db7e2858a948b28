use gridrank_core::{CredentialsError, ValidationError};
use gridrank_provider::ProviderError;
use thiserror::Error;

/// Errors surfaced by the grid rank workflow.
///
/// Per-task provider failures and transient fetch errors never appear here:
/// they are recorded in the poll results instead.
#[derive(Debug, Error)]
pub enum RankError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(#[from] ValidationError),

    #[error("invalid provider credentials: {0}")]
    InvalidCredentials(#[from] CredentialsError),

    #[error("task submission failed: {0}")]
    Submission(#[source] ProviderError),

    #[error("provider client error: {0}")]
    Client(#[source] ProviderError),

    #[error("operation cancelled")]
    Cancelled,
}
