pub mod batcher;
pub mod checker;
pub mod error;
pub mod fetcher;
pub mod rank;
pub mod records;
pub mod service;

pub use batcher::{GridTask, Submission, TaskBatch, TaskBatcher, TaskHandle};
pub use checker::{
    Center, GridCheckReport, GridParameters, GridRankChecker, ReportMetadata, StatusEnvelope,
    StatusKind,
};
pub use error::RankError;
pub use fetcher::{
    classify, is_empty_body, PollConfig, PollSession, PollSummary, QuickStatus, ResultsFetcher,
    ResultsReport, TaskState,
};
pub use rank::{
    build_rank_map, build_rank_map_from_tasks, compute_rank_for_domain,
    compute_ranks_for_results, RankMapEntry, TaskStatus,
};
pub use records::{RankingJob, RankingTask};
pub use service::{ApiConnection, RankingService, ServiceInfo};
pub use tokio_util::sync::CancellationToken;
