use crate::error::{ErrorCategory, OrchestratorError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stage identifier. `Crawl`/`Enrich`/`Materialize` make up the ingestion
/// pipeline for one repository; `Project`/`MartUpsert` make up the
/// analytics projection pipeline that runs over the materialized PRs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageId {
    Crawl,
    Enrich,
    Materialize,
    Project,
    MartUpsert,
}

impl StageId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Crawl => "Crawl",
            StageId::Enrich => "Enrich",
            StageId::Materialize => "Materialize",
            StageId::Project => "Project",
            StageId::MartUpsert => "MartUpsert",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "Crawl" => Ok(StageId::Crawl),
            "Enrich" => Ok(StageId::Enrich),
            "Materialize" => Ok(StageId::Materialize),
            "Project" => Ok(StageId::Project),
            "MartUpsert" => Ok(StageId::MartUpsert),
            _ => Err(OrchestratorError::parse(format!("invalid stage ID: {}", s))),
        }
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Job state enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobState {
    Queued {
        queued_at: DateTime<Utc>,
        priority: i32,
    },
    Running {
        started_at: DateTime<Utc>,
        worker_id: String,
        current_stage: StageId,
        checkpoint_id: Option<Uuid>,
    },
    Completed {
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        duration_ms: u64,
        prs_processed: usize,
    },
    Failed {
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
        error: String,
        error_category: ErrorCategory,
        failed_stage: StageId,
        retry_count: u32,
        next_retry_at: Option<DateTime<Utc>>,
    },
    Cancelled {
        cancelled_at: DateTime<Utc>,
        reason: String,
    },
}

impl JobState {
    pub fn state_name(&self) -> &'static str {
        match self {
            JobState::Queued { .. } => "queued",
            JobState::Running { .. } => "running",
            JobState::Completed { .. } => "completed",
            JobState::Failed { .. } => "failed",
            JobState::Cancelled { .. } => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed { .. } | JobState::Failed { .. } | JobState::Cancelled { .. })
    }
}

/// Job model. One `Job` drives either the ingestion pipeline or the
/// projection pipeline for a single repository (`repo_id` is
/// `owner/repo`, matching `PrRecord::repo_name`).
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub repo_id: String,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Resume cursor: the last PR number fully materialized by a prior,
    /// interrupted run of this job. `None` means a fresh ingest from the
    /// newest open/closed PR.
    pub resume_from_pr: Option<u64>,
}

impl Job {
    /// Create a new queued job starting from the beginning.
    pub fn new_queued(repo_id: String, priority: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            repo_id,
            state: JobState::Queued { queued_at: now, priority },
            created_at: now,
            updated_at: now,
            resume_from_pr: None,
        }
    }

    /// Create a new queued job resuming from a checkpointed PR number.
    pub fn new_resumed(repo_id: String, priority: i32, resume_from_pr: u64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            repo_id,
            state: JobState::Queued { queued_at: now, priority },
            created_at: now,
            updated_at: now,
            resume_from_pr: Some(resume_from_pr),
        }
    }

    /// Whether this job resumes a prior interrupted run rather than
    /// starting fresh.
    pub fn is_resume(&self) -> bool {
        self.resume_from_pr.is_some()
    }
}

/// Job state machine for transitions.
pub struct JobStateMachine {
    job: Job,
}

impl JobStateMachine {
    pub fn new(job: Job) -> Self {
        Self { job }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn into_job(self) -> Job {
        self.job
    }

    /// Transition: QUEUED -> RUNNING
    pub fn start(&mut self, worker_id: String, current_stage: StageId) -> Result<()> {
        match &self.job.state {
            JobState::Queued { .. } => {
                let now = Utc::now();
                self.job.state = JobState::Running { started_at: now, worker_id, current_stage, checkpoint_id: None };
                self.job.updated_at = now;
                Ok(())
            }
            _ => Err(OrchestratorError::InvalidStateTransition {
                from: self.job.state.state_name().to_string(),
                to: "running".to_string(),
            }),
        }
    }

    /// Transition: RUNNING -> COMPLETED
    pub fn complete(&mut self, prs_processed: usize) -> Result<()> {
        match &self.job.state {
            JobState::Running { started_at, .. } => {
                let now = Utc::now();
                let duration_ms = (now - *started_at).num_milliseconds() as u64;

                self.job.state =
                    JobState::Completed { started_at: *started_at, completed_at: now, duration_ms, prs_processed };
                self.job.updated_at = now;
                Ok(())
            }
            _ => Err(OrchestratorError::InvalidStateTransition {
                from: self.job.state.state_name().to_string(),
                to: "completed".to_string(),
            }),
        }
    }

    /// Transition: RUNNING -> FAILED
    pub fn fail(
        &mut self,
        error: String,
        error_category: ErrorCategory,
        failed_stage: StageId,
        retry_count: u32,
    ) -> Result<()> {
        match &self.job.state {
            JobState::Running { started_at, .. } | JobState::Failed { started_at, .. } => {
                let now = Utc::now();

                // Exponential backoff (2s, 4s, 8s).
                let next_retry_at = if retry_count < 3 && error_category == ErrorCategory::Transient {
                    let backoff_secs = 2u64.pow(retry_count);
                    Some(now + chrono::Duration::seconds(backoff_secs as i64))
                } else {
                    None
                };

                self.job.state = JobState::Failed {
                    started_at: *started_at,
                    failed_at: now,
                    error,
                    error_category,
                    failed_stage,
                    retry_count,
                    next_retry_at,
                };
                self.job.updated_at = now;
                Ok(())
            }
            _ => Err(OrchestratorError::InvalidStateTransition {
                from: self.job.state.state_name().to_string(),
                to: "failed".to_string(),
            }),
        }
    }

    /// Transition: FAILED -> QUEUED (retry)
    pub fn retry(&mut self) -> Result<()> {
        match &self.job.state {
            JobState::Failed { retry_count, next_retry_at, .. } => {
                if next_retry_at.is_none() {
                    return Err(OrchestratorError::Config("no retry scheduled (max retries exceeded)".to_string()));
                }

                let now = Utc::now();
                self.job.state = JobState::Queued { queued_at: now, priority: *retry_count as i32 };
                self.job.updated_at = now;
                Ok(())
            }
            _ => Err(OrchestratorError::InvalidStateTransition {
                from: self.job.state.state_name().to_string(),
                to: "queued (retry)".to_string(),
            }),
        }
    }

    /// Transition: * -> CANCELLED
    pub fn cancel(&mut self, reason: String) -> Result<()> {
        if self.job.state.is_terminal() {
            return Err(OrchestratorError::InvalidStateTransition {
                from: self.job.state.state_name().to_string(),
                to: "cancelled".to_string(),
            });
        }

        let now = Utc::now();
        self.job.state = JobState::Cancelled { cancelled_at: now, reason };
        self.job.updated_at = now;
        Ok(())
    }

    /// Update current stage (for running jobs).
    pub fn update_stage(&mut self, stage: StageId) -> Result<()> {
        match &mut self.job.state {
            JobState::Running { current_stage, .. } => {
                *current_stage = stage;
                self.job.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(OrchestratorError::InvalidStateTransition {
                from: self.job.state.state_name().to_string(),
                to: "update_stage".to_string(),
            }),
        }
    }
}
