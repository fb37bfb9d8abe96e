//! Job Queue Port - 流水线任务队列
//!
//! 每个任务代表对一本书调用一次编排器；具体实现在 infrastructure/memory 层

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::book::BookId;

/// 队列错误
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Queue is full")]
    QueueFull,

    #[error("Queue closed")]
    Closed,
}

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Finished,
    Failed,
    /// 书籍正被其他任务处理
    Skipped,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Finished => "finished",
            JobState::Failed => "failed",
            JobState::Skipped => "skipped",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, JobState::Queued | JobState::Running)
    }
}

/// 流水线任务
#[derive(Debug, Clone)]
pub struct PipelineJob {
    pub job_id: String,
    pub book_id: BookId,
    pub auto_approve: bool,
    pub state: JobState,
    /// 编排器返回的结果描述
    pub outcome: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PipelineJob {
    pub fn new(book_id: BookId, auto_approve: bool) -> Self {
        Self {
            job_id: uuid::Uuid::new_v4().to_string(),
            book_id,
            auto_approve,
            state: JobState::Queued,
            outcome: None,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Job Queue Port
pub trait JobQueuePort: Send + Sync {
    /// 提交任务；同一本书已有排队中的任务时返回该任务 ID
    fn submit(&self, book_id: BookId, auto_approve: bool) -> Result<String, QueueError>;

    fn get_job(&self, job_id: &str) -> Option<PipelineJob>;

    fn set_state(&self, job_id: &str, state: JobState) -> Result<(), QueueError>;

    fn set_finished(&self, job_id: &str, outcome: String) -> Result<(), QueueError>;

    fn set_failed(&self, job_id: &str, error: String) -> Result<(), QueueError>;

    /// 书籍最近的任务
    fn latest_for_book(&self, book_id: BookId) -> Option<PipelineJob>;

    /// 删除书籍时清理
    fn forget_book(&self, book_id: BookId);
}
