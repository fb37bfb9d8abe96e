//! Review Command Handlers
//!
//! 评审通过且书籍可继续时，自动重新排队运行。

use std::sync::Arc;

use serde::Serialize;

use crate::application::commands::{ReviewChapter, ReviewFinal, ReviewOutline};
use crate::application::error::ApplicationError;
use crate::application::pipeline::{PipelineOrchestrator, ReviewOutcome};
use crate::application::ports::JobQueuePort;
use crate::domain::book::{BookId, OutputStatus, ReviewStatus};
use crate::domain::Decision;

/// 评审响应
#[derive(Debug, Clone, Serialize)]
pub struct ReviewResponse {
    pub book_id: BookId,
    pub decision: Decision,
    pub status: OutputStatus,
    /// 重新排队的任务
    pub job_id: Option<String>,
}

fn parse_status(raw: &str) -> Result<ReviewStatus, ApplicationError> {
    Ok(ReviewStatus::parse(raw)?)
}

fn submit_if_needed(
    job_queue: &dyn JobQueuePort,
    book_id: BookId,
    outcome: &ReviewOutcome,
    auto_approve: bool,
) -> Result<Option<String>, ApplicationError> {
    if !outcome.should_run {
        return Ok(None);
    }
    Ok(Some(job_queue.submit(book_id, auto_approve)?))
}

// ============================================================================
// ReviewOutline
// ============================================================================

/// ReviewOutline Handler
pub struct ReviewOutlineHandler {
    orchestrator: Arc<PipelineOrchestrator>,
    job_queue: Arc<dyn JobQueuePort>,
    default_auto_approve: bool,
}

impl ReviewOutlineHandler {
    pub fn new(
        orchestrator: Arc<PipelineOrchestrator>,
        job_queue: Arc<dyn JobQueuePort>,
        default_auto_approve: bool,
    ) -> Self {
        Self {
            orchestrator,
            job_queue,
            default_auto_approve,
        }
    }

    pub async fn handle(&self, command: ReviewOutline) -> Result<ReviewResponse, ApplicationError> {
        let status = parse_status(&command.status)?;
        let outcome = self
            .orchestrator
            .apply_outline_review(command.book_id, status, command.notes)
            .await?;
        let job_id = submit_if_needed(
            self.job_queue.as_ref(),
            command.book_id,
            &outcome,
            self.default_auto_approve,
        )?;

        Ok(ReviewResponse {
            book_id: command.book_id,
            decision: outcome.decision,
            status: outcome.status,
            job_id,
        })
    }
}

// ============================================================================
// ReviewChapter
// ============================================================================

/// ReviewChapter Handler
pub struct ReviewChapterHandler {
    orchestrator: Arc<PipelineOrchestrator>,
    job_queue: Arc<dyn JobQueuePort>,
    default_auto_approve: bool,
}

impl ReviewChapterHandler {
    pub fn new(
        orchestrator: Arc<PipelineOrchestrator>,
        job_queue: Arc<dyn JobQueuePort>,
        default_auto_approve: bool,
    ) -> Self {
        Self {
            orchestrator,
            job_queue,
            default_auto_approve,
        }
    }

    pub async fn handle(&self, command: ReviewChapter) -> Result<ReviewResponse, ApplicationError> {
        let status = parse_status(&command.status)?;
        let outcome = self
            .orchestrator
            .apply_chapter_review(command.book_id, command.chapter_id, status, command.notes)
            .await?;
        let job_id = submit_if_needed(
            self.job_queue.as_ref(),
            command.book_id,
            &outcome,
            self.default_auto_approve,
        )?;

        Ok(ReviewResponse {
            book_id: command.book_id,
            decision: outcome.decision,
            status: outcome.status,
            job_id,
        })
    }
}

// ============================================================================
// ReviewFinal
// ============================================================================

/// ReviewFinal Handler - 只记录终审
pub struct ReviewFinalHandler {
    orchestrator: Arc<PipelineOrchestrator>,
}

impl ReviewFinalHandler {
    pub fn new(orchestrator: Arc<PipelineOrchestrator>) -> Self {
        Self { orchestrator }
    }

    pub async fn handle(&self, command: ReviewFinal) -> Result<Decision, ApplicationError> {
        let status = parse_status(&command.status)?;
        self.orchestrator
            .apply_final_review(command.book_id, status, command.notes)
            .await
    }
}
