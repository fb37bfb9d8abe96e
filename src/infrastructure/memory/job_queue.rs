//! In-Memory Job Queue Implementation

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::application::ports::{JobQueuePort, JobState, PipelineJob, QueueError};
use crate::domain::book::BookId;

/// 内存任务队列
pub struct InMemoryJobQueue {
    /// job_id -> PipelineJob
    jobs: DashMap<String, PipelineJob>,
    /// book_id -> 该书保留的 job_id，最后一个为最近的任务
    book_jobs: DashMap<BookId, Vec<String>>,
    /// 任务队列发送端
    queue_sender: mpsc::Sender<String>,
}

impl InMemoryJobQueue {
    pub fn new(queue_sender: mpsc::Sender<String>) -> Self {
        Self {
            jobs: DashMap::new(),
            book_jobs: DashMap::new(),
            queue_sender,
        }
    }

    fn update<F>(&self, job_id: &str, f: F) -> Result<(), QueueError>
    where
        F: FnOnce(&mut PipelineJob),
    {
        let mut job = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| QueueError::NotFound(job_id.to_string()))?;
        let old_state = job.state;
        f(&mut job);

        if !job.state.is_active() && job.completed_at.is_none() {
            job.completed_at = Some(Utc::now());
        }

        tracing::debug!(
            job_id = %job_id,
            old_state = old_state.as_str(),
            new_state = job.state.as_str(),
            "Job state changed"
        );
        Ok(())
    }
}

impl JobQueuePort for InMemoryJobQueue {
    fn submit(&self, book_id: BookId, auto_approve: bool) -> Result<String, QueueError> {
        // 排队中的任务会读取最新状态，直接复用
        if let Some(existing) = self.latest_for_book(book_id) {
            if existing.state == JobState::Queued {
                tracing::debug!(
                    book_id = %book_id,
                    job_id = %existing.job_id,
                    "Book already has a queued job"
                );
                return Ok(existing.job_id);
            }
        }

        let job = PipelineJob::new(book_id, auto_approve);
        let job_id = job.job_id.clone();

        // 先登记再入队，worker 取到的任务一定能查到
        self.jobs.insert(job_id.clone(), job);
        let pruned = {
            let mut ids = self.book_jobs.entry(book_id).or_default();
            let (keep, finished): (Vec<String>, Vec<String>) = ids
                .drain(..)
                .partition(|id| self.jobs.get(id).map_or(false, |j| j.state.is_active()));
            *ids = keep;
            ids.push(job_id.clone());
            finished
        };
        for id in &pruned {
            self.jobs.remove(id);
        }

        if let Err(e) = self.queue_sender.try_send(job_id.clone()) {
            self.jobs.remove(&job_id);
            if let Some(mut ids) = self.book_jobs.get_mut(&book_id) {
                ids.retain(|id| id != &job_id);
            }
            return Err(match e {
                TrySendError::Full(_) => QueueError::QueueFull,
                TrySendError::Closed(_) => QueueError::Closed,
            });
        }

        tracing::debug!(
            book_id = %book_id,
            job_id = %job_id,
            pruned = pruned.len(),
            "Job submitted"
        );
        Ok(job_id)
    }

    fn get_job(&self, job_id: &str) -> Option<PipelineJob> {
        self.jobs.get(job_id).map(|j| j.clone())
    }

    fn set_state(&self, job_id: &str, state: JobState) -> Result<(), QueueError> {
        self.update(job_id, |job| job.state = state)
    }

    fn set_finished(&self, job_id: &str, outcome: String) -> Result<(), QueueError> {
        self.update(job_id, |job| {
            job.state = JobState::Finished;
            job.outcome = Some(outcome);
        })
    }

    fn set_failed(&self, job_id: &str, error: String) -> Result<(), QueueError> {
        self.update(job_id, |job| {
            job.state = JobState::Failed;
            job.error_message = Some(error);
        })
    }

    fn latest_for_book(&self, book_id: BookId) -> Option<PipelineJob> {
        let job_id = self.book_jobs.get(&book_id)?.last()?.clone();
        self.get_job(&job_id)
    }

    fn forget_book(&self, book_id: BookId) {
        if let Some((_, job_ids)) = self.book_jobs.remove(&book_id) {
            for job_id in &job_ids {
                self.jobs.remove(job_id);
            }
            tracing::debug!(book_id = %book_id, jobs = job_ids.len(), "Book jobs cleaned up");
        }
    }
}
