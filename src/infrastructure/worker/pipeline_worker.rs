//! Pipeline Worker - Background Book Runner

use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

use crate::application::error::ApplicationError;
use crate::application::pipeline::{PipelineOrchestrator, RunOptions};
use crate::application::ports::{JobQueuePort, JobState};

/// Worker 配置
#[derive(Debug, Clone)]
pub struct PipelineWorkerConfig {
    /// 同时处理的书籍数
    pub max_concurrent_books: usize,
}

impl Default for PipelineWorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_books: 2,
        }
    }
}

/// 流水线 Worker
///
/// 从队列消费任务，每个任务对一本书调用一次编排器。
/// 同一本书的互斥由编排器的书锁保证，这里只限制总并发。
pub struct PipelineWorker {
    config: PipelineWorkerConfig,
    queue_receiver: mpsc::Receiver<String>,
    job_queue: Arc<dyn JobQueuePort>,
    orchestrator: Arc<PipelineOrchestrator>,
}

impl PipelineWorker {
    pub fn new(
        config: PipelineWorkerConfig,
        queue_receiver: mpsc::Receiver<String>,
        job_queue: Arc<dyn JobQueuePort>,
        orchestrator: Arc<PipelineOrchestrator>,
    ) -> Self {
        Self {
            config,
            queue_receiver,
            job_queue,
            orchestrator,
        }
    }

    /// 启动 Worker，队列关闭后返回
    pub async fn run(mut self) {
        tracing::info!(
            max_concurrent_books = self.config.max_concurrent_books,
            "PipelineWorker started"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_books.max(1)));

        while let Some(job_id) = self.queue_receiver.recv().await {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::error!("Failed to acquire semaphore permit");
                    break;
                }
            };

            let job_queue = self.job_queue.clone();
            let orchestrator = self.orchestrator.clone();

            tokio::spawn(async move {
                let _permit = permit;
                Self::process_job(&job_id, job_queue, orchestrator).await;
            });
        }

        tracing::info!("PipelineWorker stopped");
    }

    /// 处理单个任务
    pub(crate) async fn process_job(
        job_id: &str,
        job_queue: Arc<dyn JobQueuePort>,
        orchestrator: Arc<PipelineOrchestrator>,
    ) {
        let job = match job_queue.get_job(job_id) {
            Some(job) => job,
            None => {
                tracing::warn!(job_id = %job_id, "Job not found, skipping");
                return;
            }
        };

        if let Err(e) = job_queue.set_state(job_id, JobState::Running) {
            tracing::error!(job_id = %job_id, error = %e, "Failed to update job state");
            return;
        }

        let options = RunOptions {
            auto_approve: job.auto_approve,
        };

        let result = orchestrator.run(job.book_id, options).await;
        let update = match result {
            Ok(outcome) => {
                tracing::info!(
                    job_id = %job_id,
                    book_id = %job.book_id,
                    outcome = outcome.as_str(),
                    "Pipeline run finished"
                );
                job_queue.set_finished(job_id, outcome.as_str().to_string())
            }
            Err(ApplicationError::Busy(reason)) => {
                tracing::debug!(
                    job_id = %job_id,
                    book_id = %job.book_id,
                    reason = %reason,
                    "Book is being processed elsewhere, skipping"
                );
                job_queue.set_state(job_id, JobState::Skipped)
            }
            Err(e) => {
                tracing::error!(
                    job_id = %job_id,
                    book_id = %job.book_id,
                    error = %e,
                    "Pipeline run failed"
                );
                job_queue.set_failed(job_id, e.to_string())
            }
        };

        if let Err(e) = update {
            tracing::warn!(job_id = %job_id, error = %e, "Failed to record job result");
        }
    }
}
