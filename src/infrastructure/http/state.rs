//! Application State
//!
//! 持有所有 Command/Query Handlers 的应用状态

use std::sync::Arc;

use crate::application::{
    // Command handlers
    CompileBookHandler, CreateBookHandler, DeleteBookHandler, ImportBooksHandler,
    ResumeBookHandler, ReviewChapterHandler, ReviewFinalHandler, ReviewOutlineHandler,
    RunBookHandler,
    // Query handlers
    GetBookHandler, GetProgressHandler, ListBooksHandler, ListNotificationsHandler,
    // Ports
    BookRepositoryPort, JobQueuePort, NotificationLogPort, PipelineOrchestrator,
};
use crate::infrastructure::events::EventPublisher;

/// 应用状态
pub struct AppState {
    // ========== Ports ==========
    pub book_repo: Arc<dyn BookRepositoryPort>,
    pub job_queue: Arc<dyn JobQueuePort>,
    pub orchestrator: Arc<PipelineOrchestrator>,
    pub event_publisher: Arc<EventPublisher>,

    // ========== Command Handlers ==========
    pub create_book_handler: CreateBookHandler,
    pub import_books_handler: ImportBooksHandler,
    pub delete_book_handler: DeleteBookHandler,
    pub run_book_handler: RunBookHandler,
    pub resume_book_handler: ResumeBookHandler,
    pub compile_book_handler: CompileBookHandler,
    pub review_outline_handler: ReviewOutlineHandler,
    pub review_chapter_handler: ReviewChapterHandler,
    pub review_final_handler: ReviewFinalHandler,

    // ========== Query Handlers ==========
    pub get_book_handler: GetBookHandler,
    pub list_books_handler: ListBooksHandler,
    pub get_progress_handler: GetProgressHandler,
    pub list_notifications_handler: ListNotificationsHandler,
}

impl AppState {
    /// 创建应用状态
    ///
    /// `auto_approve` 是 run / resume / review 请求未指定时的默认值
    pub fn new(
        book_repo: Arc<dyn BookRepositoryPort>,
        notification_log: Arc<dyn NotificationLogPort>,
        job_queue: Arc<dyn JobQueuePort>,
        orchestrator: Arc<PipelineOrchestrator>,
        event_publisher: Arc<EventPublisher>,
        auto_approve: bool,
    ) -> Self {
        Self {
            // Command handlers
            create_book_handler: CreateBookHandler::new(book_repo.clone()),
            import_books_handler: ImportBooksHandler::new(book_repo.clone()),
            delete_book_handler: DeleteBookHandler::new(
                book_repo.clone(),
                orchestrator.clone(),
                job_queue.clone(),
            ),
            run_book_handler: RunBookHandler::new(
                book_repo.clone(),
                job_queue.clone(),
                auto_approve,
            ),
            resume_book_handler: ResumeBookHandler::new(
                orchestrator.clone(),
                job_queue.clone(),
                auto_approve,
            ),
            compile_book_handler: CompileBookHandler::new(orchestrator.clone()),
            review_outline_handler: ReviewOutlineHandler::new(
                orchestrator.clone(),
                job_queue.clone(),
                auto_approve,
            ),
            review_chapter_handler: ReviewChapterHandler::new(
                orchestrator.clone(),
                job_queue.clone(),
                auto_approve,
            ),
            review_final_handler: ReviewFinalHandler::new(orchestrator.clone()),

            // Query handlers
            get_book_handler: GetBookHandler::new(book_repo.clone()),
            list_books_handler: ListBooksHandler::new(book_repo.clone()),
            get_progress_handler: GetProgressHandler::new(book_repo.clone()),
            list_notifications_handler: ListNotificationsHandler::new(
                book_repo.clone(),
                notification_log,
            ),

            // Ports
            book_repo,
            job_queue,
            orchestrator,
            event_publisher,
        }
    }
}
