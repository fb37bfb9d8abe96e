//! Book Command Handlers

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::application::commands::{
    CompileBook, CreateBook, DeleteBook, ImportBooks, ResumeBook, RunBook,
};
use crate::application::error::ApplicationError;
use crate::application::pipeline::{CompileOutcome, PipelineOrchestrator};
use crate::application::ports::{BookRepositoryPort, JobQueuePort};
use crate::domain::book::{Book, BookId, OutputStatus, Title};

// ============================================================================
// CreateBook
// ============================================================================

/// 创建书籍响应
#[derive(Debug, Clone, Serialize)]
pub struct BookCreated {
    pub id: BookId,
    pub title: String,
}

/// CreateBook Handler
pub struct CreateBookHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
}

impl CreateBookHandler {
    pub fn new(book_repo: Arc<dyn BookRepositoryPort>) -> Self {
        Self { book_repo }
    }

    pub async fn handle(&self, command: CreateBook) -> Result<BookCreated, ApplicationError> {
        let title = Title::new(command.title)?;

        if self.book_repo.find_book_by_title(&title).await?.is_some() {
            return Err(ApplicationError::validation(format!(
                "book already exists: {}",
                title
            )));
        }

        let book = Book::new(title, command.notes);
        self.book_repo.save_book(&book).await?;

        tracing::info!(book_id = %book.id, title = %book.title, "Book created");

        Ok(BookCreated {
            id: book.id,
            title: book.title.to_string(),
        })
    }
}

// ============================================================================
// ImportBooks
// ============================================================================

/// 批量导入报告
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub created: Vec<BookCreated>,
    /// 已存在的标题
    pub skipped: Vec<String>,
    /// 无效的行（空标题等）
    pub invalid: Vec<String>,
}

/// ImportBooks Handler
pub struct ImportBooksHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
}

impl ImportBooksHandler {
    pub fn new(book_repo: Arc<dyn BookRepositoryPort>) -> Self {
        Self { book_repo }
    }

    pub async fn handle(&self, command: ImportBooks) -> Result<ImportReport, ApplicationError> {
        let mut report = ImportReport::default();
        let mut seen: HashSet<String> = HashSet::new();

        for (index, row) in command.rows.into_iter().enumerate() {
            let title = match Title::new(row.title) {
                Ok(title) => title,
                Err(e) => {
                    report.invalid.push(format!("row {}: {}", index + 1, e));
                    continue;
                }
            };

            if !seen.insert(title.normalized())
                || self.book_repo.find_book_by_title(&title).await?.is_some()
            {
                report.skipped.push(title.to_string());
                continue;
            }

            let book = Book::new(title, row.notes);
            self.book_repo.save_book(&book).await?;
            report.created.push(BookCreated {
                id: book.id,
                title: book.title.to_string(),
            });
        }

        tracing::info!(
            created = report.created.len(),
            skipped = report.skipped.len(),
            invalid = report.invalid.len(),
            "Books imported"
        );
        Ok(report)
    }
}

// ============================================================================
// DeleteBook
// ============================================================================

/// DeleteBook Handler
pub struct DeleteBookHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
    orchestrator: Arc<PipelineOrchestrator>,
    job_queue: Arc<dyn JobQueuePort>,
}

impl DeleteBookHandler {
    pub fn new(
        book_repo: Arc<dyn BookRepositoryPort>,
        orchestrator: Arc<PipelineOrchestrator>,
        job_queue: Arc<dyn JobQueuePort>,
    ) -> Self {
        Self {
            book_repo,
            orchestrator,
            job_queue,
        }
    }

    pub async fn handle(&self, command: DeleteBook) -> Result<(), ApplicationError> {
        let book_id = command.book_id;
        let locks = self.orchestrator.locks();
        if locks.is_running(book_id) {
            return Err(ApplicationError::Busy(format!(
                "book {} is being processed",
                book_id
            )));
        }
        let guard = locks.write(book_id).await;

        let book = self
            .book_repo
            .find_book(book_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Book", *book_id.as_uuid()))?;

        self.book_repo.delete_book(book_id).await?;
        self.job_queue.forget_book(book_id);
        drop(guard);
        locks.remove(book_id);

        tracing::info!(book_id = %book_id, title = %book.title, "Book deleted");
        Ok(())
    }
}

// ============================================================================
// RunBook
// ============================================================================

/// 提交运行响应
#[derive(Debug, Clone, Serialize)]
pub struct RunSubmitted {
    pub book_id: BookId,
    pub job_id: String,
    pub auto_approve: bool,
}

/// RunBook Handler - 把书籍交给后台 worker
pub struct RunBookHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
    job_queue: Arc<dyn JobQueuePort>,
    default_auto_approve: bool,
}

impl RunBookHandler {
    pub fn new(
        book_repo: Arc<dyn BookRepositoryPort>,
        job_queue: Arc<dyn JobQueuePort>,
        default_auto_approve: bool,
    ) -> Self {
        Self {
            book_repo,
            job_queue,
            default_auto_approve,
        }
    }

    pub async fn handle(&self, command: RunBook) -> Result<RunSubmitted, ApplicationError> {
        let book = self
            .book_repo
            .find_book(command.book_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Book", *command.book_id.as_uuid()))?;

        match book.output_status {
            OutputStatus::Completed => {
                return Err(ApplicationError::invalid_state("book is already completed"));
            }
            status if status.blocks_generation() => {
                return Err(ApplicationError::invalid_state(format!(
                    "book is {} ({}); resume it first",
                    status,
                    book.status_reason.as_deref().unwrap_or("no reason recorded")
                )));
            }
            _ => {}
        }

        let auto_approve = command.auto_approve.unwrap_or(self.default_auto_approve);
        let job_id = self.job_queue.submit(book.id, auto_approve)?;

        tracing::info!(
            book_id = %book.id,
            job_id = %job_id,
            auto_approve = auto_approve,
            "Book run submitted"
        );

        Ok(RunSubmitted {
            book_id: book.id,
            job_id,
            auto_approve,
        })
    }
}

// ============================================================================
// ResumeBook
// ============================================================================

/// 恢复响应
#[derive(Debug, Clone, Serialize)]
pub struct ResumeResponse {
    pub book_id: BookId,
    pub status: OutputStatus,
    pub reset_chapters: usize,
    pub job_id: Option<String>,
}

/// ResumeBook Handler
pub struct ResumeBookHandler {
    orchestrator: Arc<PipelineOrchestrator>,
    job_queue: Arc<dyn JobQueuePort>,
    default_auto_approve: bool,
}

impl ResumeBookHandler {
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

    pub async fn handle(&self, command: ResumeBook) -> Result<ResumeResponse, ApplicationError> {
        let outcome = self.orchestrator.resume(command.book_id).await?;

        let job_id = if outcome.status.blocks_generation() {
            None
        } else {
            let auto_approve = command.auto_approve.unwrap_or(self.default_auto_approve);
            Some(self.job_queue.submit(command.book_id, auto_approve)?)
        };

        Ok(ResumeResponse {
            book_id: command.book_id,
            status: outcome.status,
            reset_chapters: outcome.reset_chapters,
            job_id,
        })
    }
}

// ============================================================================
// CompileBook
// ============================================================================

/// CompileBook Handler
pub struct CompileBookHandler {
    orchestrator: Arc<PipelineOrchestrator>,
}

impl CompileBookHandler {
    pub fn new(orchestrator: Arc<PipelineOrchestrator>) -> Self {
        Self { orchestrator }
    }

    pub async fn handle(&self, command: CompileBook) -> Result<CompileOutcome, ApplicationError> {
        self.orchestrator.compile(command.book_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::ImportRow;
    use crate::infrastructure::memory::InMemoryBookRepository;

    #[tokio::test]
    async fn test_create_rejects_blank_and_duplicate_titles() {
        let repo = Arc::new(InMemoryBookRepository::new());
        let handler = CreateBookHandler::new(repo.clone());

        let created = handler
            .handle(CreateBook {
                title: "Night Ferry".into(),
                notes: None,
            })
            .await
            .unwrap();
        assert_eq!(created.title, "Night Ferry");

        let dup = handler
            .handle(CreateBook {
                title: "  night ferry ".into(),
                notes: None,
            })
            .await;
        assert!(matches!(dup, Err(ApplicationError::ValidationError(_))));

        let blank = handler
            .handle(CreateBook {
                title: "   ".into(),
                notes: None,
            })
            .await;
        assert!(matches!(blank, Err(ApplicationError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_import_skips_existing_titles() {
        let repo = Arc::new(InMemoryBookRepository::new());
        CreateBookHandler::new(repo.clone())
            .handle(CreateBook {
                title: "Existing".into(),
                notes: None,
            })
            .await
            .unwrap();

        let row = |title: &str| ImportRow {
            title: title.to_string(),
            notes: Some("notes".into()),
        };
        let report = ImportBooksHandler::new(repo.clone())
            .handle(ImportBooks {
                rows: vec![row("EXISTING"), row("Fresh"), row(""), row("fresh ")],
            })
            .await
            .unwrap();

        assert_eq!(report.created.len(), 1);
        assert_eq!(report.created[0].title, "Fresh");
        assert_eq!(report.skipped, vec!["EXISTING".to_string(), "fresh".to_string()]);
        assert_eq!(report.invalid.len(), 1);
        assert_eq!(repo.list_books().await.unwrap().len(), 2);
    }
}
