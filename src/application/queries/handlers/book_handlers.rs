//! Book Query Handlers

use std::sync::Arc;

use serde::Serialize;

use crate::application::error::ApplicationError;
use crate::application::ports::{BookRepositoryPort, NotificationLogPort, NotificationRecord};
use crate::application::queries::{GetBook, GetProgress, ListBooks, ListNotifications};
use crate::domain::book::{
    ArtifactLocation, Book, BookId, Chapter, ChapterId, ChapterStatus, OutputStatus, ReviewStatus,
};

// ============================================================================
// Response DTOs
// ============================================================================

/// 书籍摘要（列表用）
#[derive(Debug, Clone, Serialize)]
pub struct BookSummaryResponse {
    pub id: BookId,
    pub title: String,
    pub output_status: OutputStatus,
    pub status_reason: Option<String>,
    pub outline_review: ReviewStatus,
    pub created_at: String,
}

impl From<&Book> for BookSummaryResponse {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.to_string(),
            output_status: book.output_status,
            status_reason: book.status_reason.clone(),
            outline_review: book.outline_review,
            created_at: book.created_at.to_rfc3339(),
        }
    }
}

/// 章节详情
#[derive(Debug, Clone, Serialize)]
pub struct ChapterResponse {
    pub id: ChapterId,
    pub sequence: u32,
    pub title: String,
    pub outline_entry: String,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub notes: Option<String>,
    pub review: ReviewStatus,
    pub status: ChapterStatus,
    pub error_message: Option<String>,
}

impl From<Chapter> for ChapterResponse {
    fn from(chapter: Chapter) -> Self {
        Self {
            id: chapter.id,
            sequence: chapter.sequence,
            title: chapter.title,
            outline_entry: chapter.outline_entry,
            content: chapter.content,
            summary: chapter.summary,
            notes: chapter.notes,
            review: chapter.review,
            status: chapter.status,
            error_message: chapter.error_message,
        }
    }
}

/// 书籍详情
#[derive(Debug, Clone, Serialize)]
pub struct BookResponse {
    pub id: BookId,
    pub title: String,
    pub outline_notes_before: Option<String>,
    pub outline: Option<String>,
    pub outline_notes_after: Option<String>,
    pub outline_review: ReviewStatus,
    pub declared_chapter_count: Option<u32>,
    pub final_review: ReviewStatus,
    pub final_review_notes: Option<String>,
    pub output_status: OutputStatus,
    pub status_reason: Option<String>,
    pub artifacts: Vec<ArtifactLocation>,
    pub chapters: Vec<ChapterResponse>,
    pub created_at: String,
    pub updated_at: String,
}

impl BookResponse {
    fn new(book: Book, chapters: Vec<Chapter>) -> Self {
        Self {
            id: book.id,
            title: book.title.to_string(),
            outline_notes_before: book.outline_notes_before,
            outline: book.outline,
            outline_notes_after: book.outline_notes_after,
            outline_review: book.outline_review,
            declared_chapter_count: book.declared_chapter_count,
            final_review: book.final_review,
            final_review_notes: book.final_review_notes,
            output_status: book.output_status,
            status_reason: book.status_reason,
            artifacts: book.artifacts,
            chapters: chapters.into_iter().map(ChapterResponse::from).collect(),
            created_at: book.created_at.to_rfc3339(),
            updated_at: book.updated_at.to_rfc3339(),
        }
    }
}

/// 章节进度行
#[derive(Debug, Clone, Serialize)]
pub struct ChapterProgress {
    pub id: ChapterId,
    pub sequence: u32,
    pub title: String,
    pub status: ChapterStatus,
    pub review: ReviewStatus,
}

/// 书籍进度
#[derive(Debug, Clone, Serialize)]
pub struct ProgressResponse {
    pub book_id: BookId,
    pub title: String,
    pub output_status: OutputStatus,
    pub status_reason: Option<String>,
    pub outline_review: ReviewStatus,
    pub total: usize,
    pub generated: usize,
    pub approved: usize,
    pub awaiting_review: usize,
    pub pending: usize,
    pub errored: usize,
    pub chapters: Vec<ChapterProgress>,
}

impl ProgressResponse {
    fn new(book: &Book, chapters: &[Chapter]) -> Self {
        let count = |f: fn(&Chapter) -> bool| chapters.iter().filter(|c| f(c)).count();
        Self {
            book_id: book.id,
            title: book.title.to_string(),
            output_status: book.output_status,
            status_reason: book.status_reason.clone(),
            outline_review: book.outline_review,
            total: chapters.len(),
            generated: count(|c| c.status.is_generated()),
            approved: count(|c| c.is_approved()),
            awaiting_review: count(|c| c.is_awaiting_review()),
            pending: count(|c| c.status == ChapterStatus::Pending),
            errored: count(|c| c.status == ChapterStatus::Error),
            chapters: chapters
                .iter()
                .map(|c| ChapterProgress {
                    id: c.id,
                    sequence: c.sequence,
                    title: c.title.clone(),
                    status: c.status,
                    review: c.review,
                })
                .collect(),
        }
    }
}

/// 通知日志
#[derive(Debug, Clone, Serialize)]
pub struct NotificationResponse {
    pub id: String,
    pub chapter_id: Option<ChapterId>,
    pub event_type: String,
    pub message: String,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: String,
}

impl From<NotificationRecord> for NotificationResponse {
    fn from(record: NotificationRecord) -> Self {
        Self {
            id: record.id.to_string(),
            chapter_id: record.chapter_id,
            event_type: record.event_type.as_str().to_string(),
            message: record.message,
            status: record.status.as_str().to_string(),
            error_message: record.error_message,
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn load_book(
    repo: &dyn BookRepositoryPort,
    book_id: BookId,
) -> Result<Book, ApplicationError> {
    repo.find_book(book_id)
        .await?
        .ok_or_else(|| ApplicationError::not_found("Book", *book_id.as_uuid()))
}

/// GetBook Handler
pub struct GetBookHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
}

impl GetBookHandler {
    pub fn new(book_repo: Arc<dyn BookRepositoryPort>) -> Self {
        Self { book_repo }
    }

    pub async fn handle(&self, query: GetBook) -> Result<BookResponse, ApplicationError> {
        let book = load_book(self.book_repo.as_ref(), query.book_id).await?;
        let chapters = self.book_repo.find_chapters(query.book_id).await?;
        Ok(BookResponse::new(book, chapters))
    }
}

/// ListBooks Handler
pub struct ListBooksHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
}

impl ListBooksHandler {
    pub fn new(book_repo: Arc<dyn BookRepositoryPort>) -> Self {
        Self { book_repo }
    }

    pub async fn handle(&self, _query: ListBooks) -> Result<Vec<BookSummaryResponse>, ApplicationError> {
        let books = self.book_repo.list_books().await?;
        Ok(books.iter().map(BookSummaryResponse::from).collect())
    }
}

/// GetProgress Handler
pub struct GetProgressHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
}

impl GetProgressHandler {
    pub fn new(book_repo: Arc<dyn BookRepositoryPort>) -> Self {
        Self { book_repo }
    }

    pub async fn handle(&self, query: GetProgress) -> Result<ProgressResponse, ApplicationError> {
        let book = load_book(self.book_repo.as_ref(), query.book_id).await?;
        let chapters = self.book_repo.find_chapters(query.book_id).await?;
        Ok(ProgressResponse::new(&book, &chapters))
    }
}

/// ListNotifications Handler
pub struct ListNotificationsHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
    notification_log: Arc<dyn NotificationLogPort>,
}

impl ListNotificationsHandler {
    pub fn new(
        book_repo: Arc<dyn BookRepositoryPort>,
        notification_log: Arc<dyn NotificationLogPort>,
    ) -> Self {
        Self {
            book_repo,
            notification_log,
        }
    }

    pub async fn handle(
        &self,
        query: ListNotifications,
    ) -> Result<Vec<NotificationResponse>, ApplicationError> {
        load_book(self.book_repo.as_ref(), query.book_id).await?;
        let records = self.notification_log.find_by_book(query.book_id).await?;
        Ok(records.into_iter().map(NotificationResponse::from).collect())
    }
}
