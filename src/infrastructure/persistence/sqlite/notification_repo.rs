//! SQLite Notification Log

use async_trait::async_trait;
use sqlx::FromRow;

use super::book_repo::{parse_time, parse_uuid};
use super::DbPool;
use crate::application::ports::{
    DeliveryStatus, NotificationLogPort, NotificationRecord, RepositoryError,
};
use crate::domain::book::{BookId, ChapterId};
use crate::domain::EventType;

/// SQLite 通知投递日志
pub struct SqliteNotificationLog {
    pool: DbPool,
}

impl SqliteNotificationLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct NotificationRow {
    id: String,
    book_id: String,
    chapter_id: Option<String>,
    event_type: String,
    message: String,
    status: String,
    error_message: Option<String>,
    created_at: String,
}

impl TryFrom<NotificationRow> for NotificationRecord {
    type Error = RepositoryError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(NotificationRecord {
            id: parse_uuid(&row.id)?,
            book_id: BookId::from_uuid(parse_uuid(&row.book_id)?),
            chapter_id: row
                .chapter_id
                .as_deref()
                .map(parse_uuid)
                .transpose()?
                .map(ChapterId::from_uuid),
            event_type: EventType::from_str(&row.event_type)
                .ok_or_else(|| RepositoryError::InvalidStatus(row.event_type.clone()))?,
            message: row.message,
            status: DeliveryStatus::from_str(&row.status)
                .ok_or_else(|| RepositoryError::InvalidStatus(row.status.clone()))?,
            error_message: row.error_message,
            created_at: parse_time(&row.created_at)?,
        })
    }
}

#[async_trait]
impl NotificationLogPort for SqliteNotificationLog {
    async fn record(&self, record: &NotificationRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, book_id, chapter_id, event_type, message, status,
                                       error_message, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.book_id.to_string())
        .bind(record.chapter_id.map(|id| id.to_string()))
        .bind(record.event_type.as_str())
        .bind(&record.message)
        .bind(record.status.as_str())
        .bind(record.error_message.as_deref())
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_by_book(
        &self,
        book_id: BookId,
    ) -> Result<Vec<NotificationRecord>, RepositoryError> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            r#"
            SELECT id, book_id, chapter_id, event_type, message, status, error_message, created_at
            FROM notifications WHERE book_id = ? ORDER BY created_at ASC
            "#,
        )
        .bind(book_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(NotificationRecord::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{BookRepositoryPort, DeliveryResult};
    use crate::domain::book::{Book, Title};
    use crate::domain::NotificationEvent;
    use crate::infrastructure::persistence::sqlite::{
        create_pool, run_migrations, DatabaseConfig, SqliteBookRepository,
    };

    #[tokio::test]
    async fn test_record_and_list() {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let books = SqliteBookRepository::new(pool.clone());
        let log = SqliteNotificationLog::new(pool);

        let book = Book::new(Title::new("Lantern").unwrap(), None);
        books.save_book(&book).await.unwrap();

        let ready = NotificationEvent::new(book.id, EventType::OutlineReady, "outline ready");
        log.record(&NotificationRecord::from_event(&ready, &DeliveryResult::sent()))
            .await
            .unwrap();

        let chapter_id = ChapterId::new();
        let failed = NotificationEvent::for_chapter(
            book.id,
            chapter_id,
            EventType::ErrorPause,
            "chapter 1 failed",
        );
        log.record(&NotificationRecord::from_event(
            &failed,
            &DeliveryResult::failed("webhook returned 502"),
        ))
        .await
        .unwrap();

        let records = log.find_by_book(book.id).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].event_type, EventType::OutlineReady);
        assert_eq!(records[1].chapter_id, Some(chapter_id));
        assert_eq!(records[1].status, DeliveryStatus::Failed);
        assert_eq!(records[1].error_message.as_deref(), Some("webhook returned 502"));
    }
}
