//! SQLite Book Repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::DbPool;
use crate::application::ports::{BookRepositoryPort, RepositoryError};
use crate::domain::book::{
    ArtifactLocation, Book, BookId, Chapter, ChapterId, ChapterStatus, OutputStatus,
    ReviewStatus, Title,
};

/// SQLite Book Repository
pub struct SqliteBookRepository {
    pool: DbPool,
}

impl SqliteBookRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn db_err(e: sqlx::Error) -> RepositoryError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Duplicate(db.message().to_string())
        }
        _ => RepositoryError::DatabaseError(e.to_string()),
    }
}

pub(super) fn parse_uuid(s: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(s).map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

pub(super) fn parse_time(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    Ok(DateTime::parse_from_rfc3339(s)
        .map_err(|e| RepositoryError::SerializationError(e.to_string()))?
        .with_timezone(&Utc))
}

fn parse_review(s: &str) -> Result<ReviewStatus, RepositoryError> {
    ReviewStatus::parse(s).map_err(|_| RepositoryError::InvalidStatus(s.to_string()))
}

#[derive(FromRow)]
struct BookRow {
    id: String,
    title: String,
    outline_notes_before: Option<String>,
    outline: Option<String>,
    outline_notes_after: Option<String>,
    outline_review: String,
    declared_chapter_count: Option<i64>,
    final_review_notes: Option<String>,
    final_review: String,
    output_status: String,
    status_reason: Option<String>,
    artifacts: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<BookRow> for Book {
    type Error = RepositoryError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        let artifacts: Vec<ArtifactLocation> = serde_json::from_str(&row.artifacts)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;

        Ok(Book {
            id: BookId::from_uuid(parse_uuid(&row.id)?),
            title: Title::new(row.title)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?,
            outline_notes_before: row.outline_notes_before,
            outline: row.outline,
            outline_notes_after: row.outline_notes_after,
            outline_review: parse_review(&row.outline_review)?,
            declared_chapter_count: row.declared_chapter_count.map(|n| n as u32),
            final_review_notes: row.final_review_notes,
            final_review: parse_review(&row.final_review)?,
            output_status: OutputStatus::from_str(&row.output_status)
                .ok_or_else(|| RepositoryError::InvalidStatus(row.output_status.clone()))?,
            status_reason: row.status_reason,
            artifacts,
            created_at: parse_time(&row.created_at)?,
            updated_at: parse_time(&row.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct ChapterRow {
    id: String,
    book_id: String,
    sequence: i64,
    title: String,
    outline_entry: String,
    content: Option<String>,
    summary: Option<String>,
    notes: Option<String>,
    review: String,
    status: String,
    error_message: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ChapterRow> for Chapter {
    type Error = RepositoryError;

    fn try_from(row: ChapterRow) -> Result<Self, Self::Error> {
        Ok(Chapter {
            id: ChapterId::from_uuid(parse_uuid(&row.id)?),
            book_id: BookId::from_uuid(parse_uuid(&row.book_id)?),
            sequence: row.sequence as u32,
            title: row.title,
            outline_entry: row.outline_entry,
            content: row.content,
            summary: row.summary,
            notes: row.notes,
            review: parse_review(&row.review)?,
            status: ChapterStatus::from_str(&row.status)
                .ok_or_else(|| RepositoryError::InvalidStatus(row.status.clone()))?,
            error_message: row.error_message,
            created_at: parse_time(&row.created_at)?,
            updated_at: parse_time(&row.updated_at)?,
        })
    }
}

const BOOK_COLUMNS: &str = "id, title, outline_notes_before, outline, outline_notes_after, \
    outline_review, declared_chapter_count, final_review_notes, final_review, output_status, \
    status_reason, artifacts, created_at, updated_at";

const CHAPTER_COLUMNS: &str = "id, book_id, sequence, title, outline_entry, content, summary, \
    notes, review, status, error_message, created_at, updated_at";

const UPSERT_CHAPTER: &str = r#"
    INSERT INTO chapters (id, book_id, sequence, title, outline_entry, content, summary,
                          notes, review, status, error_message, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET
        title = excluded.title,
        outline_entry = excluded.outline_entry,
        content = excluded.content,
        summary = excluded.summary,
        notes = excluded.notes,
        review = excluded.review,
        status = excluded.status,
        error_message = excluded.error_message,
        updated_at = excluded.updated_at
"#;

fn bind_chapter<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    chapter: &'q Chapter,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    query
        .bind(chapter.id.to_string())
        .bind(chapter.book_id.to_string())
        .bind(chapter.sequence as i64)
        .bind(&chapter.title)
        .bind(&chapter.outline_entry)
        .bind(chapter.content.as_deref())
        .bind(chapter.summary.as_deref())
        .bind(chapter.notes.as_deref())
        .bind(chapter.review.as_str())
        .bind(chapter.status.as_str())
        .bind(chapter.error_message.as_deref())
        .bind(chapter.created_at.to_rfc3339())
        .bind(chapter.updated_at.to_rfc3339())
}

#[async_trait]
impl BookRepositoryPort for SqliteBookRepository {
    async fn save_book(&self, book: &Book) -> Result<(), RepositoryError> {
        let artifacts = serde_json::to_string(&book.artifacts)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO books (id, title, title_key, outline_notes_before, outline,
                               outline_notes_after, outline_review, declared_chapter_count,
                               final_review_notes, final_review, output_status, status_reason,
                               artifacts, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                title_key = excluded.title_key,
                outline_notes_before = excluded.outline_notes_before,
                outline = excluded.outline,
                outline_notes_after = excluded.outline_notes_after,
                outline_review = excluded.outline_review,
                declared_chapter_count = excluded.declared_chapter_count,
                final_review_notes = excluded.final_review_notes,
                final_review = excluded.final_review,
                output_status = excluded.output_status,
                status_reason = excluded.status_reason,
                artifacts = excluded.artifacts,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(book.id.to_string())
        .bind(book.title.as_str())
        .bind(book.title.normalized())
        .bind(book.outline_notes_before.as_deref())
        .bind(book.outline.as_deref())
        .bind(book.outline_notes_after.as_deref())
        .bind(book.outline_review.as_str())
        .bind(book.declared_chapter_count.map(|n| n as i64))
        .bind(book.final_review_notes.as_deref())
        .bind(book.final_review.as_str())
        .bind(book.output_status.as_str())
        .bind(book.status_reason.as_deref())
        .bind(artifacts)
        .bind(book.created_at.to_rfc3339())
        .bind(book.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn find_book(&self, id: BookId) -> Result<Option<Book>, RepositoryError> {
        let row: Option<BookRow> =
            sqlx::query_as(&format!("SELECT {} FROM books WHERE id = ?", BOOK_COLUMNS))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        row.map(Book::try_from).transpose()
    }

    async fn find_book_by_title(&self, title: &Title) -> Result<Option<Book>, RepositoryError> {
        let row: Option<BookRow> =
            sqlx::query_as(&format!("SELECT {} FROM books WHERE title_key = ?", BOOK_COLUMNS))
                .bind(title.normalized())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        row.map(Book::try_from).transpose()
    }

    async fn list_books(&self) -> Result<Vec<Book>, RepositoryError> {
        let rows: Vec<BookRow> =
            sqlx::query_as(&format!("SELECT {} FROM books ORDER BY created_at ASC", BOOK_COLUMNS))
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;

        rows.into_iter().map(Book::try_from).collect()
    }

    async fn delete_book(&self, id: BookId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("DELETE FROM notifications WHERE book_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        sqlx::query("DELETE FROM chapters WHERE book_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id.to_string()));
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn insert_chapters(&self, chapters: &[Chapter]) -> Result<(), RepositoryError> {
        let Some(first) = chapters.first() else {
            return Ok(());
        };

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chapters WHERE book_id = ?")
            .bind(first.book_id.to_string())
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;

        if existing > 0 {
            return Err(RepositoryError::Duplicate(format!(
                "chapters already exist for book {}",
                first.book_id
            )));
        }

        for chapter in chapters {
            bind_chapter(sqlx::query(UPSERT_CHAPTER), chapter)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;

        tracing::debug!(
            book_id = %first.book_id,
            count = chapters.len(),
            "Chapters inserted"
        );
        Ok(())
    }

    async fn save_chapter(&self, chapter: &Chapter) -> Result<(), RepositoryError> {
        bind_chapter(sqlx::query(UPSERT_CHAPTER), chapter)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_chapter(&self, id: ChapterId) -> Result<Option<Chapter>, RepositoryError> {
        let row: Option<ChapterRow> =
            sqlx::query_as(&format!("SELECT {} FROM chapters WHERE id = ?", CHAPTER_COLUMNS))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        row.map(Chapter::try_from).transpose()
    }

    async fn find_chapters(&self, book_id: BookId) -> Result<Vec<Chapter>, RepositoryError> {
        let rows: Vec<ChapterRow> = sqlx::query_as(&format!(
            "SELECT {} FROM chapters WHERE book_id = ? ORDER BY sequence ASC",
            CHAPTER_COLUMNS
        ))
        .bind(book_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(Chapter::try_from).collect()
    }

    async fn count_chapters(&self, book_id: BookId) -> Result<usize, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chapters WHERE book_id = ?")
            .bind(book_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::sqlite::{create_pool, run_migrations, DatabaseConfig};

    async fn repo() -> SqliteBookRepository {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteBookRepository::new(pool)
    }

    #[tokio::test]
    async fn test_book_round_trip_keeps_state() {
        let repo = repo().await;
        let mut book = Book::new(Title::new("Salt Roads").unwrap(), Some("coastal".into()));
        book.transition(OutputStatus::InProgress, None).unwrap();
        book.set_outline("## Chapter 1: Tide".into());
        book.artifacts = vec![ArtifactLocation::new("md", "/tmp/salt-roads.md")];
        repo.save_book(&book).await.unwrap();

        let stored = repo.find_book(book.id).await.unwrap().unwrap();
        assert_eq!(stored.title, book.title);
        assert_eq!(stored.output_status, OutputStatus::InProgress);
        assert_eq!(stored.outline.as_deref(), Some("## Chapter 1: Tide"));
        assert_eq!(stored.artifacts, book.artifacts);

        let by_title = repo
            .find_book_by_title(&Title::new("SALT ROADS ").unwrap())
            .await
            .unwrap();
        assert_eq!(by_title.map(|b| b.id), Some(book.id));
    }

    #[tokio::test]
    async fn test_duplicate_title_rejected() {
        let repo = repo().await;
        repo.save_book(&Book::new(Title::new("Twin").unwrap(), None))
            .await
            .unwrap();
        let err = repo
            .save_book(&Book::new(Title::new("twin").unwrap(), None))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_chapters_insert_once_and_cascade() {
        let repo = repo().await;
        let book = Book::new(Title::new("Orchard").unwrap(), None);
        repo.save_book(&book).await.unwrap();

        let chapters = vec![
            Chapter::new(book.id, 1, "Seed", "seed entry"),
            Chapter::new(book.id, 2, "Root", "root entry"),
        ];
        repo.insert_chapters(&chapters).await.unwrap();
        assert!(matches!(
            repo.insert_chapters(&[Chapter::new(book.id, 3, "Late", "")]).await,
            Err(RepositoryError::Duplicate(_))
        ));
        assert_eq!(repo.count_chapters(book.id).await.unwrap(), 2);

        let mut first = repo.find_chapter(chapters[0].id).await.unwrap().unwrap();
        first.start_generation().unwrap();
        first
            .mark_generated("text".into(), "summary".into())
            .unwrap();
        repo.save_chapter(&first).await.unwrap();

        let stored = repo.find_chapters(book.id).await.unwrap();
        assert_eq!(stored[0].status, ChapterStatus::Generated);
        assert_eq!(stored[0].summary.as_deref(), Some("summary"));
        assert_eq!(stored[1].sequence, 2);

        repo.delete_book(book.id).await.unwrap();
        assert_eq!(repo.count_chapters(book.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_out_of_domain_review_is_integrity_error() {
        let repo = repo().await;
        let book = Book::new(Title::new("Corrupt").unwrap(), None);
        repo.save_book(&book).await.unwrap();

        sqlx::query("UPDATE books SET outline_review = 'maybe' WHERE id = ?")
            .bind(book.id.to_string())
            .execute(&repo.pool)
            .await
            .unwrap();

        let err = repo.find_book(book.id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidStatus(s) if s == "maybe"));
    }
}
