//! In-Memory Book Repository
//!
//! 用于测试与 fake 模式；语义与 SQLite 实现保持一致

use async_trait::async_trait;
use dashmap::DashMap;

use crate::application::ports::{BookRepositoryPort, NotificationLogPort, NotificationRecord, RepositoryError};
use crate::domain::book::{Book, BookId, Chapter, ChapterId, Title};

/// 内存书籍仓库
#[derive(Default)]
pub struct InMemoryBookRepository {
    books: DashMap<BookId, Book>,
    chapters: DashMap<ChapterId, Chapter>,
}

impl InMemoryBookRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookRepositoryPort for InMemoryBookRepository {
    async fn save_book(&self, book: &Book) -> Result<(), RepositoryError> {
        self.books.insert(book.id, book.clone());
        Ok(())
    }

    async fn find_book(&self, id: BookId) -> Result<Option<Book>, RepositoryError> {
        Ok(self.books.get(&id).map(|b| b.clone()))
    }

    async fn find_book_by_title(&self, title: &Title) -> Result<Option<Book>, RepositoryError> {
        let wanted = title.normalized();
        Ok(self
            .books
            .iter()
            .find(|b| b.title.normalized() == wanted)
            .map(|b| b.clone()))
    }

    async fn list_books(&self) -> Result<Vec<Book>, RepositoryError> {
        let mut books: Vec<Book> = self.books.iter().map(|b| b.clone()).collect();
        books.sort_by_key(|b| b.created_at);
        Ok(books)
    }

    async fn delete_book(&self, id: BookId) -> Result<(), RepositoryError> {
        if self.books.remove(&id).is_none() {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        self.chapters.retain(|_, c| c.book_id != id);
        Ok(())
    }

    async fn insert_chapters(&self, chapters: &[Chapter]) -> Result<(), RepositoryError> {
        for chapter in chapters {
            if self.chapters.iter().any(|c| c.book_id == chapter.book_id) {
                return Err(RepositoryError::Duplicate(format!(
                    "chapters already exist for book {}",
                    chapter.book_id
                )));
            }
        }
        for chapter in chapters {
            self.chapters.insert(chapter.id, chapter.clone());
        }
        Ok(())
    }

    async fn save_chapter(&self, chapter: &Chapter) -> Result<(), RepositoryError> {
        self.chapters.insert(chapter.id, chapter.clone());
        Ok(())
    }

    async fn find_chapter(&self, id: ChapterId) -> Result<Option<Chapter>, RepositoryError> {
        Ok(self.chapters.get(&id).map(|c| c.clone()))
    }

    async fn find_chapters(&self, book_id: BookId) -> Result<Vec<Chapter>, RepositoryError> {
        let mut chapters: Vec<Chapter> = self
            .chapters
            .iter()
            .filter(|c| c.book_id == book_id)
            .map(|c| c.clone())
            .collect();
        chapters.sort_by_key(|c| c.sequence);
        Ok(chapters)
    }
}

/// 内存通知日志
#[derive(Default)]
pub struct InMemoryNotificationLog {
    records: DashMap<BookId, Vec<NotificationRecord>>,
}

impl InMemoryNotificationLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationLogPort for InMemoryNotificationLog {
    async fn record(&self, record: &NotificationRecord) -> Result<(), RepositoryError> {
        self.records
            .entry(record.book_id)
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn find_by_book(
        &self,
        book_id: BookId,
    ) -> Result<Vec<NotificationRecord>, RepositoryError> {
        Ok(self
            .records
            .get(&book_id)
            .map(|r| r.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_chapters_rejects_second_batch() {
        let repo = InMemoryBookRepository::new();
        let book = Book::new(Title::new("Glass Harbor").unwrap(), None);
        repo.save_book(&book).await.unwrap();

        let first = vec![
            Chapter::new(book.id, 2, "Two", ""),
            Chapter::new(book.id, 1, "One", ""),
        ];
        repo.insert_chapters(&first).await.unwrap();

        let second = vec![Chapter::new(book.id, 1, "Again", "")];
        let err = repo.insert_chapters(&second).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Duplicate(_)));

        let stored = repo.find_chapters(book.id).await.unwrap();
        assert_eq!(
            stored.iter().map(|c| c.sequence).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[tokio::test]
    async fn test_delete_cascades_to_chapters() {
        let repo = InMemoryBookRepository::new();
        let book = Book::new(Title::new("Glass Harbor").unwrap(), None);
        repo.save_book(&book).await.unwrap();
        repo.insert_chapters(&[Chapter::new(book.id, 1, "One", "")])
            .await
            .unwrap();

        repo.delete_book(book.id).await.unwrap();
        assert!(repo.find_book(book.id).await.unwrap().is_none());
        assert_eq!(repo.count_chapters(book.id).await.unwrap(), 0);
        assert!(matches!(
            repo.delete_book(book.id).await,
            Err(RepositoryError::NotFound(_))
        ));
    }
}
