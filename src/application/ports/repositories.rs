//! Repository Ports - 出站端口
//!
//! 定义数据持久化的抽象接口
//! 具体实现在 infrastructure 层（SQLite / 内存）

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::book::{Book, BookId, Chapter, ChapterId, Title};

/// Repository 错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// 存储中的评审状态超出封闭取值域
    #[error("Invalid stored status: {0}")]
    InvalidStatus(String),
}

// ============================================================================
// Book Repository
// ============================================================================

/// Book Repository Port
///
/// 每次保存都是单实体原子更新；删除书籍时级联删除章节。
#[async_trait]
pub trait BookRepositoryPort: Send + Sync {
    /// 保存书籍（插入或更新）
    async fn save_book(&self, book: &Book) -> Result<(), RepositoryError>;

    /// 根据 ID 查找书籍
    async fn find_book(&self, id: BookId) -> Result<Option<Book>, RepositoryError>;

    /// 按标题查找（大小写、首尾空白不敏感）
    async fn find_book_by_title(&self, title: &Title) -> Result<Option<Book>, RepositoryError>;

    /// 获取所有书籍（按创建时间）
    async fn list_books(&self) -> Result<Vec<Book>, RepositoryError>;

    /// 删除书籍及其章节
    async fn delete_book(&self, id: BookId) -> Result<(), RepositoryError>;

    /// 批量插入大纲解析出的章节
    ///
    /// 该书已有任何章节时返回 `Duplicate`，不写入。
    async fn insert_chapters(&self, chapters: &[Chapter]) -> Result<(), RepositoryError>;

    /// 保存单个章节
    async fn save_chapter(&self, chapter: &Chapter) -> Result<(), RepositoryError>;

    /// 根据 ID 查找章节
    async fn find_chapter(&self, id: ChapterId) -> Result<Option<Chapter>, RepositoryError>;

    /// 获取书籍的所有章节，按 sequence 升序
    async fn find_chapters(&self, book_id: BookId) -> Result<Vec<Chapter>, RepositoryError>;

    /// 章节数量
    async fn count_chapters(&self, book_id: BookId) -> Result<usize, RepositoryError> {
        Ok(self.find_chapters(book_id).await?.len())
    }
}
