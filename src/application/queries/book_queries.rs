//! Book Queries

use crate::domain::book::BookId;

/// 获取书籍详情（含章节）
#[derive(Debug, Clone)]
pub struct GetBook {
    pub book_id: BookId,
}

/// 列出所有书籍
#[derive(Debug, Clone)]
pub struct ListBooks;

/// 获取书籍进度
#[derive(Debug, Clone)]
pub struct GetProgress {
    pub book_id: BookId,
}

/// 获取书籍的通知投递日志
#[derive(Debug, Clone)]
pub struct ListNotifications {
    pub book_id: BookId,
}
