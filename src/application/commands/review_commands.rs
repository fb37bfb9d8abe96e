//! Review Commands
//!
//! 评审状态以外部原始取值传入，由处理器解析为封闭取值域。

use crate::domain::book::{BookId, ChapterId};

/// 大纲评审命令
#[derive(Debug, Clone)]
pub struct ReviewOutline {
    pub book_id: BookId,
    pub status: String,
    pub notes: Option<String>,
}

/// 章节评审命令
#[derive(Debug, Clone)]
pub struct ReviewChapter {
    pub book_id: BookId,
    pub chapter_id: ChapterId,
    pub status: String,
    pub notes: Option<String>,
}

/// 终审命令
#[derive(Debug, Clone)]
pub struct ReviewFinal {
    pub book_id: BookId,
    pub status: String,
    pub notes: Option<String>,
}
