//! Book Context - 书籍限界上下文
//!
//! 职责:
//! - Book 聚合（大纲、评审、输出状态）
//! - Chapter 实体（顺序、正文、摘要、评审）
//! - 共享的评审 / 状态取值域

mod aggregate;
mod entities;
mod errors;
mod value_objects;

pub use aggregate::Book;
pub use entities::Chapter;
pub use errors::BookError;
pub use value_objects::{
    ArtifactLocation, BookId, ChapterId, ChapterStatus, OutputStatus, ReviewStatus, Title,
};
