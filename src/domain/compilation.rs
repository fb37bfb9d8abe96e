//! Compilation Gate - 编译闸门
//!
//! 每次编译尝试都重新判定，不缓存结论。

use serde::{Deserialize, Serialize};

use super::book::{Book, Chapter, OutputStatus};

/// 拒绝原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// 章节数与大纲声明的章节数不一致（或大纲尚未解析）
    Incomplete,
    /// 存在未批准的章节
    UnapprovedChapters,
    /// 书籍处于 error 状态
    BookInError,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::Incomplete => "incomplete",
            DenyReason::UnapprovedChapters => "unapproved_chapters",
            DenyReason::BookInError => "book_in_error",
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            DenyReason::Incomplete => "chapter set does not match the outline",
            DenyReason::UnapprovedChapters => "some chapters are not approved",
            DenyReason::BookInError => "book is in error state",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 编译闸门判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "snake_case")]
pub enum CompilationVerdict {
    Allow,
    Deny(DenyReason),
}

impl CompilationVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CompilationVerdict::Allow)
    }
}

/// 判定书籍是否可以编译
///
/// Allow 当且仅当：书籍不在 error、章节数等于大纲声明数（且非零）、所有章节均已批准。
pub fn authorize(book: &Book, chapters: &[Chapter]) -> CompilationVerdict {
    if book.output_status == OutputStatus::Error {
        return CompilationVerdict::Deny(DenyReason::BookInError);
    }

    match book.declared_chapter_count {
        Some(declared) if declared > 0 && declared as usize == chapters.len() => {}
        _ => return CompilationVerdict::Deny(DenyReason::Incomplete),
    }

    if chapters.iter().any(|c| !c.is_approved()) {
        return CompilationVerdict::Deny(DenyReason::UnapprovedChapters);
    }

    CompilationVerdict::Allow
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::book::{ChapterStatus, Title};

    fn setup(count: u32, status: ChapterStatus) -> (Book, Vec<Chapter>) {
        let mut book = Book::new(Title::new("Glass Harbor").unwrap(), None);
        book.set_declared_chapter_count(count);
        let chapters = (1..=count)
            .map(|seq| {
                let mut ch = Chapter::new(book.id, seq, format!("C{}", seq), "");
                ch.status = status;
                ch
            })
            .collect();
        (book, chapters)
    }

    #[test]
    fn test_allow_when_complete_and_approved() {
        let (book, chapters) = setup(3, ChapterStatus::Approved);
        assert_eq!(authorize(&book, &chapters), CompilationVerdict::Allow);
        // 无缓存：重复判定结果一致
        assert!(authorize(&book, &chapters).is_allowed());
    }

    #[test]
    fn test_deny_incomplete() {
        let (book, mut chapters) = setup(3, ChapterStatus::Approved);
        chapters.pop();
        assert_eq!(
            authorize(&book, &chapters),
            CompilationVerdict::Deny(DenyReason::Incomplete)
        );

        let mut unparsed = Book::new(Title::new("Empty").unwrap(), None);
        assert_eq!(
            authorize(&unparsed, &[]),
            CompilationVerdict::Deny(DenyReason::Incomplete)
        );
        unparsed.set_declared_chapter_count(0);
        assert_eq!(
            authorize(&unparsed, &[]),
            CompilationVerdict::Deny(DenyReason::Incomplete)
        );
    }

    #[test]
    fn test_deny_unapproved_chapters() {
        let (book, mut chapters) = setup(3, ChapterStatus::Approved);
        chapters[1].status = ChapterStatus::Generated;
        assert_eq!(
            authorize(&book, &chapters),
            CompilationVerdict::Deny(DenyReason::UnapprovedChapters)
        );
    }

    #[test]
    fn test_deny_book_in_error() {
        let (mut book, chapters) = setup(2, ChapterStatus::Approved);
        book.output_status = OutputStatus::Error;
        assert_eq!(
            authorize(&book, &chapters),
            CompilationVerdict::Deny(DenyReason::BookInError)
        );
    }
}
