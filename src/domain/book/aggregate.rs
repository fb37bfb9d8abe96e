//! Book Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ArtifactLocation, BookError, BookId, OutputStatus, ReviewStatus, Title};
use crate::domain::review::{evaluate, Decision};

/// Book 聚合根 - 一个书稿项目
///
/// 不变量:
/// - 大纲评审状态初始为 pending，只由外部决定写入，生成过程从不写入
/// - 只有当所有章节都已批准时输出状态才能到达 completed
/// - paused / error 状态下不允许任何生成调用，直到被外部清除
/// - Book 独占其章节，删除时级联删除
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: Title,
    /// 大纲生成前的备注
    pub outline_notes_before: Option<String>,
    pub outline: Option<String>,
    /// 大纲生成后的评审备注
    pub outline_notes_after: Option<String>,
    pub outline_review: ReviewStatus,
    /// 大纲解析出的章节数
    pub declared_chapter_count: Option<u32>,
    pub final_review_notes: Option<String>,
    pub final_review: ReviewStatus,
    pub output_status: OutputStatus,
    /// paused / error 的原因，供状态查询
    pub status_reason: Option<String>,
    pub artifacts: Vec<ArtifactLocation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// 创建新书
    pub fn new(title: Title, outline_notes_before: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: BookId::new(),
            title,
            outline_notes_before: outline_notes_before.filter(|n| !n.trim().is_empty()),
            outline: None,
            outline_notes_after: None,
            outline_review: ReviewStatus::Pending,
            declared_chapter_count: None,
            final_review_notes: None,
            final_review: ReviewStatus::Pending,
            output_status: OutputStatus::Pending,
            status_reason: None,
            artifacts: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_outline(&self) -> bool {
        self.outline.is_some()
    }

    /// 大纲可以生成：尚无大纲，或大纲被拒绝且有修改备注
    pub fn can_generate_outline(&self) -> bool {
        match self.outline {
            None => true,
            Some(_) => self.outline_review == ReviewStatus::No && self.has_revision_notes(),
        }
    }

    pub fn has_revision_notes(&self) -> bool {
        self.outline_notes_after
            .as_deref()
            .map_or(false, |n| !n.trim().is_empty())
    }

    /// 写入新生成的大纲，评审状态重置为 pending
    ///
    /// 重新生成时已用过的修改备注被清除。
    pub fn set_outline(&mut self, outline: String) {
        if self.outline.is_some() {
            self.outline_notes_after = None;
        }
        self.outline = Some(outline);
        self.outline_review = ReviewStatus::Pending;
        self.touch();
    }

    /// 应用外部的大纲评审决定
    pub fn apply_outline_review(&mut self, status: ReviewStatus) -> Result<Decision, BookError> {
        if self.outline.is_none() {
            return Err(BookError::sequence("outline must exist before it is reviewed"));
        }
        self.outline_review = status;
        self.touch();
        Ok(evaluate(Some(status)))
    }

    /// 大纲评审的当前闸门决定
    pub fn outline_decision(&self) -> Decision {
        evaluate(Some(self.outline_review))
    }

    /// 章节生成时使用的书级备注
    ///
    /// 只有评审结果为 yes 时，评审备注才作为权威输入。
    pub fn generation_notes(&self) -> Option<String> {
        match self.outline_decision() {
            Decision::Proceed => self
                .outline_notes_after
                .clone()
                .filter(|n| !n.trim().is_empty()),
            _ => None,
        }
    }

    pub fn set_declared_chapter_count(&mut self, count: u32) {
        self.declared_chapter_count = Some(count);
        self.touch();
    }

    pub fn apply_final_review(&mut self, status: ReviewStatus, notes: Option<String>) {
        self.final_review = status;
        if notes.is_some() {
            self.final_review_notes = notes;
        }
        self.touch();
    }

    /// 输出状态迁移
    pub fn transition(
        &mut self,
        next: OutputStatus,
        reason: Option<String>,
    ) -> Result<(), BookError> {
        if self.output_status != next && !self.output_status.can_transition_to(next) {
            return Err(BookError::transition(self.output_status, next));
        }
        self.output_status = next;
        self.status_reason = reason;
        self.touch();
        Ok(())
    }

    /// 编译成功后完成书籍
    pub fn complete(&mut self, artifacts: Vec<ArtifactLocation>) -> Result<(), BookError> {
        if artifacts.is_empty() {
            return Err(BookError::transition(
                self.output_status,
                "completed (no artifacts)",
            ));
        }
        if !self.output_status.can_transition_to(OutputStatus::Completed) {
            return Err(BookError::transition(self.output_status, OutputStatus::Completed));
        }
        self.output_status = OutputStatus::Completed;
        self.status_reason = None;
        self.artifacts = artifacts;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> Book {
        Book::new(Title::new("Rivers of Salt").unwrap(), Some("literary, 3 parts".into()))
    }

    #[test]
    fn test_book_creation() {
        let book = book();
        assert_eq!(book.outline_review, ReviewStatus::Pending);
        assert_eq!(book.output_status, OutputStatus::Pending);
        assert!(book.can_generate_outline());
        assert!(book.artifacts.is_empty());
    }

    #[test]
    fn test_blank_notes_are_dropped() {
        let book = Book::new(Title::new("T").unwrap(), Some("   ".into()));
        assert!(book.outline_notes_before.is_none());
    }

    #[test]
    fn test_review_requires_outline() {
        let mut book = book();
        assert!(matches!(
            book.apply_outline_review(ReviewStatus::Yes),
            Err(BookError::SequenceViolation(_))
        ));
    }

    #[test]
    fn test_outline_regeneration_precondition() {
        let mut book = book();
        book.set_outline("## Chapter 1: A".into());
        assert!(!book.can_generate_outline());

        book.apply_outline_review(ReviewStatus::No).unwrap();
        assert!(!book.can_generate_outline());

        book.outline_notes_after = Some("needs a villain".into());
        assert!(book.can_generate_outline());

        book.set_outline("## Chapter 1: B".into());
        assert_eq!(book.outline_review, ReviewStatus::Pending);
        assert!(book.outline_notes_after.is_none());
    }

    #[test]
    fn test_generation_notes_only_when_proceeding() {
        let mut book = book();
        book.set_outline("## Chapter 1: A".into());
        book.outline_notes_after = Some("keep it short".into());

        book.apply_outline_review(ReviewStatus::NoNotesNeeded).unwrap();
        assert!(book.generation_notes().is_none());

        book.apply_outline_review(ReviewStatus::Yes).unwrap();
        assert_eq!(book.generation_notes().as_deref(), Some("keep it short"));
    }

    #[test]
    fn test_complete_requires_artifacts_and_progress() {
        let mut book = book();
        assert!(book.complete(vec![ArtifactLocation::new("md", "/tmp/a.md")]).is_err());

        book.transition(OutputStatus::InProgress, None).unwrap();
        assert!(book.complete(Vec::new()).is_err());
        book.complete(vec![ArtifactLocation::new("md", "/tmp/a.md")]).unwrap();
        assert_eq!(book.output_status, OutputStatus::Completed);
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let mut book = book();
        book.transition(OutputStatus::InProgress, None).unwrap();
        book.transition(OutputStatus::Paused, Some("awaiting review".into()))
            .unwrap();
        assert!(book.transition(OutputStatus::Completed, None).is_err());
        assert_eq!(book.status_reason.as_deref(), Some("awaiting review"));
    }
}
