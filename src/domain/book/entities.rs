//! Book Context - Entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookError, BookId, ChapterId, ChapterStatus, ReviewStatus};
use crate::domain::review::{evaluate, Decision};

/// 章节 - 书籍内容的有序单元
///
/// 不变量:
/// - sequence 从 1 开始，在书内连续且唯一；大纲解析时分配，之后不再重排
/// - 必须先经过 generated 才能进入 approved
/// - error 可从任何非终态进入，直到外部重试前保持不变
/// - summary 只随 content 一起写入，不单独重新生成
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: ChapterId,
    pub book_id: BookId,
    pub sequence: u32,
    pub title: String,
    /// 大纲中该章节的条目
    pub outline_entry: String,
    pub content: Option<String>,
    pub summary: Option<String>,
    /// 评审备注
    pub notes: Option<String>,
    pub review: ReviewStatus,
    pub status: ChapterStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chapter {
    pub fn new(
        book_id: BookId,
        sequence: u32,
        title: impl Into<String>,
        outline_entry: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ChapterId::new(),
            book_id,
            sequence,
            title: title.into(),
            outline_entry: outline_entry.into(),
            content: None,
            summary: None,
            notes: None,
            review: ReviewStatus::Pending,
            status: ChapterStatus::Pending,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// pending -> generating
    pub fn start_generation(&mut self) -> Result<(), BookError> {
        if self.status != ChapterStatus::Pending {
            return Err(BookError::transition(self.status, ChapterStatus::Generating));
        }
        self.status = ChapterStatus::Generating;
        self.error_message = None;
        self.touch();
        Ok(())
    }

    /// generating -> generated，同时写入正文和摘要，评审状态回到 pending
    ///
    /// 生成时用过的评审备注被清除。
    pub fn mark_generated(&mut self, content: String, summary: String) -> Result<(), BookError> {
        if self.status != ChapterStatus::Generating {
            return Err(BookError::transition(self.status, ChapterStatus::Generated));
        }
        self.content = Some(content);
        self.summary = Some(summary);
        self.notes = None;
        self.review = ReviewStatus::Pending;
        self.status = ChapterStatus::Generated;
        self.touch();
        Ok(())
    }

    /// 任意非终态 -> error
    pub fn mark_error(&mut self, message: impl Into<String>) -> Result<(), BookError> {
        if self.status == ChapterStatus::Approved {
            return Err(BookError::transition(self.status, ChapterStatus::Error));
        }
        self.status = ChapterStatus::Error;
        self.error_message = Some(message.into());
        self.touch();
        Ok(())
    }

    /// 应用外部评审决定
    ///
    /// 只有 generated / reviewed 的章节可以评审；
    /// Proceed / AdvanceWithoutNotes -> approved，
    /// Hold -> 显式决定记为 reviewed，pending 保持 generated。
    pub fn apply_review(&mut self, status: ReviewStatus) -> Result<Decision, BookError> {
        if !matches!(self.status, ChapterStatus::Generated | ChapterStatus::Reviewed) {
            return Err(BookError::sequence(format!(
                "chapter {} cannot be reviewed while {}",
                self.sequence, self.status
            )));
        }

        self.review = status;
        let decision = evaluate(Some(status));
        self.status = match decision {
            Decision::Proceed | Decision::AdvanceWithoutNotes => ChapterStatus::Approved,
            Decision::Hold if status == ReviewStatus::Pending => ChapterStatus::Generated,
            Decision::Hold => ChapterStatus::Reviewed,
        };
        self.touch();
        Ok(decision)
    }

    /// 外部重试：error / 残留的 generating 回到 pending
    ///
    /// 被拒绝且带备注的章节也回到 pending，以备注修订原稿；
    /// 摘要清除，正文只在有备注时保留为修订底稿。返回是否发生了重置。
    pub fn reset_for_retry(&mut self) -> bool {
        let rejected_with_notes = self.status == ChapterStatus::Reviewed
            && self.review == ReviewStatus::No
            && self.has_notes();

        match self.status {
            ChapterStatus::Error | ChapterStatus::Generating => {}
            _ if rejected_with_notes => {}
            _ => return false,
        }

        self.status = ChapterStatus::Pending;
        self.review = ReviewStatus::Pending;
        if !self.has_notes() {
            self.content = None;
        }
        self.summary = None;
        self.error_message = None;
        self.touch();
        true
    }

    pub fn has_notes(&self) -> bool {
        self.notes.as_deref().map_or(false, |n| !n.trim().is_empty())
    }

    /// 按备注重新生成时作为底稿的上一版正文
    pub fn revision_source(&self) -> Option<&str> {
        if self.status == ChapterStatus::Pending && self.has_notes() {
            self.content.as_deref()
        } else {
            None
        }
    }

    /// 已生成、尚未批准
    pub fn is_awaiting_review(&self) -> bool {
        matches!(self.status, ChapterStatus::Generated | ChapterStatus::Reviewed)
    }

    pub fn is_approved(&self) -> bool {
        self.status == ChapterStatus::Approved
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
