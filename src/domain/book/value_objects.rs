//! Book Context - Value Objects

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use super::BookError;

/// 书籍唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookId(Uuid);

impl BookId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BookId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 章节唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChapterId(Uuid);

impl ChapterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ChapterId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChapterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 书籍标题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title(String);

impl Title {
    pub fn new(title: impl Into<String>) -> Result<Self, BookError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(BookError::InvalidTitle("标题不能为空".to_string()));
        }
        if title.chars().count() > 300 {
            return Err(BookError::InvalidTitle("标题长度不能超过300字符".to_string()));
        }
        Ok(Self(title))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 标题归一化（用于重复检测）
    pub fn normalized(&self) -> String {
        self.0.trim().to_lowercase()
    }
}

impl std::fmt::Display for Title {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 评审状态
///
/// 大纲评审、章节评审、终审共用同一个封闭取值域，
/// 这样 GateEvaluator 只需要一个实现。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// 等待外部决定
    Pending,
    /// 已批准，附带的备注作为下一次生成的输入
    Yes,
    /// 已拒绝
    No,
    /// 无需备注，直接推进
    NoNotesNeeded,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Yes => "yes",
            ReviewStatus::No => "no",
            ReviewStatus::NoNotesNeeded => "no_notes_needed",
        }
    }

    /// 解析评审状态；超出封闭取值域的值是数据完整性错误，不做静默转换
    pub fn parse(s: &str) -> Result<Self, BookError> {
        match s.trim() {
            "pending" => Ok(ReviewStatus::Pending),
            "yes" => Ok(ReviewStatus::Yes),
            "no" => Ok(ReviewStatus::No),
            "no_notes_needed" => Ok(ReviewStatus::NoNotesNeeded),
            other => Err(BookError::InvalidStatus(other.to_string())),
        }
    }
}

impl Default for ReviewStatus {
    fn default() -> Self {
        ReviewStatus::Pending
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 书籍输出状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStatus {
    Pending,
    InProgress,
    Completed,
    Paused,
    Error,
}

impl OutputStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStatus::Pending => "pending",
            OutputStatus::InProgress => "in_progress",
            OutputStatus::Completed => "completed",
            OutputStatus::Paused => "paused",
            OutputStatus::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OutputStatus::Pending),
            "in_progress" => Some(OutputStatus::InProgress),
            "completed" => Some(OutputStatus::Completed),
            "paused" => Some(OutputStatus::Paused),
            "error" => Some(OutputStatus::Error),
            _ => None,
        }
    }

    /// paused / error 状态下不允许任何生成调用，直到被外部清除
    pub fn blocks_generation(&self) -> bool {
        matches!(self, OutputStatus::Paused | OutputStatus::Error)
    }

    /// 状态机允许的迁移
    pub fn can_transition_to(&self, next: OutputStatus) -> bool {
        use OutputStatus::*;
        match (self, next) {
            (Pending, InProgress) | (Pending, Paused) | (Pending, Error) => true,
            (InProgress, Paused) | (InProgress, Error) | (InProgress, Completed) => true,
            (Paused, InProgress) | (Paused, Error) => true,
            (Error, InProgress) | (Error, Pending) => true,
            // 重新编译
            (Completed, Completed) | (Completed, Error) => true,
            _ => false,
        }
    }
}

impl Default for OutputStatus {
    fn default() -> Self {
        OutputStatus::Pending
    }
}

impl std::fmt::Display for OutputStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 章节生成状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterStatus {
    Pending,
    Generating,
    Generated,
    Reviewed,
    Approved,
    Error,
}

impl ChapterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChapterStatus::Pending => "pending",
            ChapterStatus::Generating => "generating",
            ChapterStatus::Generated => "generated",
            ChapterStatus::Reviewed => "reviewed",
            ChapterStatus::Approved => "approved",
            ChapterStatus::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ChapterStatus::Pending),
            "generating" => Some(ChapterStatus::Generating),
            "generated" => Some(ChapterStatus::Generated),
            "reviewed" => Some(ChapterStatus::Reviewed),
            "approved" => Some(ChapterStatus::Approved),
            "error" => Some(ChapterStatus::Error),
            _ => None,
        }
    }

    /// 状态是否至少为 generated（摘要已存在）
    pub fn is_generated(&self) -> bool {
        matches!(
            self,
            ChapterStatus::Generated | ChapterStatus::Reviewed | ChapterStatus::Approved
        )
    }
}

impl Default for ChapterStatus {
    fn default() -> Self {
        ChapterStatus::Pending
    }
}

impl std::fmt::Display for ChapterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 输出产物位置（编译成功后写入）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLocation {
    /// 格式，如 "md" / "txt"
    pub format: String,
    pub path: PathBuf,
}

impl ArtifactLocation {
    pub fn new(format: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            format: format.into(),
            path: path.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_status_parse_closed_domain() {
        assert_eq!(ReviewStatus::parse("pending").unwrap(), ReviewStatus::Pending);
        assert_eq!(ReviewStatus::parse("yes").unwrap(), ReviewStatus::Yes);
        assert_eq!(ReviewStatus::parse("no").unwrap(), ReviewStatus::No);
        assert_eq!(
            ReviewStatus::parse("no_notes_needed").unwrap(),
            ReviewStatus::NoNotesNeeded
        );
        assert!(matches!(
            ReviewStatus::parse("approved"),
            Err(BookError::InvalidStatus(_))
        ));
    }

    #[test]
    fn test_title_validation() {
        assert!(Title::new("  ").is_err());
        let title = Title::new("  The Long Road  ").unwrap();
        assert_eq!(title.as_str(), "The Long Road");
        assert_eq!(title.normalized(), "the long road");
    }

    #[test]
    fn test_output_status_transitions() {
        assert!(OutputStatus::Pending.can_transition_to(OutputStatus::InProgress));
        assert!(OutputStatus::InProgress.can_transition_to(OutputStatus::Completed));
        assert!(!OutputStatus::Pending.can_transition_to(OutputStatus::Completed));
        assert!(!OutputStatus::Paused.can_transition_to(OutputStatus::Completed));
        assert!(!OutputStatus::Error.can_transition_to(OutputStatus::Completed));
        assert!(OutputStatus::Error.blocks_generation());
        assert!(OutputStatus::Paused.blocks_generation());
        assert!(!OutputStatus::InProgress.blocks_generation());
    }

    #[test]
    fn test_chapter_status_at_least_generated() {
        assert!(!ChapterStatus::Pending.is_generated());
        assert!(!ChapterStatus::Generating.is_generated());
        assert!(!ChapterStatus::Error.is_generated());
        assert!(ChapterStatus::Generated.is_generated());
        assert!(ChapterStatus::Reviewed.is_generated());
        assert!(ChapterStatus::Approved.is_generated());
    }
}
