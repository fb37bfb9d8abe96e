//! Generation Port - 文本生成抽象
//!
//! 大纲与章节的外部生成调用，具体实现在 infrastructure/adapters/llm

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::ContextPayload;

/// 生成错误
///
/// 由阶段边界捕获并转换为 error 状态，不继续向上传播。
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    /// 返回内容无法使用（空文本、结构不符）
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// 大纲生成请求
#[derive(Debug, Clone)]
pub struct OutlineRequest {
    pub title: String,
    /// 大纲生成前的备注
    pub notes: Option<String>,
    /// 重新生成时的上一版大纲
    pub previous_outline: Option<String>,
    /// 重新生成时的修改备注
    pub revision_notes: Option<String>,
}

impl OutlineRequest {
    pub fn is_revision(&self) -> bool {
        self.previous_outline.is_some()
    }
}

/// 章节生成请求
#[derive(Debug, Clone)]
pub struct ChapterRequest {
    pub book_title: String,
    pub outline: String,
    pub sequence: u32,
    pub chapter_title: String,
    /// 大纲中该章节的条目
    pub outline_entry: String,
    /// 之前章节的摘要
    pub context: ContextPayload,
    /// 书级备注（大纲评审为 yes 时）
    pub book_notes: Option<String>,
    /// 上一章评审为 yes 时附带的备注
    pub previous_chapter_notes: Option<String>,
    /// 本章被拒绝后重新生成时的备注
    pub chapter_notes: Option<String>,
    /// 被拒绝的上一版正文，按备注修订
    pub previous_content: Option<String>,
}

impl ChapterRequest {
    /// 按备注修订上一版正文
    pub fn is_revision(&self) -> bool {
        self.previous_content.is_some() && self.chapter_notes.is_some()
    }
}

/// 章节生成结果（正文与摘要同时产生）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedChapter {
    pub content: String,
    pub summary: String,
}

/// Generation Port
#[async_trait]
pub trait GenerationPort: Send + Sync {
    /// 生成大纲
    async fn generate_outline(&self, request: OutlineRequest) -> Result<String, GenerationError>;

    /// 生成章节正文及摘要
    async fn generate_chapter(
        &self,
        request: ChapterRequest,
    ) -> Result<GeneratedChapter, GenerationError>;

    /// 检查生成服务是否可用
    async fn health_check(&self) -> bool {
        true
    }
}
