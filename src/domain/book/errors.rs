//! Book Context - Errors

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookError {
    /// 评审状态超出封闭取值域
    #[error("无效的评审状态: {0}")]
    InvalidStatus(String),

    /// 章节乱序生成或评审
    #[error("章节顺序违例: {0}")]
    SequenceViolation(String),

    #[error("非法状态迁移: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("无效的标题: {0}")]
    InvalidTitle(String),
}

impl BookError {
    pub fn sequence(message: impl Into<String>) -> Self {
        Self::SequenceViolation(message.into())
    }

    pub fn transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}
