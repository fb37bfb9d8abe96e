//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use thiserror::Error;
use uuid::Uuid;

use crate::application::ports::{QueueError, RepositoryError};
use crate::domain::book::BookError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: Uuid,
    },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 评审状态超出封闭取值域
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// 章节乱序生成或评审
    #[error("Sequence violation: {0}")]
    SequenceViolation(String),

    /// 状态无效
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 书籍正被另一个流程处理
    #[error("Book is busy: {0}")]
    Busy(String),

    /// 仓储错误
    #[error("Repository error: {0}")]
    RepositoryError(String),

    /// 外部服务错误
    #[error("External service error: {0}")]
    ExternalServiceError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: Uuid) -> Self {
        Self::NotFound { resource_type, id }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建顺序违例错误
    pub fn sequence(message: impl Into<String>) -> Self {
        Self::SequenceViolation(message.into())
    }

    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::InvalidStatus(msg) => Self::InvalidStatus(msg),
            other => Self::RepositoryError(other.to_string()),
        }
    }
}

impl From<BookError> for ApplicationError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::InvalidStatus(value) => Self::InvalidStatus(value),
            BookError::SequenceViolation(msg) => Self::SequenceViolation(msg),
            BookError::InvalidTitle(msg) => Self::ValidationError(msg),
            transition @ BookError::InvalidTransition { .. } => {
                Self::InvalidState(transition.to_string())
            }
        }
    }
}

impl From<QueueError> for ApplicationError {
    fn from(err: QueueError) -> Self {
        Self::InternalError(err.to_string())
    }
}
