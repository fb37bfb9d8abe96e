//! Notifier Ports - 通知投递与投递日志

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::RepositoryError;
use crate::domain::book::{BookId, ChapterId};
use crate::domain::{EventType, NotificationEvent};

/// 投递状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed,
    /// 未配置投递通道
    Skipped,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Skipped => "skipped",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sent" => Some(DeliveryStatus::Sent),
            "failed" => Some(DeliveryStatus::Failed),
            "skipped" => Some(DeliveryStatus::Skipped),
            _ => None,
        }
    }
}

/// 投递结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResult {
    pub status: DeliveryStatus,
    pub detail: Option<String>,
}

impl DeliveryResult {
    pub fn sent() -> Self {
        Self {
            status: DeliveryStatus::Sent,
            detail: None,
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            status: DeliveryStatus::Failed,
            detail: Some(detail.into()),
        }
    }

    pub fn skipped() -> Self {
        Self {
            status: DeliveryStatus::Skipped,
            detail: None,
        }
    }
}

/// Notifier Port
///
/// 对核心而言是即发即弃：投递失败由实现方记录，核心不重试。
#[async_trait]
pub trait NotifierPort: Send + Sync {
    async fn emit(&self, event: NotificationEvent) -> DeliveryResult;
}

/// 通知投递记录
#[derive(Debug, Clone)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub book_id: BookId,
    pub chapter_id: Option<ChapterId>,
    pub event_type: EventType,
    pub message: String,
    pub status: DeliveryStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    pub fn from_event(event: &NotificationEvent, result: &DeliveryResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            book_id: event.book_id,
            chapter_id: event.chapter_id,
            event_type: event.event_type,
            message: event.message.clone(),
            status: result.status,
            error_message: result.detail.clone(),
            created_at: event.created_at,
        }
    }
}

/// Notification Log Port
#[async_trait]
pub trait NotificationLogPort: Send + Sync {
    async fn record(&self, record: &NotificationRecord) -> Result<(), RepositoryError>;

    /// 书籍的投递日志，按时间升序
    async fn find_by_book(&self, book_id: BookId)
        -> Result<Vec<NotificationRecord>, RepositoryError>;
}
