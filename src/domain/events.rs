//! Notification Events - 通知事件
//!
//! 由各阶段在状态迁移时创建，交给外部通知方消费一次。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::book::{BookId, ChapterId};

/// 事件类型（封闭枚举）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    OutlineReady,
    WaitingOnNotes,
    ChapterReady,
    FinalDraftReady,
    ErrorPause,
    BookCompleted,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::OutlineReady => "outline_ready",
            EventType::WaitingOnNotes => "waiting_on_notes",
            EventType::ChapterReady => "chapter_ready",
            EventType::FinalDraftReady => "final_draft_ready",
            EventType::ErrorPause => "error_pause",
            EventType::BookCompleted => "book_completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "outline_ready" => Some(EventType::OutlineReady),
            "waiting_on_notes" => Some(EventType::WaitingOnNotes),
            "chapter_ready" => Some(EventType::ChapterReady),
            "final_draft_ready" => Some(EventType::FinalDraftReady),
            "error_pause" => Some(EventType::ErrorPause),
            "book_completed" => Some(EventType::BookCompleted),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 通知事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub book_id: BookId,
    pub chapter_id: Option<ChapterId>,
    pub event_type: EventType,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(book_id: BookId, event_type: EventType, message: impl Into<String>) -> Self {
        Self {
            book_id,
            chapter_id: None,
            event_type,
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    pub fn for_chapter(
        book_id: BookId,
        chapter_id: ChapterId,
        event_type: EventType,
        message: impl Into<String>,
    ) -> Self {
        Self {
            chapter_id: Some(chapter_id),
            ..Self::new(book_id, event_type, message)
        }
    }
}
