//! Event Publisher Implementation
//!
//! WebSocket 事件推送实现

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::application::ports::{DeliveryResult, NotifierPort};
use crate::domain::book::{BookId, ChapterId};
use crate::domain::NotificationEvent;

/// WebSocket 事件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum WsEvent {
    /// 流水线通知（outline_ready、chapter_ready 等）
    Notification {
        book_id: BookId,
        #[serde(skip_serializing_if = "Option::is_none")]
        chapter_id: Option<ChapterId>,
        event_type: String,
        message: String,
        created_at: String,
    },
    /// 书籍已删除
    BookDeleted { book_id: BookId },
}

impl From<&NotificationEvent> for WsEvent {
    fn from(event: &NotificationEvent) -> Self {
        WsEvent::Notification {
            book_id: event.book_id,
            chapter_id: event.chapter_id,
            event_type: event.event_type.as_str().to_string(),
            message: event.message.clone(),
            created_at: event.created_at.to_rfc3339(),
        }
    }
}

/// 事件发布器
pub struct EventPublisher {
    channel: broadcast::Sender<WsEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self { channel: tx }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅全局事件
    pub fn subscribe(&self) -> broadcast::Receiver<WsEvent> {
        self.channel.subscribe()
    }

    /// 广播事件，返回接收者数量
    pub fn publish(&self, event: WsEvent) -> usize {
        match self.channel.send(event) {
            Ok(receivers) => receivers,
            Err(e) => {
                tracing::debug!(error = %e, "Failed to publish event (no receivers)");
                0
            }
        }
    }

    pub fn publish_book_deleted(&self, book_id: BookId) {
        self.publish(WsEvent::BookDeleted { book_id });
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotifierPort for EventPublisher {
    async fn emit(&self, event: NotificationEvent) -> DeliveryResult {
        if self.publish(WsEvent::from(&event)) > 0 {
            DeliveryResult::sent()
        } else {
            DeliveryResult::skipped()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::DeliveryStatus;
    use crate::domain::EventType;

    #[tokio::test]
    async fn test_emit_reaches_subscribers() {
        let publisher = EventPublisher::new();
        let book_id = BookId::new();

        let unheard = publisher
            .emit(NotificationEvent::new(book_id, EventType::OutlineReady, "ready"))
            .await;
        assert_eq!(unheard.status, DeliveryStatus::Skipped);

        let mut rx = publisher.subscribe();
        let heard = publisher
            .emit(NotificationEvent::new(book_id, EventType::ChapterReady, "chapter 1"))
            .await;
        assert_eq!(heard.status, DeliveryStatus::Sent);

        match rx.recv().await.unwrap() {
            WsEvent::Notification { event_type, .. } => assert_eq!(event_type, "chapter_ready"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_ws_event_wire_format() {
        let json = serde_json::to_value(WsEvent::BookDeleted {
            book_id: BookId::new(),
        })
        .unwrap();
        assert_eq!(json["event"], "BookDeleted");
        assert!(json["data"]["book_id"].is_string());
    }
}
