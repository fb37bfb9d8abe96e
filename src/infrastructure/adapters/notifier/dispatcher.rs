//! Notification Dispatcher
//!
//! 每个事件：WebSocket 广播 + 可选 webhook 投递，投递结果写入通知日志。
//! 对调用方即发即弃，投递或记录失败只打日志。

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::ports::{
    DeliveryResult, NotificationLogPort, NotificationRecord, NotifierPort,
};
use crate::domain::NotificationEvent;
use crate::infrastructure::events::EventPublisher;

/// 通知分发器
pub struct NotificationDispatcher {
    publisher: Arc<EventPublisher>,
    webhook: Option<Arc<dyn NotifierPort>>,
    log: Arc<dyn NotificationLogPort>,
}

impl NotificationDispatcher {
    pub fn new(
        publisher: Arc<EventPublisher>,
        webhook: Option<Arc<dyn NotifierPort>>,
        log: Arc<dyn NotificationLogPort>,
    ) -> Self {
        Self {
            publisher,
            webhook,
            log,
        }
    }
}

#[async_trait]
impl NotifierPort for NotificationDispatcher {
    async fn emit(&self, event: NotificationEvent) -> DeliveryResult {
        tracing::info!(
            book_id = %event.book_id,
            chapter_id = ?event.chapter_id.map(|id| id.to_string()),
            event_type = event.event_type.as_str(),
            message = %event.message,
            "Notification"
        );

        self.publisher.emit(event.clone()).await;

        let result = match &self.webhook {
            Some(webhook) => webhook.emit(event.clone()).await,
            None => DeliveryResult::skipped(),
        };

        let record = NotificationRecord::from_event(&event, &result);
        if let Err(e) = self.log.record(&record).await {
            tracing::warn!(
                book_id = %event.book_id,
                error = %e,
                "Failed to record notification delivery"
            );
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::DeliveryStatus;
    use crate::domain::book::BookId;
    use crate::domain::EventType;
    use crate::infrastructure::events::WsEvent;
    use crate::infrastructure::memory::InMemoryNotificationLog;

    struct FailingWebhook;

    #[async_trait]
    impl NotifierPort for FailingWebhook {
        async fn emit(&self, _event: NotificationEvent) -> DeliveryResult {
            DeliveryResult::failed("HTTP 502")
        }
    }

    #[tokio::test]
    async fn test_without_webhook_logs_skipped() {
        let publisher = Arc::new(EventPublisher::new());
        let mut rx = publisher.subscribe();
        let log = Arc::new(InMemoryNotificationLog::new());
        let dispatcher = NotificationDispatcher::new(publisher, None, log.clone());
        let book_id = BookId::new();

        let result = dispatcher
            .emit(NotificationEvent::new(book_id, EventType::OutlineReady, "outline ready"))
            .await;

        assert_eq!(result.status, DeliveryStatus::Skipped);
        assert!(matches!(rx.recv().await.unwrap(), WsEvent::Notification { .. }));
        let records = log.find_by_book(book_id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, DeliveryStatus::Skipped);
    }

    #[tokio::test]
    async fn test_webhook_failure_is_logged_not_raised() {
        let log = Arc::new(InMemoryNotificationLog::new());
        let dispatcher = NotificationDispatcher::new(
            Arc::new(EventPublisher::new()),
            Some(Arc::new(FailingWebhook)),
            log.clone(),
        );
        let book_id = BookId::new();

        let result = dispatcher
            .emit(NotificationEvent::new(book_id, EventType::ErrorPause, "chapter 2 failed"))
            .await;

        assert_eq!(result.status, DeliveryStatus::Failed);
        let records = log.find_by_book(book_id).await.unwrap();
        assert_eq!(records[0].error_message.as_deref(), Some("HTTP 502"));
        assert_eq!(records[0].event_type, EventType::ErrorPause);
    }
}
