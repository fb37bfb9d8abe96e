//! Webhook Notifier - 通过 HTTP POST 投递通知

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::application::ports::{DeliveryResult, NotifierPort};
use crate::domain::book::{BookId, ChapterId};
use crate::domain::NotificationEvent;

/// Webhook 配置
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: 10,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Webhook 请求体
///
/// `title` / `text` 兼容常见的聊天工具 incoming webhook
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    title: String,
    text: &'a str,
    event_type: &'static str,
    book_id: BookId,
    #[serde(skip_serializing_if = "Option::is_none")]
    chapter_id: Option<ChapterId>,
    created_at: String,
}

impl<'a> WebhookPayload<'a> {
    fn from_event(event: &'a NotificationEvent) -> Self {
        Self {
            title: format!("bookforge: {}", event.event_type),
            text: &event.message,
            event_type: event.event_type.as_str(),
            book_id: event.book_id,
            chapter_id: event.chapter_id,
            created_at: event.created_at.to_rfc3339(),
        }
    }
}

/// Webhook Notifier
pub struct WebhookNotifier {
    client: Client,
    config: WebhookConfig,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl NotifierPort for WebhookNotifier {
    async fn emit(&self, event: NotificationEvent) -> DeliveryResult {
        let payload = WebhookPayload::from_event(&event);

        let response = match self.client.post(&self.config.url).json(&payload).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    book_id = %event.book_id,
                    event_type = event.event_type.as_str(),
                    error = %e,
                    "Webhook delivery failed"
                );
                return DeliveryResult::failed(e.to_string());
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                book_id = %event.book_id,
                event_type = event.event_type.as_str(),
                status = %status,
                "Webhook rejected notification"
            );
            return DeliveryResult::failed(format!("HTTP {}: {}", status, body));
        }

        tracing::debug!(
            book_id = %event.book_id,
            event_type = event.event_type.as_str(),
            "Webhook delivered"
        );
        DeliveryResult::sent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::DeliveryStatus;
    use crate::domain::EventType;

    #[test]
    fn test_payload_shape() {
        let event = NotificationEvent::new(BookId::new(), EventType::BookCompleted, "done");
        let json = serde_json::to_value(WebhookPayload::from_event(&event)).unwrap();
        assert_eq!(json["event_type"], "book_completed");
        assert_eq!(json["text"], "done");
        assert!(json.get("chapter_id").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_reports_failure() {
        let notifier =
            WebhookNotifier::new(WebhookConfig::new("http://127.0.0.1:1/hook").with_timeout(2))
                .unwrap();
        let result = notifier
            .emit(NotificationEvent::new(BookId::new(), EventType::ErrorPause, "boom"))
            .await;
        assert_eq!(result.status, DeliveryStatus::Failed);
        assert!(result.detail.is_some());
    }
}
