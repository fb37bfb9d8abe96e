//! Notifier Adapter - 通知投递

mod dispatcher;
mod webhook_notifier;

pub use dispatcher::NotificationDispatcher;
pub use webhook_notifier::{WebhookConfig, WebhookNotifier};
